//! `external_reference` strings attached to checkouts.
//!
//! Format: `<userId>_<actionType>_<actionValue>`. The two-part legacy form
//! `<userId>_<role>` is still read as a plan purchase. Only the first two
//! underscores separate fields; anything after belongs to the value.

use std::fmt;

use crate::error::AppError;
use crate::models::Role;

pub const CREDITS_ACTION: &str = "credits";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
    pub user_id: String,
    pub action_type: String,
    pub action_value: String,
}

impl ExternalReference {
    pub fn plan(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            action_type: role.as_str().to_string(),
            action_value: role.as_str().to_string(),
        }
    }

    pub fn credits(user_id: impl Into<String>, amount: i64) -> Self {
        Self {
            user_id: user_id.into(),
            action_type: CREDITS_ACTION.to_string(),
            action_value: amount.to_string(),
        }
    }

    pub fn is_credits(&self) -> bool {
        self.action_type == CREDITS_ACTION
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.user_id, &self.action_type, &self.action_value))
    }
}

pub fn encode(user_id: &str, action_type: &str, action_value: &str) -> String {
    format!("{}_{}_{}", user_id, action_type, action_value)
}

pub fn decode(reference: &str) -> Result<ExternalReference, AppError> {
    let mut parts = reference.splitn(3, '_');
    let user_id = parts.next().unwrap_or_default();
    let Some(action_type) = parts.next() else {
        return Err(AppError::Parse(format!(
            "External reference '{}' has no action type",
            reference
        )));
    };

    if user_id.is_empty() || action_type.is_empty() {
        return Err(AppError::Parse(format!(
            "External reference '{}' has an empty user id or action type",
            reference
        )));
    }

    let action_value = parts.next().unwrap_or(action_type);

    Ok(ExternalReference {
        user_id: user_id.to_string(),
        action_type: action_type.to_string(),
        action_value: action_value.to_string(),
    })
}
