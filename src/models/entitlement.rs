use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Subscription tier stored in `profiles.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Free,
    Premium,
    Pro,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Free => "free",
            Role::Premium => "premium",
            Role::Pro => "pro",
            Role::Admin => "admin",
        }
    }

    /// Roles a customer can buy through a checkout.
    pub fn is_purchasable(&self) -> bool {
        matches!(self, Role::Premium | Role::Pro)
    }

    /// Permission set used when `plan_configurations` has no row for the role.
    pub fn default_permissions(&self) -> Vec<String> {
        use Permission::*;

        let free = [AccessBuilder, AccessSocialArt, AccessProductBank];
        let premium = [AccessDigitalTv, AccessAdStudio, ManageCompanyInfo, ViewReports];
        let pro = [ManageUsers, ManageIntegrations, PrioritySupport];

        let tags: Vec<Permission> = match self {
            Role::Free => free.to_vec(),
            Role::Premium => free.iter().chain(premium.iter()).copied().collect(),
            Role::Pro => free.iter().chain(premium.iter()).chain(pro.iter()).copied().collect(),
            Role::Admin => free
                .iter()
                .chain(premium.iter())
                .chain(pro.iter())
                .copied()
                .chain(std::iter::once(AccessAdmin))
                .collect(),
        };

        tags.into_iter().map(|p| p.as_str().to_string()).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Role::Free),
            "premium" => Ok(Role::Premium),
            "pro" => Ok(Role::Pro),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Validation(format!("Unknown role '{}'", other))),
        }
    }
}

/// Capability tags granted by a plan. Plans are admin-editable, so profiles
/// carry plain strings; these are the tags the application knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    AccessBuilder,
    AccessSocialArt,
    AccessProductBank,
    AccessDigitalTv,
    AccessAdStudio,
    ManageCompanyInfo,
    ViewReports,
    ManageUsers,
    ManageIntegrations,
    PrioritySupport,
    AccessAdmin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AccessBuilder => "access_builder",
            Permission::AccessSocialArt => "access_social_art",
            Permission::AccessProductBank => "access_product_bank",
            Permission::AccessDigitalTv => "access_digital_tv",
            Permission::AccessAdStudio => "access_ad_studio",
            Permission::ManageCompanyInfo => "manage_company_info",
            Permission::ViewReports => "view_reports",
            Permission::ManageUsers => "manage_users",
            Permission::ManageIntegrations => "manage_integrations",
            Permission::PrioritySupport => "priority_support",
            Permission::AccessAdmin => "access_admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub role: Role,
    pub permissions: Vec<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditTransactionType {
    Refill,
    Consumption,
}

impl CreditTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::Refill => "refill",
            CreditTransactionType::Consumption => "consumption",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTransaction {
    pub user_id: String,
    #[serde(rename = "type")]
    pub transaction_type: CreditTransactionType,
    pub amount: i64,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Reference data describing what a role costs and grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanConfiguration {
    pub role: Role,
    pub name: String,
    pub price: String,
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_str() {
        for role in [Role::Free, Role::Premium, Role::Pro, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("enterprise".parse::<Role>().is_err());
        assert_eq!(" PRO ".parse::<Role>().unwrap(), Role::Pro);
    }

    #[test]
    fn test_default_permissions_are_cumulative() {
        let free = Role::Free.default_permissions();
        let premium = Role::Premium.default_permissions();
        let pro = Role::Pro.default_permissions();

        assert!(free.iter().all(|p| premium.contains(p)));
        assert!(premium.iter().all(|p| pro.contains(p)));
        assert!(!pro.contains(&"access_admin".to_string()));
        assert!(Role::Admin.default_permissions().contains(&"access_admin".to_string()));
        assert_eq!(free, vec!["access_builder", "access_social_art", "access_product_bank"]);
    }

    #[test]
    fn test_only_paid_tiers_are_purchasable() {
        assert!(Role::Premium.is_purchasable());
        assert!(Role::Pro.is_purchasable());
        assert!(!Role::Free.is_purchasable());
        assert!(!Role::Admin.is_purchasable());
    }
}
