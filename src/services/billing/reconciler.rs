//! Turns authenticated provider notifications into entitlement changes.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use super::entitlement_store::{ApplyResult, EntitlementMutation, EntitlementStore, LedgerKey};
use super::external_reference::{self, ExternalReference};
use super::gateway::PaymentGateway;
use crate::error::AppError;
use crate::models::{ProviderEvent, ProviderResource, ResourceKind, ResourceState, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Upgraded { role: Role },
    Downgraded,
    CreditsGranted { amount: i64, balance: i64 },
    Unchanged,
    AlreadyProcessed,
    Logged,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub effect: Effect,
    pub message: String,
}

impl ReconcileOutcome {
    fn new(effect: Effect, message: impl Into<String>) -> Self {
        Self {
            effect,
            message: message.into(),
        }
    }
}

/// What a resource in a given state asks for, before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    SetRole(Role),
    GrantCredits(i64),
    Downgrade,
    LogOnly,
    Ignore,
    Reject(String),
}

pub fn decide(kind: ResourceKind, state: &ResourceState, reference: &ExternalReference) -> Decision {
    match state {
        ResourceState::Approved if reference.is_credits() => match reference.action_value.parse::<i64>() {
            Ok(amount) if amount > 0 => Decision::GrantCredits(amount),
            _ => Decision::Reject(format!("Invalid credit amount '{}'", reference.action_value)),
        },
        ResourceState::Approved => match reference.action_type.parse::<Role>() {
            Ok(role) if role.is_purchasable() => Decision::SetRole(role),
            Ok(role) => Decision::Reject(format!("Role '{}' cannot be granted by a payment", role)),
            Err(_) => Decision::Reject(format!("Unknown action type '{}'", reference.action_type)),
        },
        ResourceState::Cancelled if kind == ResourceKind::Subscription => Decision::Downgrade,
        ResourceState::Pending | ResourceState::Rejected | ResourceState::Cancelled => Decision::LogOnly,
        ResourceState::Other(_) => Decision::Ignore,
    }
}

pub struct EntitlementReconciler {
    store: Arc<dyn EntitlementStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl EntitlementReconciler {
    pub fn new(store: Arc<dyn EntitlementStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Errors are transient (storage or provider) unless `is_permanent()`.
    pub async fn reconcile(&self, event: &ProviderEvent) -> Result<ReconcileOutcome, AppError> {
        let provider = event.provider();
        let Some(kind) = event.resource_kind() else {
            let message = format!("Ignored {} topic: {}", provider, event.label());
            info!("{}", message);
            return Ok(ReconcileOutcome::new(Effect::Ignored, message));
        };

        let resource = self
            .gateway
            .fetch_resource(provider, kind, event.resource_id())
            .await?;
        let state = ResourceState::from_provider_status(&resource.status);

        if let ResourceState::Other(raw) = &state {
            let message = format!(
                "Ignored {} {} {} with status {}",
                provider,
                resource.kind.as_str(),
                resource.id,
                raw
            );
            info!("{}", message);
            return Ok(ReconcileOutcome::new(Effect::Ignored, message));
        }

        let Some(raw_reference) = resource.external_reference.as_deref() else {
            let message = format!("{} {} has no external reference", resource.kind.as_str(), resource.id);
            warn!("{}", message);
            return Ok(ReconcileOutcome::new(Effect::Ignored, message));
        };

        let reference = match external_reference::decode(raw_reference) {
            Ok(reference) => reference,
            Err(e) => {
                warn!("Unparseable external reference on {} {}: {}", provider, resource.id, e);
                return Ok(ReconcileOutcome::new(Effect::Ignored, e.to_string()));
            }
        };

        let key = LedgerKey {
            provider,
            resource_kind: resource.kind,
            resource_id: resource.id.clone(),
            state: state.ledger_label().to_string(),
        };

        match decide(resource.kind, &state, &reference) {
            Decision::SetRole(role) => self.set_role(&key, &reference, role).await,
            Decision::Downgrade => self.set_role(&key, &reference, Role::Free).await,
            Decision::GrantCredits(amount) => self.grant_credits(&key, &reference, amount, &resource).await,
            Decision::LogOnly => {
                let message = format!(
                    "{} {} for user {} is {}; no entitlement change",
                    resource.kind.as_str(),
                    resource.id,
                    reference.user_id,
                    state.ledger_label()
                );
                info!("{}", message);
                Ok(ReconcileOutcome::new(Effect::Logged, message))
            }
            Decision::Ignore => Ok(ReconcileOutcome::new(
                Effect::Ignored,
                format!("Ignored status {}", resource.status),
            )),
            Decision::Reject(reason) => {
                warn!("Rejected {} {} for user {}: {}", provider, resource.id, reference.user_id, reason);
                Ok(ReconcileOutcome::new(Effect::Ignored, reason))
            }
        }
    }

    async fn set_role(
        &self,
        key: &LedgerKey,
        reference: &ExternalReference,
        role: Role,
    ) -> Result<ReconcileOutcome, AppError> {
        let permissions = match self.store.plan_configuration(role).await? {
            Some(plan) => plan.permissions,
            None => {
                warn!("No plan configuration for role {}; using built-in permissions", role);
                role.default_permissions()
            }
        };

        let mutation = EntitlementMutation::SetRole { role, permissions };
        let result = self.store.apply(key, &reference.user_id, &mutation).await?;

        let outcome = match result {
            ApplyResult::Applied { .. } if role == Role::Free => ReconcileOutcome::new(
                Effect::Downgraded,
                format!("User {} downgraded to free ({} {})", reference.user_id, key.resource_kind.as_str(), key.state),
            ),
            ApplyResult::Applied { .. } => ReconcileOutcome::new(
                Effect::Upgraded { role },
                format!("User {} upgraded to {}", reference.user_id, role),
            ),
            ApplyResult::Unchanged => ReconcileOutcome::new(
                Effect::Unchanged,
                format!("User {} already on {}", reference.user_id, role),
            ),
            ApplyResult::AlreadyProcessed => ReconcileOutcome::new(
                Effect::AlreadyProcessed,
                format!("{} {} already processed as {}", key.resource_kind.as_str(), key.resource_id, key.state),
            ),
        };
        info!("{}", outcome.message);
        Ok(outcome)
    }

    async fn grant_credits(
        &self,
        key: &LedgerKey,
        reference: &ExternalReference,
        amount: i64,
        resource: &ProviderResource,
    ) -> Result<ReconcileOutcome, AppError> {
        let mutation = EntitlementMutation::GrantCredits {
            amount,
            description: format!("Compra de {} créditos ({} {})", amount, key.provider, resource.id),
        };

        let outcome = match self.store.apply(key, &reference.user_id, &mutation).await? {
            ApplyResult::Applied { balance } => ReconcileOutcome::new(
                Effect::CreditsGranted {
                    amount,
                    balance: balance.unwrap_or(amount),
                },
                format!("Granted {} credits to user {}", amount, reference.user_id),
            ),
            ApplyResult::Unchanged | ApplyResult::AlreadyProcessed => ReconcileOutcome::new(
                Effect::AlreadyProcessed,
                format!("{} {} already credited", key.resource_kind.as_str(), key.resource_id),
            ),
        };
        info!("{}", outcome.message);
        Ok(outcome)
    }
}
