//! Persistence seam for entitlement changes.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::repositories::{
    CreditTransactionRepository, NewProcessedEvent, PlanConfigurationRepository, ProfileRepository,
    UserCreditRepository, WebhookEventRepository,
};
use crate::error::AppError;
use crate::models::{CreditTransactionType, PaymentProvider, PlanConfiguration, ResourceKind, Role};

/// Dedupe ledger key of one provider resource in one normalised state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub provider: PaymentProvider,
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementMutation {
    SetRole { role: Role, permissions: Vec<String> },
    GrantCredits { amount: i64, description: String },
}

impl EntitlementMutation {
    pub fn label(&self) -> &'static str {
        match self {
            EntitlementMutation::SetRole { .. } => "set_role",
            EntitlementMutation::GrantCredits { .. } => "grant_credits",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// The write happened; `balance` is set for credit grants.
    Applied { balance: Option<i64> },
    /// Profile already had the target role and permissions.
    Unchanged,
    AlreadyProcessed,
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn plan_configuration(&self, role: Role) -> Result<Option<PlanConfiguration>, AppError>;

    /// Records `key` in the ledger and applies `mutation` atomically.
    async fn apply(
        &self,
        key: &LedgerKey,
        user_id: &str,
        mutation: &EntitlementMutation,
    ) -> Result<ApplyResult, AppError>;
}

#[derive(Debug, Clone)]
pub struct PgEntitlementStore {
    pool: PgPool,
    profiles: ProfileRepository,
    plans: PlanConfigurationRepository,
    credits: UserCreditRepository,
    transactions: CreditTransactionRepository,
    ledger: WebhookEventRepository,
}

impl PgEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            profiles: ProfileRepository::new(pool.clone()),
            plans: PlanConfigurationRepository::new(pool.clone()),
            credits: UserCreditRepository::new(pool.clone()),
            transactions: CreditTransactionRepository::new(pool.clone()),
            ledger: WebhookEventRepository::new(pool.clone()),
            pool,
        }
    }
}

fn parse_user_id(user_id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(user_id).map_err(|_| AppError::Validation(format!("'{}' is not a valid user id", user_id)))
}

#[async_trait]
impl EntitlementStore for PgEntitlementStore {
    async fn plan_configuration(&self, role: Role) -> Result<Option<PlanConfiguration>, AppError> {
        self.plans.get_by_role(role).await
    }

    async fn apply(
        &self,
        key: &LedgerKey,
        user_id: &str,
        mutation: &EntitlementMutation,
    ) -> Result<ApplyResult, AppError> {
        let user_uuid = parse_user_id(user_id)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let recorded = self
            .ledger
            .try_record_with_executor(
                &NewProcessedEvent {
                    provider: key.provider.as_str(),
                    resource_kind: key.resource_kind.as_str(),
                    resource_id: &key.resource_id,
                    state: &key.state,
                    user_id: &user_uuid,
                    effect: mutation.label(),
                },
                &mut tx,
            )
            .await?;

        let result = match mutation {
            EntitlementMutation::GrantCredits { amount, description } => {
                if !recorded {
                    tx.rollback()
                        .await
                        .map_err(|e| AppError::Database(format!("Failed to roll back transaction: {}", e)))?;
                    return Ok(ApplyResult::AlreadyProcessed);
                }
                let balance = self
                    .credits
                    .increment_balance_with_executor(&user_uuid, *amount, &mut tx)
                    .await?;
                self.transactions
                    .create_transaction_with_executor(
                        &user_uuid,
                        CreditTransactionType::Refill,
                        *amount,
                        description,
                        &mut tx,
                    )
                    .await?;
                ApplyResult::Applied { balance: Some(balance) }
            }
            EntitlementMutation::SetRole { role, permissions } => {
                let profile = self
                    .profiles
                    .get_profile_for_update_with_executor(&user_uuid, &mut tx)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

                if profile.role == *role && profile.permissions == *permissions {
                    if recorded { ApplyResult::Unchanged } else { ApplyResult::AlreadyProcessed }
                } else {
                    self.profiles
                        .update_role_with_executor(&user_uuid, *role, permissions, &mut tx)
                        .await?;
                    ApplyResult::Applied { balance: None }
                }
            }
        };

        tx.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit transaction: {}", e)))?;

        Ok(result)
    }
}
