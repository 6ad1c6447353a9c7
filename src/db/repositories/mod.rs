pub mod credit_transaction_repository;
pub mod plan_configuration_repository;
pub mod profile_repository;
pub mod user_credit_repository;
pub mod webhook_event_repository;

pub use credit_transaction_repository::CreditTransactionRepository;
pub use plan_configuration_repository::PlanConfigurationRepository;
pub use profile_repository::ProfileRepository;
pub use user_credit_repository::UserCreditRepository;
pub use webhook_event_repository::{NewProcessedEvent, WebhookEventRepository};
