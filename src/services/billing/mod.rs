//! Payment-driven entitlements: checkout creation and webhook reconciliation.

pub mod checkout;
pub mod entitlement_store;
pub mod external_reference;
pub mod gateway;
pub mod reconciler;

#[cfg(test)]
pub mod testing;

pub use checkout::CheckoutService;
pub use entitlement_store::{EntitlementStore, PgEntitlementStore};
pub use external_reference::ExternalReference;
pub use gateway::{HttpPaymentGateway, PaymentGateway};
pub use reconciler::{Effect, EntitlementReconciler, ReconcileOutcome};
