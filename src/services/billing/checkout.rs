use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use super::entitlement_store::EntitlementStore;
use super::external_reference::ExternalReference;
use super::gateway::PaymentGateway;
use crate::clients::CheckoutItem;
use crate::error::AppError;
use crate::models::Role;
use crate::utils::price_validation::{parse_display_price, validate_checkout_amount};

/// Used when `plan_configurations` has no usable price for the role.
fn catalogue_price(role: Role) -> Option<f64> {
    match role {
        Role::Premium => Some(99.0),
        Role::Pro => Some(199.0),
        Role::Free | Role::Admin => None,
    }
}

pub struct CheckoutService {
    store: Arc<dyn EntitlementStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn EntitlementStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    pub async fn plan_checkout(&self, plan_role: &str, user_id: &str) -> Result<String, AppError> {
        let user_id = validate_user_id(user_id)?;
        let role = plan_role
            .parse::<Role>()
            .map_err(|_| AppError::BadRequest(format!("Invalid planRole '{}'", plan_role)))?;
        if !role.is_purchasable() {
            return Err(AppError::BadRequest(format!("Plan '{}' cannot be purchased", role)));
        }

        let plan = self.store.plan_configuration(role).await?;
        let configured_price = plan
            .as_ref()
            .and_then(|plan| parse_display_price(&plan.price))
            .filter(|price| *price > 0.0);
        let price = match configured_price.or_else(|| catalogue_price(role)) {
            Some(price) => price,
            None => {
                warn!("No price available for plan {}", role);
                return Err(AppError::Configuration(format!("No price configured for plan {}", role)));
            }
        };
        let price = validate_checkout_amount(price, "Plan")?;

        let plan_name = plan
            .map(|plan| plan.name)
            .unwrap_or_else(|| role.as_str().to_string());
        let item = CheckoutItem {
            title: format!("Plano {} OfertaFlash", plan_name),
            unit_price: price,
            external_reference: ExternalReference::plan(user_id, role).to_string(),
        };

        let link = self.gateway.create_checkout(&item).await?;
        info!("Plan checkout created for user {} ({} at {:.2})", user_id, role, price);
        Ok(link)
    }

    pub async fn credits_checkout(&self, amount: i64, price: f64, user_id: &str) -> Result<String, AppError> {
        let user_id = validate_user_id(user_id)?;
        if amount <= 0 {
            return Err(AppError::BadRequest(format!("Invalid credit amount ({})", amount)));
        }
        let price = validate_checkout_amount(price, "Credit")?;

        let item = CheckoutItem {
            title: format!("{} Créditos de IA Adicionais", amount),
            unit_price: price,
            external_reference: ExternalReference::credits(user_id, amount).to_string(),
        };

        let link = self.gateway.create_checkout(&item).await?;
        info!("Credit checkout created for user {} ({} credits at {:.2})", user_id, amount, price);
        Ok(link)
    }
}

/// Entitlements are keyed by profile UUID; anything else could never be reconciled.
fn validate_user_id(user_id: &str) -> Result<&str, AppError> {
    let user_id = user_id.trim();
    Uuid::parse_str(user_id).map_err(|_| AppError::BadRequest("Missing or invalid userId".to_string()))?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::billing::external_reference::decode;
    use crate::services::billing::testing::{FakeGateway, FakeStore};
    use pretty_assertions::assert_eq;

    const USER: &str = "4b1c6c36-0f7e-4c4e-9f55-3f0e1f6a2d10";

    fn service(store: &Arc<FakeStore>, gateway: &Arc<FakeGateway>) -> CheckoutService {
        CheckoutService::new(store.clone(), gateway.clone())
    }

    #[tokio::test]
    async fn test_plan_checkout_uses_configured_price() {
        let store = Arc::new(FakeStore::default());
        store.set_plan(Role::Premium, "R$ 89,90 / mês", vec![]);
        let gateway = Arc::new(FakeGateway::default());

        let link = service(&store, &gateway).plan_checkout("premium", USER).await.unwrap();

        let items = gateway.checkouts();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, 89.9);
        assert_eq!(items[0].external_reference, format!("{}_premium_premium", USER));
        assert_eq!(link, format!("https://checkout.example/{}_premium_premium", USER));
    }

    #[tokio::test]
    async fn test_plan_checkout_falls_back_to_catalogue() {
        let store = Arc::new(FakeStore::default());
        let gateway = Arc::new(FakeGateway::default());

        service(&store, &gateway).plan_checkout("pro", USER).await.unwrap();

        assert_eq!(gateway.checkouts()[0].unit_price, 199.0);
    }

    #[tokio::test]
    async fn test_plan_checkout_rejects_unpurchasable_roles() {
        let store = Arc::new(FakeStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&store, &gateway);

        for role in ["admin", "free", "enterprise"] {
            let err = service.plan_checkout(role, USER).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{}", role);
        }
        assert!(gateway.checkouts().is_empty());
    }

    #[tokio::test]
    async fn test_credits_checkout_reference_round_trips() {
        let store = Arc::new(FakeStore::default());
        let gateway = Arc::new(FakeGateway::default());

        service(&store, &gateway).credits_checkout(100, 19.9, USER).await.unwrap();

        let item = &gateway.checkouts()[0];
        assert_eq!(item.title, "100 Créditos de IA Adicionais");
        let reference = decode(&item.external_reference).unwrap();
        assert_eq!(reference.user_id, USER);
        assert!(reference.is_credits());
        assert_eq!(reference.action_value, "100");
    }

    #[tokio::test]
    async fn test_credits_checkout_validation() {
        let store = Arc::new(FakeStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let service = service(&store, &gateway);

        assert!(service.credits_checkout(0, 10.0, USER).await.is_err());
        assert!(service.credits_checkout(10, 0.0, USER).await.is_err());
        assert!(service.credits_checkout(10, 10.0, "").await.is_err());
        assert!(service.credits_checkout(10, 10.0, "bad_id").await.is_err());
        assert!(matches!(
            service.credits_checkout(10, 10.0, "u42").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service.plan_checkout("premium", "u42").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(gateway.checkouts().is_empty());
    }
}
