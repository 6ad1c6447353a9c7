use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::clients::ProviderError;
use crate::clients::http_client::check_status;
use crate::config::settings::MercadoPagoConfig;
use crate::models::{ProviderResource, ResourceKind};

const PROVIDER: &str = "Mercado Pago";

/// Payment and preapproval lookups share these fields.
#[derive(Debug, Deserialize)]
struct MercadoPagoResource {
    status: String,
    external_reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    title: &'a str,
    quantity: u32,
    currency_id: &'a str,
    unit_price: f64,
}

#[derive(Debug, Serialize)]
struct BackUrls<'a> {
    success: &'a str,
    pending: &'a str,
    failure: &'a str,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
    items: Vec<PreferenceItem<'a>>,
    back_urls: BackUrls<'a>,
    auto_return: &'a str,
    external_reference: &'a str,
    notification_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    init_point: Option<String>,
}

/// What the buyer is charged for in a hosted checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutItem {
    pub title: String,
    pub unit_price: f64,
    pub external_reference: String,
}

#[derive(Debug, Clone)]
pub struct MercadoPagoClient {
    client: Client,
    access_token: Option<String>,
    base_url: String,
    notification_url: String,
    back_url: String,
}

impl MercadoPagoClient {
    pub fn new(config: &MercadoPagoConfig, client: Client) -> Self {
        Self {
            client,
            access_token: config.access_token.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            notification_url: config.notification_url.clone(),
            back_url: config.back_url.clone(),
        }
    }

    fn access_token(&self) -> Result<&str, ProviderError> {
        self.access_token.as_deref().ok_or(ProviderError::Auth {
            provider: PROVIDER,
            message: "MERCADOPAGO_ACCESS_TOKEN is not configured".to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_resource(&self, kind: ResourceKind, id: &str) -> Result<ProviderResource, ProviderError> {
        let token = self.access_token()?;
        let url = match kind {
            ResourceKind::Payment => format!("{}/v1/payments/{}", self.base_url, id),
            ResourceKind::Subscription => format!("{}/preapproval/{}", self.base_url, id),
        };

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let resource: MercadoPagoResource = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("{} {}: {}", kind.as_str(), id, e)))?;

        Ok(ProviderResource {
            id: id.to_string(),
            kind,
            status: resource.status,
            external_reference: resource.external_reference.filter(|r| !r.is_empty()),
        })
    }

    /// Creates a hosted checkout preference and returns its `init_point`.
    #[instrument(skip(self, item), fields(external_reference = %item.external_reference))]
    pub async fn create_preference(&self, item: &CheckoutItem) -> Result<String, ProviderError> {
        let token = self.access_token()?;
        let request = PreferenceRequest {
            items: vec![PreferenceItem {
                title: &item.title,
                quantity: 1,
                currency_id: "BRL",
                unit_price: item.unit_price,
            }],
            back_urls: BackUrls {
                success: &self.back_url,
                pending: &self.back_url,
                failure: &self.back_url,
            },
            auto_return: "approved",
            external_reference: &item.external_reference,
            notification_url: &self.notification_url,
        };

        let response = self
            .client
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let preference: PreferenceResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("preference response: {}", e)))?;

        let link = preference
            .init_point
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "preference has no init_point"))?;
        info!("Created Mercado Pago preference for {}", item.external_reference);
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http_client::new_api_client;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn client(base: &str, token: Option<&str>) -> MercadoPagoClient {
        MercadoPagoClient::new(
            &MercadoPagoConfig {
                access_token: token.map(str::to_string),
                api_base_url: base.to_string(),
                notification_url: "https://api.example.com/webhooks/mercadopago".to_string(),
                back_url: "https://app.example.com/#profile".to_string(),
            },
            new_api_client(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_fetch_payment_uses_v1_payments() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/payments/123")
            .match_header("authorization", "Bearer APP_USR-1")
            .with_body(r#"{"id":123,"status":"approved","external_reference":"u1_credits_50"}"#)
            .create_async()
            .await;

        let resource = client(&server.url(), Some("APP_USR-1"))
            .fetch_resource(ResourceKind::Payment, "123")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resource.status, "approved");
        assert_eq!(resource.external_reference.as_deref(), Some("u1_credits_50"));
        assert_eq!(resource.kind, ResourceKind::Payment);
    }

    #[tokio::test]
    async fn test_fetch_preapproval_path_and_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/preapproval/abc")
            .with_status(503)
            .with_body("unavailable")
            .create_async()
            .await;

        let err = client(&server.url(), Some("APP_USR-1"))
            .fetch_resource(ResourceKind::Subscription, "abc")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error() {
        let err = client("http://127.0.0.1:9", None)
            .fetch_resource(ResourceKind::Payment, "1")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_create_preference_returns_init_point() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/checkout/preferences")
            .match_body(Matcher::PartialJson(json!({
                "external_reference": "u1_credits_100",
                "auto_return": "approved",
                "items": [{ "quantity": 1, "currency_id": "BRL", "unit_price": 19.9 }],
            })))
            .with_status(201)
            .with_body(r#"{"id":"pref-1","init_point":"https://mp.example/checkout/pref-1"}"#)
            .create_async()
            .await;

        let link = client(&server.url(), Some("APP_USR-1"))
            .create_preference(&CheckoutItem {
                title: "100 Créditos de IA Adicionais".to_string(),
                unit_price: 19.9,
                external_reference: "u1_credits_100".to_string(),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(link, "https://mp.example/checkout/pref-1");
    }
}
