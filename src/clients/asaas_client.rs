use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::clients::ProviderError;
use crate::clients::http_client::check_status;
use crate::config::settings::AsaasConfig;
use crate::models::{ProviderResource, ResourceKind};

const PROVIDER: &str = "Asaas";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasPayment {
    status: String,
    external_reference: Option<String>,
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsaasSubscription {
    status: String,
    external_reference: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Clone)]
pub struct AsaasClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl AsaasClient {
    pub fn new(config: &AsaasConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Payments generated by a subscription are reported as subscription
    /// resources, so their lifecycle drives the plan rather than a one-off.
    #[instrument(skip(self))]
    pub async fn fetch_resource(&self, kind: ResourceKind, id: &str) -> Result<ProviderResource, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Auth {
            provider: PROVIDER,
            message: "ASAAS_API_KEY is not configured".to_string(),
        })?;

        let path = match kind {
            ResourceKind::Payment => "payments",
            ResourceKind::Subscription => "subscriptions",
        };
        let response = self
            .client
            .get(format!("{}/v3/{}/{}", self.base_url, path, id))
            .header("access_token", api_key)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        match kind {
            ResourceKind::Payment => {
                let payment: AsaasPayment = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::malformed(PROVIDER, format!("payment {}: {}", id, e)))?;
                let effective_kind = if payment.subscription.as_deref().is_some_and(|s| !s.is_empty()) {
                    ResourceKind::Subscription
                } else {
                    ResourceKind::Payment
                };
                Ok(ProviderResource {
                    id: id.to_string(),
                    kind: effective_kind,
                    status: payment.status,
                    external_reference: payment.external_reference.filter(|r| !r.is_empty()),
                })
            }
            ResourceKind::Subscription => {
                let subscription: AsaasSubscription = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::malformed(PROVIDER, format!("subscription {}: {}", id, e)))?;
                Ok(ProviderResource {
                    id: id.to_string(),
                    kind,
                    status: if subscription.deleted {
                        "deleted".to_string()
                    } else {
                        subscription.status
                    },
                    external_reference: subscription.external_reference.filter(|r| !r.is_empty()),
                })
            }
        }
    }
}
