use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{info, instrument};

use crate::clients::ProviderError;
use crate::config::settings::MetaConfig;

const PROVIDER: &str = "Meta Graph";

/// Graph error code for invalid or expired access tokens.
const OAUTH_EXCEPTION_CODE: i64 = 190;

#[derive(Debug, Clone)]
pub struct MetaGraphClient {
    client: Client,
    base_url: String,
}

impl MetaGraphClient {
    pub fn new(config: &MetaConfig, client: Client) -> Self {
        Self {
            client,
            base_url: format!(
                "{}/{}",
                config.graph_base_url.trim_end_matches('/'),
                config.api_version.trim_matches('/')
            ),
        }
    }

    /// Publishes an image to the Instagram business account linked to the
    /// page. The image URL must be publicly reachable.
    #[instrument(skip(self, page_token, caption))]
    pub async fn post_image(
        &self,
        page_token: &str,
        page_id: &str,
        image_url: &str,
        caption: &str,
    ) -> Result<String, ProviderError> {
        if page_token.is_empty() {
            return Err(ProviderError::Auth {
                provider: PROVIDER,
                message: "page access token is empty".to_string(),
            });
        }

        let account = self
            .client
            .get(format!("{}/{}", self.base_url, page_id))
            .query(&[("fields", "instagram_business_account"), ("access_token", page_token)])
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let account = graph_json(account).await?;
        let ig_account_id = account
            .get("instagram_business_account")
            .and_then(|a| a.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::malformed(PROVIDER, "no Instagram business account is linked to the page")
            })?
            .to_string();

        let container = self
            .client
            .post(format!("{}/{}/media", self.base_url, ig_account_id))
            .query(&[("image_url", image_url), ("caption", caption), ("access_token", page_token)])
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let container_id = id_field(&graph_json(container).await?, "media container")?;

        let published = self
            .client
            .post(format!("{}/{}/media_publish", self.base_url, ig_account_id))
            .query(&[("creation_id", container_id.as_str()), ("access_token", page_token)])
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let post_id = id_field(&graph_json(published).await?, "publish")?;

        info!("Published Instagram media {} for page {}", post_id, page_id);
        Ok(post_id)
    }
}

/// Graph reports failures as an `error` object, sometimes under a 200.
async fn graph_json(response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| ProviderError::malformed(PROVIDER, format!("response is not JSON: {}", e)))?;

    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown Graph error")
            .to_string();
        if error.get("code").and_then(Value::as_i64) == Some(OAUTH_EXCEPTION_CODE) {
            return Err(ProviderError::Auth {
                provider: PROVIDER,
                message,
            });
        }
        return Err(ProviderError::Upstream {
            provider: PROVIDER,
            status: Some(status.as_u16()),
            message,
        });
    }

    if !status.is_success() {
        return Err(ProviderError::Upstream {
            provider: PROVIDER,
            status: Some(status.as_u16()),
            message: body.to_string(),
        });
    }

    Ok(body)
}

fn id_field(body: &Value, step: &str) -> Result<String, ProviderError> {
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::malformed(PROVIDER, format!("{} response carried no id", step)))
}
