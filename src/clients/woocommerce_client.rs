use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::clients::ProviderError;
use crate::clients::http_client::check_status;
use crate::config::settings::WooCommerceConfig;
use crate::models::CatalogProduct;

const PROVIDER: &str = "WooCommerce";
const PAGE_SIZE: &str = "10";

#[derive(Debug, Deserialize)]
struct WooProduct {
    id: i64,
    name: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    regular_price: String,
    #[serde(default)]
    sale_price: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    images: Vec<WooImage>,
}

#[derive(Debug, Deserialize)]
struct WooImage {
    src: String,
}

impl From<WooProduct> for CatalogProduct {
    fn from(p: WooProduct) -> Self {
        CatalogProduct {
            id: p.id,
            name: p.name,
            price: p.price,
            regular_price: p.regular_price,
            sale_price: p.sale_price,
            permalink: p.permalink,
            image_url: p.images.into_iter().next().map(|i| i.src),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WooCommerceClient {
    client: Client,
    store_url: Option<String>,
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
}

impl WooCommerceClient {
    pub fn new(config: &WooCommerceConfig, client: Client) -> Self {
        Self {
            client,
            store_url: config.store_url.as_ref().map(|u| u.trim_end_matches('/').to_string()),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
        }
    }

    /// One page of published products.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self, page: u32) -> Result<Vec<CatalogProduct>, ProviderError> {
        let (store_url, key, secret) = match (&self.store_url, &self.consumer_key, &self.consumer_secret) {
            (Some(url), Some(key), Some(secret)) => (url, key, secret),
            _ => {
                return Err(ProviderError::Auth {
                    provider: PROVIDER,
                    message: "store URL, consumer key and consumer secret must all be configured".to_string(),
                });
            }
        };

        let page = page.max(1).to_string();
        let response = self
            .client
            .get(format!("{}/wp-json/wc/v3/products", store_url))
            .query(&[
                ("per_page", PAGE_SIZE),
                ("page", page.as_str()),
                ("status", "publish"),
                ("consumer_key", key.as_str()),
                ("consumer_secret", secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let products: Vec<WooProduct> = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("products response: {}", e)))?;

        Ok(products.into_iter().map(CatalogProduct::from).collect())
    }
}
