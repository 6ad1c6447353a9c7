use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// A product as entered by the retailer, the input of copy/script generation.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub old_price: Option<String>,
    pub unit: Option<String>,
}

/// A product record extracted from freeform text by the language model.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub old_price: Option<String>,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "un".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdScriptSuggestions {
    pub music: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdScript {
    pub headline: String,
    pub script: String,
    pub suggestions: AdScriptSuggestions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_base64: String,
    pub mime_type: String,
}

/// Simplified WooCommerce catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub regular_price: String,
    pub sale_price: String,
    pub permalink: String,
    pub image_url: Option<String>,
}
