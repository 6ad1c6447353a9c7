use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::skip_serializing_none;
use tracing::{debug, instrument};

use crate::clients::ProviderError;
use crate::clients::http_client::check_status;
use crate::config::settings::OpenAiConfig;
use crate::models::{AdScript, GeneratedImage, ParsedProduct, Product};

const PROVIDER: &str = "OpenAI";

// OpenAI Chat Completion Request Structs
#[skip_serializing_none]
#[derive(Debug, Serialize, Clone)]
pub struct OpenAIChatRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    pub temperature: Option<f32>,
    pub response_format: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChatResponse {
    pub choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIImageRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIImageResponse {
    data: Vec<OpenAIImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAIImageData {
    b64_json: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    image_model: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::Auth {
            provider: PROVIDER,
            message: "OPENAI_API_KEY is not configured".to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn generate_marketing_copy(&self, topic: &str) -> Result<String, ProviderError> {
        let prompt = format!(
            "Escreva um título curto, chamativo e empolgante (no máximo 8 palavras) para um cartaz de ofertas de varejo sobre: {}. Idioma: português do Brasil. Não use aspas.",
            topic
        );
        let text = self.chat(prompt, false).await?;
        Ok(text.trim().trim_matches('"').to_string())
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn parse_products_from_text(&self, text: &str) -> Result<Vec<ParsedProduct>, ProviderError> {
        let prompt = format!(
            "Extraia a lista de produtos com preços do texto abaixo. Responda apenas com JSON no formato \
             {{\"products\": [{{\"name\": \"Nome\", \"description\": \"Descrição curta (opcional)\", \
             \"price\": \"9.99\", \"oldPrice\": \"12.99 (opcional)\", \"unit\": \"un, kg, g...\"}}]}}.\n\nTexto: \"{}\"",
            text
        );
        let raw = self.chat(prompt, true).await?;
        parse_products_payload(&raw)
    }

    #[instrument(skip(self))]
    pub async fn generate_background_image(&self, prompt: &str) -> Result<GeneratedImage, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/images/generations", self.base_url);
        let request = OpenAIImageRequest {
            model: &self.image_model,
            prompt: format!(
                "Imagem de fundo para encarte de supermercado, textura de marketing, alta qualidade, sem texto: {}",
                prompt
            ),
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let body: OpenAIImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("image response: {}", e)))?;

        let image_base64 = body
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "image response carried no data"))?;

        Ok(GeneratedImage {
            image_base64,
            mime_type: "image/png".to_string(),
        })
    }

    #[instrument(skip(self, products), fields(products = products.len()))]
    pub async fn generate_ad_script(&self, products: &[Product]) -> Result<AdScript, ProviderError> {
        let listing = products
            .iter()
            .map(|p| {
                let old = p
                    .old_price
                    .as_deref()
                    .map(|old| format!(" (de R$ {})", old))
                    .unwrap_or_default();
                format!(
                    "- {}: R$ {} / {}{}",
                    p.name,
                    p.price,
                    p.unit.as_deref().unwrap_or("un"),
                    old
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Crie um roteiro curto (máximo 30 segundos) de anúncio de áudio/vídeo em português do Brasil \
             para os produtos abaixo, com uma chamada para ação clara. Responda apenas com JSON no formato \
             {{\"headline\": \"...\", \"script\": \"...\", \"suggestions\": {{\"music\": \"...\", \"voice\": \"...\"}}}}.\n\nProdutos:\n{}",
            listing
        );
        let raw = self.chat(prompt, true).await?;
        serde_json::from_str::<AdScript>(&raw)
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("ad script is not valid JSON: {}", e)))
    }

    async fn chat(&self, prompt: String, json_mode: bool) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.base_url);
        let request = OpenAIChatRequest {
            model: self.text_model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: Some(0.7),
            response_format: json_mode.then(|| json!({ "type": "json_object" })),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        let response = check_status(PROVIDER, response).await?;

        let body: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(PROVIDER, format!("chat response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::malformed(PROVIDER, "chat response had no content"))?;

        debug!("OpenAI returned {} characters", content.len());
        Ok(content)
    }
}

/// Accepts either a bare JSON array or an object with a `products` array.
pub fn parse_products_payload(raw: &str) -> Result<Vec<ParsedProduct>, ProviderError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ProviderError::malformed(PROVIDER, format!("products are not valid JSON: {}", e)))?;

    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("products") {
            Some(products @ Value::Array(_)) => products,
            _ => return Err(ProviderError::malformed(PROVIDER, "expected a `products` array")),
        },
        _ => return Err(ProviderError::malformed(PROVIDER, "expected a JSON array of products")),
    };

    serde_json::from_value(list)
        .map_err(|e| ProviderError::malformed(PROVIDER, format!("invalid product entry: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http_client::new_api_client;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn config(base_url: String, api_key: Option<&str>) -> OpenAiConfig {
        OpenAiConfig {
            api_key: api_key.map(str::to_string),
            base_url,
            text_model: "gpt-4o-mini".to_string(),
            image_model: "dall-e-3".to_string(),
        }
    }

    fn chat_body(content: &str) -> String {
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
    }

    #[test]
    fn test_parse_products_payload_shapes() {
        let bare = parse_products_payload(r#"[{"name":"Arroz","price":"19.90","unit":"kg"}]"#).unwrap();
        let wrapped =
            parse_products_payload(r#"{"products":[{"name":"Arroz","price":"19.90","unit":"kg"}]}"#).unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare[0].unit, "kg");

        let defaulted = parse_products_payload(r#"[{"name":"Leite","price":"4.99"}]"#).unwrap();
        assert_eq!(defaulted[0].unit, "un");

        assert!(parse_products_payload(r#"{"items":[]}"#).is_err());
        assert!(parse_products_payload("não é json").is_err());
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_request() {
        let client = OpenAiClient::new(
            &config("http://127.0.0.1:9".to_string(), None),
            new_api_client(Duration::from_secs(5)),
        );
        let err = client.generate_marketing_copy("café").await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_parse_products_from_text_calls_chat_completions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body(r#"{"products":[{"name":"Feijão","price":"8.49","unit":"kg"}]}"#))
            .create_async()
            .await;

        let client = OpenAiClient::new(
            &config(server.url(), Some("sk-test")),
            new_api_client(Duration::from_secs(5)),
        );
        let products = client.parse_products_from_text("Feijão 8,49 o kg").await.unwrap();

        mock.assert_async().await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Feijão");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key"}}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(
            &config(server.url(), Some("sk-bad")),
            new_api_client(Duration::from_secs(5)),
        );
        let err = client.generate_marketing_copy("promo").await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_generate_background_image_returns_base64() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/images/generations")
            .with_status(200)
            .with_body(r#"{"created":1,"data":[{"b64_json":"iVBORw0KGgo="}]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new(
            &config(server.url(), Some("sk-test")),
            new_api_client(Duration::from_secs(5)),
        );
        let image = client.generate_background_image("frutas").await.unwrap();
        assert_eq!(image.image_base64, "iVBORw0KGgo=");
        assert_eq!(image.mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_generate_ad_script_rejects_non_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(chat_body("Aqui está seu roteiro!"))
            .create_async()
            .await;

        let client = OpenAiClient::new(
            &config(server.url(), Some("sk-test")),
            new_api_client(Duration::from_secs(5)),
        );
        let err = client.generate_ad_script(&[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }
}
