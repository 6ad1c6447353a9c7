use std::env;
use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub webhooks: WebhookConfig,
    pub mercadopago: MercadoPagoConfig,
    pub asaas: AsaasConfig,
    pub openai: OpenAiConfig,
    pub speech: SpeechConfig,
    pub meta: MetaConfig,
    pub woocommerce: WooCommerceConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub url: String,
}

/// Shared secrets presented by payment providers on their callbacks.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub mercadopago_token: Option<String>,
    pub asaas_token: Option<String>,
    pub mercadopago_signature_secret: Option<String>,
    pub signature_tolerance_secs: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MercadoPagoConfig {
    pub access_token: Option<String>,
    pub api_base_url: String,
    pub notification_url: String,
    pub back_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AsaasConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProvider {
    ElevenLabs,
    GoogleTts,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpeechConfig {
    pub provider: SpeechProvider,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_base_url: String,
    pub google_tts_api_key: Option<String>,
    pub google_tts_base_url: String,
    pub google_tts_voice: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetaConfig {
    pub graph_base_url: String,
    pub api_version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WooCommerceConfig {
    pub store_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
}

/// Reads an optional variable, treating an empty value as unset.
fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    optional_env(name).unwrap_or_else(|| default.to_string())
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        // App config
        let app_name = env_or("APP_NAME", "ofertaflash");
        let environment = env_or("ENVIRONMENT", "development");

        // Database config
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Configuration("DATABASE_URL must be set".to_string()))?;
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|_| AppError::Configuration("DATABASE_MAX_CONNECTIONS must be a valid number".to_string()))?;

        // Server config
        let server_host = env_or("SERVER_HOST", "0.0.0.0");
        let server_port = env_or("SERVER_PORT", "8080")
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        // CORS origins
        let cors_origins = env_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Public URL used in provider callbacks
        let server_url = optional_env("SERVER_URL")
            .unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

        // Webhook secrets
        let signature_tolerance_secs = env_or("WEBHOOK_SIGNATURE_TOLERANCE_SECS", "300")
            .parse::<i64>()
            .map_err(|_| AppError::Configuration("WEBHOOK_SIGNATURE_TOLERANCE_SECS must be a valid number".to_string()))?;

        // Mercado Pago
        let mercadopago_notification_url = optional_env("MERCADOPAGO_NOTIFICATION_URL")
            .unwrap_or_else(|| format!("{}/webhooks/mercadopago", server_url.trim_end_matches('/')));

        // Speech synthesis
        let speech_provider = match env_or("SPEECH_PROVIDER", "elevenlabs").to_lowercase().as_str() {
            "elevenlabs" => SpeechProvider::ElevenLabs,
            "google" | "google_tts" => SpeechProvider::GoogleTts,
            other => {
                return Err(AppError::Configuration(format!(
                    "SPEECH_PROVIDER must be 'elevenlabs' or 'google_tts', got '{}'",
                    other
                )));
            }
        };

        Ok(Self {
            app: AppConfig {
                name: app_name,
                environment,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
                url: server_url,
            },
            webhooks: WebhookConfig {
                mercadopago_token: optional_env("MERCADOPAGO_WEBHOOK_SECRET"),
                asaas_token: optional_env("ASAAS_WEBHOOK_AUTH_TOKEN"),
                mercadopago_signature_secret: optional_env("MERCADOPAGO_SIGNATURE_SECRET"),
                signature_tolerance_secs,
            },
            mercadopago: MercadoPagoConfig {
                access_token: optional_env("MERCADOPAGO_ACCESS_TOKEN"),
                api_base_url: env_or("MERCADOPAGO_API_URL", "https://api.mercadopago.com"),
                notification_url: mercadopago_notification_url,
                back_url: env_or("CHECKOUT_BACK_URL", "https://criarofertas.vercel.app/#profile"),
            },
            asaas: AsaasConfig {
                api_key: optional_env("ASAAS_API_KEY"),
                api_base_url: env_or("ASAAS_API_URL", "https://api.asaas.com"),
            },
            openai: OpenAiConfig {
                api_key: optional_env("OPENAI_API_KEY"),
                base_url: env_or("OPENAI_API_URL", "https://api.openai.com/v1"),
                text_model: env_or("OPENAI_TEXT_MODEL", "gpt-4o-mini"),
                image_model: env_or("OPENAI_IMAGE_MODEL", "dall-e-3"),
            },
            speech: SpeechConfig {
                provider: speech_provider,
                elevenlabs_api_key: optional_env("ELEVENLABS_API_KEY"),
                elevenlabs_voice_id: env_or("ELEVENLABS_VOICE_ID", "21m00Tz4R8PpnVzPzV0S"),
                elevenlabs_base_url: env_or("ELEVENLABS_API_URL", "https://api.elevenlabs.io/v1"),
                google_tts_api_key: optional_env("GOOGLE_TTS_API_KEY"),
                google_tts_base_url: env_or("GOOGLE_TTS_API_URL", "https://texttospeech.googleapis.com/v1"),
                google_tts_voice: env_or("GOOGLE_TTS_VOICE", "pt-BR-Standard-A"),
            },
            meta: MetaConfig {
                graph_base_url: env_or("META_GRAPH_API_URL", "https://graph.facebook.com"),
                api_version: env_or("META_GRAPH_API_VERSION", "v24.0"),
            },
            woocommerce: WooCommerceConfig {
                store_url: optional_env("WOOCOMMERCE_URL"),
                consumer_key: optional_env("WOOCOMMERCE_CONSUMER_KEY"),
                consumer_secret: optional_env("WOOCOMMERCE_CONSUMER_SECRET"),
            },
        })
    }
}
