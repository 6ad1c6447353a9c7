pub mod asaas_client;
pub mod error;
pub mod http_client;
pub mod mercadopago_client;
pub mod meta_graph_client;
pub mod openai_client;
pub mod speech;
pub mod woocommerce_client;

pub use asaas_client::AsaasClient;
pub use error::ProviderError;
pub use mercadopago_client::{CheckoutItem, MercadoPagoClient};
pub use meta_graph_client::MetaGraphClient;
pub use openai_client::OpenAiClient;
pub use speech::{synthesizer_from_config, ElevenLabsClient, GoogleTtsClient, SpeechSynthesizer};
pub use woocommerce_client::WooCommerceClient;
