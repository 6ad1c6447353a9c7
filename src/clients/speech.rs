use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::clients::ProviderError;
use crate::clients::http_client::check_status;
use crate::config::settings::{SpeechConfig, SpeechProvider};

/// Anything shorter is an error payload or a truncated stream, never speech.
pub const MIN_AUDIO_BYTES: usize = 10_000;

const ELEVENLABS: &str = "ElevenLabs";
const GOOGLE_TTS: &str = "Google TTS";

/// Text-to-speech backend producing MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

/// The backend selected by `SPEECH_PROVIDER`.
pub fn synthesizer_from_config(config: &SpeechConfig, client: Client) -> Arc<dyn SpeechSynthesizer> {
    match config.provider {
        SpeechProvider::ElevenLabs => Arc::new(ElevenLabsClient::new(config, client)),
        SpeechProvider::GoogleTts => Arc::new(GoogleTtsClient::new(config, client)),
    }
}

/// Rejects undersized audio, surfacing a JSON error message if the body is one.
pub fn validate_audio(provider: &'static str, audio: Vec<u8>) -> Result<Vec<u8>, ProviderError> {
    if audio.len() >= MIN_AUDIO_BYTES {
        return Ok(audio);
    }

    let embedded = serde_json::from_slice::<Value>(&audio).ok().and_then(|body| {
        body.get("error")
            .or_else(|| body.get("detail"))
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            })
    });

    Err(ProviderError::malformed(
        provider,
        match embedded {
            Some(message) => message,
            None => format!("audio too small ({} bytes)", audio.len()),
        },
    ))
}

pub struct ElevenLabsClient {
    client: Client,
    api_key: Option<String>,
    voice_id: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(config: &SpeechConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.elevenlabs_api_key.clone(),
            voice_id: config.elevenlabs_voice_id.clone(),
            base_url: config.elevenlabs_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Auth {
            provider: ELEVENLABS,
            message: "ELEVENLABS_API_KEY is not configured".to_string(),
        })?;

        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);
        let payload = json!({
            "text": text,
            "model_id": "eleven_multilingual_v2",
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.8 },
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(ELEVENLABS, e))?;
        let response = check_status(ELEVENLABS, response).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| ProviderError::transport(ELEVENLABS, e))?;
        validate_audio(ELEVENLABS, audio.to_vec())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSynthesizeResponse {
    audio_content: Option<String>,
}

pub struct GoogleTtsClient {
    client: Client,
    api_key: Option<String>,
    voice: String,
    base_url: String,
}

impl GoogleTtsClient {
    pub fn new(config: &SpeechConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.google_tts_api_key.clone(),
            voice: config.google_tts_voice.clone(),
            base_url: config.google_tts_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::Auth {
            provider: GOOGLE_TTS,
            message: "GOOGLE_TTS_API_KEY is not configured".to_string(),
        })?;

        let url = format!("{}/text:synthesize", self.base_url);
        let payload = json!({
            "input": { "text": text },
            "voice": { "languageCode": "pt-BR", "name": self.voice },
            "audioConfig": { "audioEncoding": "MP3" },
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(GOOGLE_TTS, e))?;
        let response = check_status(GOOGLE_TTS, response).await?;

        let body: GoogleSynthesizeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(GOOGLE_TTS, format!("synthesize response: {}", e)))?;
        let encoded = body
            .audio_content
            .ok_or_else(|| ProviderError::malformed(GOOGLE_TTS, "no audioContent in response"))?;
        let audio = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ProviderError::malformed(GOOGLE_TTS, format!("audioContent is not base64: {}", e)))?;

        validate_audio(GOOGLE_TTS, audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::http_client::new_api_client;
    use crate::config::settings::SpeechProvider;
    use std::time::Duration;

    fn config(base_url: &str) -> SpeechConfig {
        SpeechConfig {
            provider: SpeechProvider::ElevenLabs,
            elevenlabs_api_key: Some("xi-key".to_string()),
            elevenlabs_voice_id: "voice-1".to_string(),
            elevenlabs_base_url: base_url.to_string(),
            google_tts_api_key: Some("g-key".to_string()),
            google_tts_base_url: base_url.to_string(),
            google_tts_voice: "pt-BR-Standard-A".to_string(),
        }
    }

    #[test]
    fn test_validate_audio_threshold() {
        assert!(validate_audio(ELEVENLABS, vec![0u8; MIN_AUDIO_BYTES]).is_ok());

        let err = validate_audio(ELEVENLABS, vec![0u8; 512]).unwrap_err();
        assert!(err.to_string().contains("512 bytes"));

        let err = validate_audio(ELEVENLABS, br#"{"detail":{"message":"voice not found"}}"#.to_vec()).unwrap_err();
        assert!(err.to_string().contains("voice not found"));
    }

    #[tokio::test]
    async fn test_elevenlabs_returns_audio_bytes() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/text-to-speech/voice-1")
            .match_header("xi-api-key", "xi-key")
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(vec![7u8; 12_000])
            .create_async()
            .await;

        let client = ElevenLabsClient::new(&config(&server.url()), new_api_client(Duration::from_secs(5)));
        let audio = client.synthesize("Olá").await.unwrap();

        mock.assert_async().await;
        assert_eq!(audio.len(), 12_000);
    }

    #[tokio::test]
    async fn test_google_tts_rejects_short_audio() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/text:synthesize")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "g-key".into()))
            .with_status(200)
            .with_body(format!(r#"{{"audioContent":"{}"}}"#, STANDARD.encode([1u8; 100])))
            .create_async()
            .await;

        let client = GoogleTtsClient::new(&config(&server.url()), new_api_client(Duration::from_secs(5)));
        let err = client.synthesize("Olá").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }
}
