use thiserror::Error;

/// Failure talking to a third-party API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} rejected credentials: {message}")]
    Auth { provider: &'static str, message: String },

    #[error("{provider} API error ({status:?}): {message}")]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} returned an unexpected payload: {message}")]
    MalformedResponse { provider: &'static str, message: String },
}

impl ProviderError {
    pub fn transport(provider: &'static str, error: reqwest::Error) -> Self {
        ProviderError::Upstream {
            provider,
            status: error.status().map(|s| s.as_u16()),
            message: format!("request failed: {}", error),
        }
    }

    pub fn malformed(provider: &'static str, message: impl Into<String>) -> Self {
        ProviderError::MalformedResponse {
            provider,
            message: message.into(),
        }
    }

    /// Upstream status, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}
