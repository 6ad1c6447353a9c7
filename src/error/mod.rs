use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::error::Error as StdError;
use sqlx::error::Error as SqlxError;

use crate::clients::ProviderError;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Internal(String),
    Auth(String),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Configuration(String),
    Validation(String),
    Parse(String),
    Upstream { provider: String, status: Option<u16>, message: String },
    MalformedResponse(String),
    Serialization(String),
}

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    code: u16,
    message: String,
    error_type: String,
}

impl AppError {
    /// Errors that will not go away on redelivery of the same request.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::Parse(_)
                | AppError::Validation(_)
                | AppError::BadRequest(_)
                | AppError::NotFound(_)
        )
    }

    fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
            AppError::Auth(_) => "authentication_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Configuration(_) => "configuration_error",
            AppError::Validation(_) => "validation_error",
            AppError::Parse(_) => "parse_error",
            AppError::Upstream { .. } => "upstream_error",
            AppError::MalformedResponse(_) => "malformed_response",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
            AppError::Auth(e) => write!(f, "Authentication error: {}", e),
            AppError::Unauthorized(e) => write!(f, "Unauthorized: {}", e),
            AppError::NotFound(e) => write!(f, "Not found: {}", e),
            AppError::BadRequest(e) => write!(f, "Bad request: {}", e),
            AppError::Configuration(e) => write!(f, "Configuration error: {}", e),
            AppError::Validation(e) => write!(f, "Validation error: {}", e),
            AppError::Parse(e) => write!(f, "Parse error: {}", e),
            AppError::Upstream { provider, status: Some(status), message } => {
                write!(f, "{} API error ({}): {}", provider, status, message)
            }
            AppError::Upstream { provider, status: None, message } => {
                write!(f, "{} API request failed: {}", provider, message)
            }
            AppError::MalformedResponse(e) => write!(f, "Malformed provider response: {}", e),
            AppError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl StdError for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_response = ErrorResponse {
            code: status_code.as_u16(),
            message: self.to_string(),
            error_type: self.error_type().to_string(),
        };

        HttpResponse::build(status_code).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Parse(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SqlxError> for AppError {
    fn from(error: SqlxError) -> Self {
        match error {
            SqlxError::RowNotFound => AppError::NotFound("Record not found".to_string()),
            _ => AppError::Database(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Serialization(format!("JSON deserialization/serialization error: {}", error))
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::Auth { provider, message } => {
                AppError::Auth(format!("{}: {}", provider, message))
            }
            ProviderError::Upstream { provider, status, message } => AppError::Upstream {
                provider: provider.to_string(),
                status,
                message,
            },
            ProviderError::MalformedResponse { provider, message } => {
                AppError::MalformedResponse(format!("{}: {}", provider, message))
            }
        }
    }
}

// Define AppResult type alias for Result<T, AppError>
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_errors_are_acknowledged() {
        assert!(AppError::Parse("bad reference".into()).is_permanent());
        assert!(AppError::Validation("admin".into()).is_permanent());
        assert!(!AppError::Database("connection reset".into()).is_permanent());
        assert!(!AppError::Upstream {
            provider: "mercadopago".into(),
            status: Some(503),
            message: "unavailable".into(),
        }
        .is_permanent());
    }

    #[test]
    fn test_provider_error_status_mapping() {
        let auth: AppError = ProviderError::Auth {
            provider: "openai",
            message: "missing key".into(),
        }
        .into();
        assert_eq!(auth.status_code(), StatusCode::UNAUTHORIZED);

        let malformed: AppError = ProviderError::MalformedResponse {
            provider: "elevenlabs",
            message: "too small".into(),
        }
        .into();
        assert_eq!(malformed.status_code(), StatusCode::BAD_GATEWAY);
    }
}
