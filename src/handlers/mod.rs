pub mod ai_proxy_handlers;
pub mod catalog_handlers;
pub mod checkout_handlers;
pub mod health;
pub mod layout_handlers;
pub mod social_handlers;
pub mod speech_handlers;
pub mod webhook_handlers;

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::error::AppError;

/// `{error}` body with the status the error maps to.
pub fn error_json(error: &AppError) -> HttpResponse {
    HttpResponse::build(error.status_code()).json(json!({ "error": error.to_string() }))
}
