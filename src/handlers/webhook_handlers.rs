use actix_web::{post, web, HttpRequest, HttpResponse};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::handlers::error_json;
use crate::models::{AsaasEvent, MercadoPagoEvent, PaymentProvider, ProviderEvent};
use crate::security::WebhookAuthenticator;
use crate::services::billing::EntitlementReconciler;

#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
}

#[post("/mercadopago")]
pub async fn mercadopago_webhook(
    req: HttpRequest,
    query: web::Query<WebhookQuery>,
    body: web::Bytes,
    authenticator: web::Data<WebhookAuthenticator>,
    reconciler: web::Data<EntitlementReconciler>,
) -> HttpResponse {
    handle_webhook(
        PaymentProvider::MercadoPago,
        &req,
        query.data_id.as_deref(),
        &body,
        &authenticator,
        &reconciler,
    )
    .await
}

#[post("/asaas")]
pub async fn asaas_webhook(
    req: HttpRequest,
    body: web::Bytes,
    authenticator: web::Data<WebhookAuthenticator>,
    reconciler: web::Data<EntitlementReconciler>,
) -> HttpResponse {
    handle_webhook(PaymentProvider::Asaas, &req, None, &body, &authenticator, &reconciler).await
}

/// Authenticate, parse, reconcile. Anything redelivery cannot fix is
/// acknowledged with 200; storage and provider failures return 500 so the
/// provider retries.
async fn handle_webhook(
    provider: PaymentProvider,
    req: &HttpRequest,
    data_id: Option<&str>,
    body: &[u8],
    authenticator: &WebhookAuthenticator,
    reconciler: &EntitlementReconciler,
) -> HttpResponse {
    if let Err(e) = authenticator.verify(provider, req.headers(), data_id) {
        warn!("Rejected {} webhook: {}", provider, e);
        return error_json(&e);
    }

    let event = match parse_event(provider, body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring unparseable {} webhook: {}", provider, e);
            return acknowledge(e.to_string());
        }
    };

    // Only the query id is covered by the signature; the body must name the same resource
    if let Some(signed_id) = data_id.map(str::trim).filter(|id| !id.is_empty()) {
        if !signed_id.eq_ignore_ascii_case(event.resource_id()) {
            warn!(
                "Rejected {} webhook: data.id {} does not match body resource {}",
                provider,
                signed_id,
                event.resource_id()
            );
            return error_json(&AppError::Unauthorized(
                "Webhook resource id does not match signed id".to_string(),
            ));
        }
    }

    match reconciler.reconcile(&event).await {
        Ok(outcome) => {
            info!(
                "{} webhook {} for resource {}: {}",
                provider,
                event.label(),
                event.resource_id(),
                outcome.message
            );
            HttpResponse::Ok().json(json!({
                "received": true,
                "message": outcome.message,
                "effect": outcome.effect,
            }))
        }
        Err(e) if e.is_permanent() => {
            warn!("{} webhook for resource {} not applied: {}", provider, event.resource_id(), e);
            acknowledge(e.to_string())
        }
        Err(e) => {
            error!("{} webhook for resource {} failed: {}", provider, event.resource_id(), e);
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}

fn parse_event(provider: PaymentProvider, body: &[u8]) -> Result<ProviderEvent, AppError> {
    match provider {
        PaymentProvider::MercadoPago => MercadoPagoEvent::parse(body).map(ProviderEvent::MercadoPago),
        PaymentProvider::Asaas => AsaasEvent::parse(body).map(ProviderEvent::Asaas),
    }
}

fn acknowledge(message: String) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "received": true, "message": message }))
}
