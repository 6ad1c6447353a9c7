//! Authentication of inbound payment-provider callbacks.
//!
//! Every provider presents a shared secret header. Mercado Pago can also
//! sign requests (`x-signature`); once a signing secret is configured the
//! signature becomes mandatory and bounds replay to the tolerance window.

use actix_web::http::header::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::settings::WebhookConfig;
use crate::error::AppError;
use crate::models::PaymentProvider;

type HmacSha256 = Hmac<Sha256>;

pub const ASAAS_TOKEN_HEADER: &str = "asaas-access-token";
pub const MERCADOPAGO_TOKEN_HEADER: &str = "x-mercadopago-token";
pub const MERCADOPAGO_SIGNATURE_HEADER: &str = "x-signature";
pub const MERCADOPAGO_REQUEST_ID_HEADER: &str = "x-request-id";

/// Compares two strings in constant time to prevent timing attacks
pub fn constant_time_equal(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[derive(Debug, Clone)]
pub struct WebhookAuthenticator {
    config: WebhookConfig,
}

impl WebhookAuthenticator {
    pub fn new(config: WebhookConfig) -> Self {
        Self { config }
    }

    /// `data_id` is the `data.id` query parameter Mercado Pago signs; it is
    /// required once a signing secret is set and ignored for Asaas.
    pub fn verify(
        &self,
        provider: PaymentProvider,
        headers: &HeaderMap,
        data_id: Option<&str>,
    ) -> Result<(), AppError> {
        self.verify_at(provider, headers, data_id, Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        provider: PaymentProvider,
        headers: &HeaderMap,
        data_id: Option<&str>,
        now: i64,
    ) -> Result<(), AppError> {
        let (header_name, expected) = match provider {
            PaymentProvider::Asaas => (ASAAS_TOKEN_HEADER, self.config.asaas_token.as_deref()),
            PaymentProvider::MercadoPago => (
                MERCADOPAGO_TOKEN_HEADER,
                self.config.mercadopago_token.as_deref(),
            ),
        };

        let Some(expected) = expected else {
            log::error!("Webhook secret for {} is not configured; rejecting callback", provider);
            return Err(AppError::Unauthorized("Unauthorized webhook access".to_string()));
        };

        let presented = header_str(headers, header_name).ok_or_else(|| {
            log::warn!("{} callback without {} header", provider, header_name);
            AppError::Unauthorized("Unauthorized webhook access".to_string())
        })?;

        if !constant_time_equal(presented, expected) {
            log::warn!("{} callback presented an invalid access token", provider);
            return Err(AppError::Unauthorized("Unauthorized webhook access".to_string()));
        }

        if provider == PaymentProvider::MercadoPago {
            if let Some(secret) = self.config.mercadopago_signature_secret.as_deref() {
                self.verify_mercadopago_signature(secret, headers, data_id, now)?;
            }
        }

        Ok(())
    }

    fn verify_mercadopago_signature(
        &self,
        secret: &str,
        headers: &HeaderMap,
        data_id: Option<&str>,
        now: i64,
    ) -> Result<(), AppError> {
        // An id-less manifest would not bind the resource being reconciled
        let data_id = data_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                log::warn!("Signed Mercado Pago callback without data.id");
                AppError::Unauthorized("Missing signed resource id".to_string())
            })?;
        let signature = header_str(headers, MERCADOPAGO_SIGNATURE_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
        let (ts, v1) = parse_signature_header(signature)
            .ok_or_else(|| AppError::Unauthorized("Malformed webhook signature".to_string()))?;

        let ts_value: i64 = ts
            .parse()
            .map_err(|_| AppError::Unauthorized("Malformed webhook signature timestamp".to_string()))?;
        // Some deliveries carry milliseconds
        let ts_secs = if ts_value > 10_000_000_000 { ts_value / 1000 } else { ts_value };
        if (now - ts_secs).abs() > self.config.signature_tolerance_secs {
            log::warn!("Mercado Pago signature timestamp {} outside tolerance", ts);
            return Err(AppError::Unauthorized("Webhook signature expired".to_string()));
        }

        let manifest = signature_manifest(
            Some(data_id),
            header_str(headers, MERCADOPAGO_REQUEST_ID_HEADER),
            ts,
        );

        let expected = hex::decode(v1)
            .map_err(|_| AppError::Unauthorized("Malformed webhook signature".to_string()))?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Configuration(format!("Invalid signature secret: {}", e)))?;
        mac.update(manifest.as_bytes());
        mac.verify_slice(&expected).map_err(|_| {
            log::warn!("Mercado Pago signature mismatch");
            AppError::Unauthorized("Invalid webhook signature".to_string())
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parses `ts=<unix>,v1=<hex>` in any order.
fn parse_signature_header(value: &str) -> Option<(&str, &str)> {
    let mut ts = None;
    let mut v1 = None;
    for part in value.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", v)) => ts = Some(v.trim()),
            Some(("v1", v)) => v1 = Some(v.trim()),
            _ => {}
        }
    }
    Some((ts?, v1?))
}

/// Absent values are left out of the manifest.
pub fn signature_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    const NOW: i64 = 1_760_000_000;

    fn config(signature_secret: Option<&str>) -> WebhookConfig {
        WebhookConfig {
            mercadopago_token: Some("mp-secret".to_string()),
            asaas_token: Some("asaas-secret".to_string()),
            mercadopago_signature_secret: signature_secret.map(str::to_string),
            signature_tolerance_secs: 300,
        }
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    fn sign(secret: &str, manifest: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(manifest.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_constant_time_equal() {
        assert!(constant_time_equal("abc", "abc"));
        assert!(!constant_time_equal("abc", "abd"));
        assert!(!constant_time_equal("abc", "abcd"));
    }

    #[test]
    fn test_matching_tokens_are_accepted() {
        let auth = WebhookAuthenticator::new(config(None));
        assert!(auth
            .verify_at(PaymentProvider::Asaas, &headers(&[(ASAAS_TOKEN_HEADER, "asaas-secret")]), None, NOW)
            .is_ok());
        assert!(auth
            .verify_at(
                PaymentProvider::MercadoPago,
                &headers(&[(MERCADOPAGO_TOKEN_HEADER, "mp-secret")]),
                Some("123"),
                NOW
            )
            .is_ok());
    }

    #[test]
    fn test_missing_or_wrong_token_is_rejected() {
        let auth = WebhookAuthenticator::new(config(None));
        let missing = auth.verify_at(PaymentProvider::Asaas, &HeaderMap::new(), None, NOW);
        assert!(matches!(missing, Err(AppError::Unauthorized(_))));

        // A valid token for the other provider does not cross over
        let crossed = auth.verify_at(
            PaymentProvider::Asaas,
            &headers(&[(MERCADOPAGO_TOKEN_HEADER, "mp-secret")]),
            None,
            NOW,
        );
        assert!(crossed.is_err());

        let wrong = auth.verify_at(
            PaymentProvider::MercadoPago,
            &headers(&[(MERCADOPAGO_TOKEN_HEADER, "mp-secreT")]),
            None,
            NOW,
        );
        assert!(wrong.is_err());
    }

    #[test]
    fn test_unconfigured_secret_fails_closed() {
        let auth = WebhookAuthenticator::new(WebhookConfig::default());
        let result = auth.verify_at(PaymentProvider::Asaas, &headers(&[(ASAAS_TOKEN_HEADER, "")]), None, NOW);
        assert!(result.is_err());
        let result = auth.verify_at(PaymentProvider::Asaas, &headers(&[(ASAAS_TOKEN_HEADER, "x")]), None, NOW);
        assert!(result.is_err());
    }

    #[test]
    fn test_signature_manifest_layout() {
        assert_eq!(
            signature_manifest(Some("ABC123"), Some("req-1"), "1700"),
            "id:abc123;request-id:req-1;ts:1700;"
        );
        assert_eq!(signature_manifest(None, None, "1700"), "ts:1700;");
    }

    #[test]
    fn test_mercadopago_signature_is_required_when_configured() {
        let auth = WebhookAuthenticator::new(config(Some("sig-secret")));
        let ts = NOW.to_string();
        let v1 = sign("sig-secret", &signature_manifest(Some("123"), Some("req-1"), &ts));
        let signature = format!("ts={},v1={}", ts, v1);

        let valid = headers(&[
            (MERCADOPAGO_TOKEN_HEADER, "mp-secret"),
            (MERCADOPAGO_REQUEST_ID_HEADER, "req-1"),
            (MERCADOPAGO_SIGNATURE_HEADER, &signature),
        ]);
        assert!(auth.verify_at(PaymentProvider::MercadoPago, &valid, Some("123"), NOW).is_ok());

        // Signed for a different resource
        assert!(auth.verify_at(PaymentProvider::MercadoPago, &valid, Some("124"), NOW).is_err());

        // Replayed outside the tolerance window
        assert!(auth
            .verify_at(PaymentProvider::MercadoPago, &valid, Some("123"), NOW + 301)
            .is_err());

        let unsigned = headers(&[(MERCADOPAGO_TOKEN_HEADER, "mp-secret")]);
        assert!(auth.verify_at(PaymentProvider::MercadoPago, &unsigned, Some("123"), NOW).is_err());
    }

    #[test]
    fn test_signed_callback_without_data_id_is_rejected() {
        let auth = WebhookAuthenticator::new(config(Some("sig-secret")));
        let ts = NOW.to_string();
        // A signature over the id-less manifest must not authorise an arbitrary body id
        let v1 = sign("sig-secret", &signature_manifest(None, Some("req-1"), &ts));
        let signature = format!("ts={},v1={}", ts, v1);
        let signed = headers(&[
            (MERCADOPAGO_TOKEN_HEADER, "mp-secret"),
            (MERCADOPAGO_REQUEST_ID_HEADER, "req-1"),
            (MERCADOPAGO_SIGNATURE_HEADER, &signature),
        ]);

        let missing = auth.verify_at(PaymentProvider::MercadoPago, &signed, None, NOW);
        assert!(matches!(missing, Err(AppError::Unauthorized(_))));
        let blank = auth.verify_at(PaymentProvider::MercadoPago, &signed, Some(""), NOW);
        assert!(matches!(blank, Err(AppError::Unauthorized(_))));
    }
}
