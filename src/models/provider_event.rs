//! Inbound payment-provider notifications and the provider resources they
//! point at.
//!
//! Webhook bodies are never trusted for status or ownership: they only name
//! a resource, which is then re-fetched from the provider's API. Parsing is
//! total, returning `AppError::Parse` instead of panicking on odd payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    MercadoPago,
    Asaas,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::MercadoPago => "mercadopago",
            PaymentProvider::Asaas => "asaas",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Payment,
    Subscription,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Payment => "payment",
            ResourceKind::Subscription => "subscription",
        }
    }
}

/// Provider status normalised into the payment/subscription lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Other(String),
}

impl ResourceState {
    pub fn from_provider_status(status: &str) -> Self {
        let normalized = status.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "approved" | "authorized" | "active" | "confirmed" | "received" | "received_in_cash" => {
                ResourceState::Approved
            }
            "pending" | "awaiting_risk_analysis" => ResourceState::Pending,
            "rejected" => ResourceState::Rejected,
            "cancelled" | "canceled" | "paused" | "refunded" | "charged_back" | "overdue"
            | "deleted" | "expired" | "inactive" => ResourceState::Cancelled,
            _ => ResourceState::Other(normalized),
        }
    }

    /// Stable label used as part of the dedupe ledger key.
    pub fn ledger_label(&self) -> &str {
        match self {
            ResourceState::Pending => "pending",
            ResourceState::Approved => "approved",
            ResourceState::Rejected => "rejected",
            ResourceState::Cancelled => "cancelled",
            ResourceState::Other(raw) => raw.as_str(),
        }
    }
}

/// A resource as reported by the provider's own API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderResource {
    pub id: String,
    pub kind: ResourceKind,
    pub status: String,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MercadoPagoEvent {
    pub topic: String,
    pub resource_id: String,
    pub action: Option<String>,
}

impl MercadoPagoEvent {
    /// Accepts both the current `{type, data: {id}}` shape and the legacy
    /// `{topic, id}` IPN shape. Ids may arrive as strings or numbers.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Parse(format!("Invalid JSON body: {}", e)))?;

        let topic = payload
            .get("topic")
            .or_else(|| payload.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let resource_id = payload
            .get("data")
            .and_then(|data| data.get("id"))
            .or_else(|| payload.get("id"))
            .and_then(id_as_string);

        match (topic, resource_id) {
            (Some(topic), Some(resource_id)) if !topic.is_empty() && !resource_id.is_empty() => {
                Ok(Self {
                    topic,
                    resource_id,
                    action: payload.get("action").and_then(Value::as_str).map(str::to_string),
                })
            }
            _ => Err(AppError::Parse("Missing topic or resource ID".to_string())),
        }
    }

    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self.topic.as_str() {
            "payment" => Some(ResourceKind::Payment),
            "preapproval" | "subscription_preapproval" => Some(ResourceKind::Subscription),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsaasEvent {
    pub event: String,
    pub resource_id: String,
    pub kind: ResourceKind,
}

impl AsaasEvent {
    /// `PAYMENT_*` events carry a `payment` object, `SUBSCRIPTION_*` events a
    /// `subscription` object.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Parse(format!("Invalid JSON body: {}", e)))?;

        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .filter(|event| !event.is_empty())
            .ok_or_else(|| AppError::Parse("Missing event name".to_string()))?
            .to_string();

        let (kind, object) = if let Some(payment) = payload.get("payment").filter(|v| v.is_object()) {
            (ResourceKind::Payment, payment)
        } else if let Some(subscription) = payload.get("subscription").filter(|v| v.is_object()) {
            (ResourceKind::Subscription, subscription)
        } else {
            return Err(AppError::Parse(format!("Event {} carries no payment or subscription", event)));
        };

        let resource_id = object
            .get("id")
            .and_then(id_as_string)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Parse("Missing resource ID".to_string()))?;

        Ok(Self {
            event,
            resource_id,
            kind,
        })
    }
}

/// A validated provider notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    MercadoPago(MercadoPagoEvent),
    Asaas(AsaasEvent),
}

impl ProviderEvent {
    pub fn provider(&self) -> PaymentProvider {
        match self {
            ProviderEvent::MercadoPago(_) => PaymentProvider::MercadoPago,
            ProviderEvent::Asaas(_) => PaymentProvider::Asaas,
        }
    }

    pub fn resource_id(&self) -> &str {
        match self {
            ProviderEvent::MercadoPago(event) => &event.resource_id,
            ProviderEvent::Asaas(event) => &event.resource_id,
        }
    }

    /// `None` for topics this service does not act on.
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            ProviderEvent::MercadoPago(event) => event.resource_kind(),
            ProviderEvent::Asaas(event) => Some(event.kind),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ProviderEvent::MercadoPago(event) => &event.topic,
            ProviderEvent::Asaas(event) => &event.event,
        }
    }
}

/// Resource ids end up in provider URL paths, so only plain tokens pass.
fn id_as_string(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        .then_some(id)
}
