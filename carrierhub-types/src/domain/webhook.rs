//! Gateway webhooks: the parsed event and the log entry kept per delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

text_enum!(WebhookStatus, "webhook status" {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

/// One webhook delivery as stored in the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: i64,
    /// Value of the `x-razorpay-event-id` header, when the gateway sent one
    pub event_id: Option<String>,
    pub event_type: String,
    pub payload: Value,
    pub status: WebhookStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// `payload.payment.entity` of a payment event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: String,
}

/// `payload.refund.entity` of a refund event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefundEntity {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    #[serde(default)]
    pub status: String,
}

/// A webhook body reduced to the events the service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentCaptured(PaymentEntity),
    PaymentFailed(PaymentEntity),
    PaymentAuthorized(PaymentEntity),
    RefundProcessed(RefundEntity),
    Other(String),
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    payload: Value,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    entity: T,
}

impl GatewayEvent {
    /// Parses a webhook body of the form `{ "event": ..., "payload": {...} }`.
    pub fn parse(body: &Value) -> Result<Self, DomainError> {
        let envelope: Envelope = serde_json::from_value(body.clone())
            .map_err(|e| DomainError::InvalidPayload(e.to_string()))?;

        let event = match envelope.event.as_str() {
            "payment.captured" => Self::PaymentCaptured(entity(&envelope.payload, "payment")?),
            "payment.failed" => Self::PaymentFailed(entity(&envelope.payload, "payment")?),
            "payment.authorized" => Self::PaymentAuthorized(entity(&envelope.payload, "payment")?),
            "refund.processed" => Self::RefundProcessed(entity(&envelope.payload, "refund")?),
            _ => Self::Other(envelope.event),
        };
        Ok(event)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::PaymentCaptured(_) => "payment.captured",
            Self::PaymentFailed(_) => "payment.failed",
            Self::PaymentAuthorized(_) => "payment.authorized",
            Self::RefundProcessed(_) => "refund.processed",
            Self::Other(name) => name,
        }
    }
}

fn entity<T: serde::de::DeserializeOwned>(payload: &Value, key: &str) -> Result<T, DomainError> {
    let section = payload
        .get(key)
        .ok_or_else(|| DomainError::InvalidPayload(format!("missing payload.{key}")))?;
    serde_json::from_value::<Wrapped<T>>(section.clone())
        .map(|w| w.entity)
        .map_err(|e| DomainError::InvalidPayload(format!("payload.{key}.entity: {e}")))
}
