//! Captured payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{BookingId, PaymentId};
use super::money::Currency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Success,
    Failed,
    Refunded,
}

text_enum!(PaymentStatus, "payment status" {
    Pending => "PENDING",
    Success => "SUCCESS",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

/// A gateway payment recorded against a booking.
///
/// `razorpay_payment_id` is unique across the table and a booking carries
/// at most one payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub booking_id: BookingId,
    #[schema(example = "pay_29QQoUBi66xm2f")]
    pub razorpay_payment_id: String,
    #[schema(example = "order_9A33XWu170gUtm")]
    pub razorpay_order_id: String,
    /// Empty when the payment arrived through a webhook
    pub razorpay_signature: String,
    pub amount: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn summary(&self) -> PaymentSummary {
        PaymentSummary {
            id: self.id,
            razorpay_payment_id: self.razorpay_payment_id.clone(),
            amount: self.amount,
            currency: self.currency,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// The payment fields embedded in booking listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub id: PaymentId,
    pub razorpay_payment_id: String,
    pub amount: i64,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}
