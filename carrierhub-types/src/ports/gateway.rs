//! Payment gateway port.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Currency;
use crate::error::GatewayError;

/// Order to open at the gateway before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Amount in paise
    pub amount: i64,
    pub currency: Currency,
    pub receipt: String,
    /// Free-form key/value pairs the gateway stores with the order
    pub notes: BTreeMap<String, String>,
}

/// An order as the gateway reports it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub receipt: Option<String>,
}

/// Port trait for the payment gateway.
///
/// Signature checks are pure computations over shared secrets; only
/// `create_order` talks to the network.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Public key id handed to checkout clients.
    fn key_id(&self) -> &str;

    /// Creates an order with automatic capture enabled.
    async fn create_order(&self, req: OrderRequest) -> Result<GatewayOrder, GatewayError>;

    /// Checks the signature Checkout returns for `"{order_id}|{payment_id}"`.
    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Checks the `x-razorpay-signature` header against the raw request body.
    fn verify_webhook_signature(&self, body: &[u8], signature: Option<&str>) -> bool;
}
