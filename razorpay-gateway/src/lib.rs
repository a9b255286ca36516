//! # Razorpay Gateway
//!
//! `PaymentGateway` adapters for CarrierHub:
//!
//! - [`RazorpayGateway`] talks to the Razorpay Orders API.
//! - [`OfflineGateway`] creates orders locally, for development and tests.
//!
//! Both verify Checkout and webhook signatures the same way, through the
//! helpers in [`signature`].
//!
//! # Example
//! ```
//! use razorpay_gateway::signature;
//!
//! let sig = signature::payment_signature("order_1", "pay_1", "key_secret");
//! assert!(signature::verify_payment("key_secret", "order_1", "pay_1", &sig));
//! ```

mod offline;
mod razorpay;
pub mod signature;

use async_trait::async_trait;

use carrierhub_types::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};

pub use offline::OfflineGateway;
pub use razorpay::{DEFAULT_API_BASE, RazorpayConfig, RazorpayGateway};

/// Gateway chosen at startup: the live API when credentials are present,
/// the offline gateway otherwise.
pub enum Gateway {
    Razorpay(RazorpayGateway),
    Offline(OfflineGateway),
}

impl Gateway {
    /// Uses Razorpay when a key id is configured.
    pub fn from_config(config: RazorpayConfig) -> Result<Self, GatewayError> {
        if config.key_id.is_empty() {
            return Ok(Gateway::Offline(OfflineGateway::new(
                "rzp_offline",
                config.key_secret,
                config.webhook_secret,
            )));
        }
        Ok(Gateway::Razorpay(RazorpayGateway::new(config)?))
    }

    /// Name of the active gateway, for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            Gateway::Razorpay(_) => "razorpay",
            Gateway::Offline(_) => "offline",
        }
    }
}

#[async_trait]
impl PaymentGateway for Gateway {
    fn key_id(&self) -> &str {
        match self {
            Gateway::Razorpay(g) => g.key_id(),
            Gateway::Offline(g) => g.key_id(),
        }
    }

    async fn create_order(&self, req: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        match self {
            Gateway::Razorpay(g) => g.create_order(req).await,
            Gateway::Offline(g) => g.create_order(req).await,
        }
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        match self {
            Gateway::Razorpay(g) => g.verify_payment_signature(order_id, payment_id, signature),
            Gateway::Offline(g) => g.verify_payment_signature(order_id, payment_id, signature),
        }
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: Option<&str>) -> bool {
        match self {
            Gateway::Razorpay(g) => g.verify_webhook_signature(body, signature),
            Gateway::Offline(g) => g.verify_webhook_signature(body, signature),
        }
    }
}
