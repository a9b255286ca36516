//! Gateway that never leaves the process.
//!
//! Orders get locally generated ids; signatures use the same secrets and
//! algorithm as the real gateway, so checkout flows can be exercised
//! end-to-end by signing with [`crate::signature::payment_signature`].

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;

use carrierhub_types::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};

use crate::signature;

pub struct OfflineGateway {
    key_id: String,
    key_secret: String,
    webhook_secret: Option<String>,
    orders: Mutex<Vec<(OrderRequest, GatewayOrder)>>,
    unavailable: AtomicBool,
}

impl OfflineGateway {
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret,
            orders: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes subsequent `create_order` calls fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Orders created so far, with the request that produced each.
    pub fn orders(&self) -> Vec<(OrderRequest, GatewayOrder)> {
        self.orders.lock().map(|o| o.clone()).unwrap_or_default()
    }

    fn generate_id(prefix: &str) -> String {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(14)
            .map(char::from)
            .collect();
        format!("{prefix}_{suffix}")
    }
}

#[async_trait]
impl PaymentGateway for OfflineGateway {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    async fn create_order(&self, req: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("offline gateway unavailable".into()));
        }

        let order = GatewayOrder {
            id: Self::generate_id("order"),
            amount: req.amount,
            currency: req.currency.as_str().to_string(),
            status: "created".to_string(),
            receipt: Some(req.receipt.clone()),
        };
        tracing::debug!(order_id = %order.id, "offline order created");

        if let Ok(mut orders) = self.orders.lock() {
            orders.push((req, order.clone()));
        }
        Ok(order)
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature::verify_payment(&self.key_secret, order_id, payment_id, signature)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: Option<&str>) -> bool {
        signature::verify_webhook(self.webhook_secret.as_deref(), body, signature)
    }
}
