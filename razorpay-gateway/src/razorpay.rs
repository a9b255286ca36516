//! Razorpay Orders API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use carrierhub_types::{GatewayError, GatewayOrder, OrderRequest, PaymentGateway};

use crate::signature;

pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com/v1";

/// Credentials and endpoint for the Razorpay API.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: Option<String>,
    pub api_base: String,
}

impl RazorpayConfig {
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

/// `PaymentGateway` backed by the Razorpay REST API.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http: reqwest::Client,
}

/// Body of `POST /orders`.
#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    payment_capture: u8,
    notes: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.config.key_id
    }

    #[tracing::instrument(skip(self, req), fields(receipt = %req.receipt, amount = req.amount))]
    async fn create_order(&self, req: OrderRequest) -> Result<GatewayOrder, GatewayError> {
        if self.config.key_id.is_empty() {
            return Err(GatewayError::NotConfigured("RAZORPAY_KEY_ID"));
        }
        if self.config.key_secret.is_empty() {
            return Err(GatewayError::NotConfigured("RAZORPAY_KEY_SECRET"));
        }

        let body = CreateOrderBody {
            amount: req.amount,
            currency: req.currency.as_str(),
            receipt: &req.receipt,
            payment_capture: 1,
            notes: &req.notes,
        };

        let resp = self
            .http
            .post(format!("{}/orders", self.config.api_base))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        let payload = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        // Error bodies from proxies in front of the API are not always JSON.
        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&payload)
                .map(|b| b.error)
                .unwrap_or_else(|_| ErrorDetail {
                    code: status.as_u16().to_string(),
                    description: status.canonical_reason().unwrap_or("error").to_string(),
                });
            tracing::warn!(status = status.as_u16(), code = %detail.code, "razorpay rejected order");
            return Err(GatewayError::Rejected {
                code: detail.code,
                description: detail.description,
            });
        }

        let order: GatewayOrder = serde_json::from_slice(&payload)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        tracing::info!(order_id = %order.id, "razorpay order created");
        Ok(order)
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        signature::verify_payment(&self.config.key_secret, order_id, payment_id, signature)
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: Option<&str>) -> bool {
        signature::verify_webhook(self.config.webhook_secret.as_deref(), body, signature)
    }
}
