//! Gateway webhook processing.
//!
//! Signature and body problems are client errors. Once a delivery is
//! accepted it goes to the webhook log; storage failures after that point
//! surface as `AppError::Webhook` so the gateway retries. Business
//! anomalies (unknown order, amount mismatch) are acknowledged with
//! `success: false` instead, since a retry cannot fix them.

use carrierhub_types::{
    AppError, BookingStatus, ConsultRepository, GatewayEvent, NewPayment, NewWebhookEvent,
    PaymentEntity, PaymentGateway, RecordOutcome, RefundEntity, RepoError, WebhookStatus,
};

use super::ConsultService;

/// Body of a 200 response to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
}

impl WebhookAck {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl<R: ConsultRepository, G: PaymentGateway> ConsultService<R, G> {
    #[tracing::instrument(skip_all, fields(event_id = event_id.unwrap_or("-")))]
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
        event_id: Option<&str>,
    ) -> Result<WebhookAck, AppError> {
        if !self.gateway.verify_webhook_signature(body, signature) {
            tracing::warn!("webhook signature rejected");
            return Err(AppError::InvalidSignature("Invalid webhook signature".into()));
        }

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidPayload(format!("Invalid JSON payload: {e}")))?;
        let event = GatewayEvent::parse(&payload)
            .map_err(|e| AppError::InvalidPayload(e.to_string()))?;

        if let Some(id) = event_id {
            let previous = self.repo.find_webhook_event(id).await.map_err(webhook_err)?;
            if previous.is_some_and(|e| e.status == WebhookStatus::Completed) {
                tracing::info!(event = event.name(), "duplicate webhook delivery");
                return Ok(WebhookAck::ok("Event already processed"));
            }
        }

        let log = self
            .repo
            .record_webhook_event(NewWebhookEvent {
                event_id: event_id.map(str::to_string),
                event_type: event.name().to_string(),
                payload,
            })
            .await
            .map_err(webhook_err)?;

        match self.dispatch(&event).await {
            Ok(ack) => {
                self.repo
                    .update_webhook_status(log.id, WebhookStatus::Completed, None)
                    .await
                    .map_err(webhook_err)?;
                tracing::info!(event = event.name(), success = ack.success, message = %ack.message, "webhook handled");
                Ok(ack)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(event = event.name(), error = %reason, "webhook processing failed");
                if let Err(log_err) = self
                    .repo
                    .update_webhook_status(log.id, WebhookStatus::Failed, Some(&reason))
                    .await
                {
                    tracing::error!(error = %log_err, "could not mark webhook event failed");
                }
                Err(AppError::Webhook(reason))
            }
        }
    }

    async fn dispatch(&self, event: &GatewayEvent) -> Result<WebhookAck, RepoError> {
        match event {
            GatewayEvent::PaymentCaptured(payment) => self.on_captured(payment).await,
            GatewayEvent::PaymentFailed(payment) => self.on_failed(payment).await,
            GatewayEvent::PaymentAuthorized(payment) => self.on_authorized(payment).await,
            GatewayEvent::RefundProcessed(refund) => self.on_refund(refund).await,
            GatewayEvent::Other(name) => {
                tracing::debug!(event = %name, "unhandled webhook event");
                Ok(WebhookAck::ok(format!("Event {name} acknowledged")))
            }
        }
    }

    async fn on_captured(&self, payment: &PaymentEntity) -> Result<WebhookAck, RepoError> {
        let Some(order_id) = payment.order_id.as_deref() else {
            return Ok(WebhookAck::rejected("Booking not found"));
        };
        let Some(booking) = self.repo.find_booking_by_order_id(order_id).await? else {
            tracing::warn!(order_id, "captured payment for unknown order");
            return Ok(WebhookAck::rejected("Booking not found"));
        };

        if self.repo.find_payment_by_gateway_id(&payment.id).await?.is_some() {
            return Ok(WebhookAck::ok("Payment already processed"));
        }

        if payment.amount != booking.amount {
            tracing::warn!(
                booking_id = %booking.id,
                expected = booking.amount,
                received = payment.amount,
                "captured amount mismatch"
            );
            return Ok(WebhookAck::rejected("Amount mismatch detected"));
        }

        let outcome = self
            .repo
            .record_payment(NewPayment {
                booking_id: booking.id,
                razorpay_payment_id: payment.id.clone(),
                razorpay_order_id: order_id.to_string(),
                razorpay_signature: String::new(),
                amount: payment.amount,
                currency: booking.currency,
            })
            .await;

        match outcome {
            Ok(RecordOutcome::Recorded(_)) => Ok(WebhookAck::ok("Payment captured successfully")),
            Ok(RecordOutcome::AlreadyRecorded(_)) => {
                Ok(WebhookAck::ok("Payment already processed"))
            }
            Err(RepoError::Conflict(_)) => {
                tracing::warn!(booking_id = %booking.id, "booking already holds another payment");
                Ok(WebhookAck::rejected("Booking already has a recorded payment"))
            }
            Err(e) => Err(e),
        }
    }

    async fn on_failed(&self, payment: &PaymentEntity) -> Result<WebhookAck, RepoError> {
        let Some(booking) = self.booking_for(payment).await? else {
            return Ok(WebhookAck::rejected("Booking not found"));
        };

        if booking.status.is_settled() {
            return Ok(WebhookAck::ok("Booking already paid"));
        }

        self.repo
            .update_booking_status(booking.id, BookingStatus::Failed)
            .await?;
        Ok(WebhookAck::ok("Payment failure recorded"))
    }

    async fn on_authorized(&self, payment: &PaymentEntity) -> Result<WebhookAck, RepoError> {
        let Some(booking) = self.booking_for(payment).await? else {
            return Ok(WebhookAck::rejected("Booking not found"));
        };

        if booking.status.is_payable() {
            self.repo
                .update_booking_status(booking.id, BookingStatus::Processing)
                .await?;
        }
        Ok(WebhookAck::ok("Payment authorization recorded"))
    }

    async fn on_refund(&self, refund: &RefundEntity) -> Result<WebhookAck, RepoError> {
        match self.repo.mark_payment_refunded(&refund.payment_id).await? {
            Some(payment) => {
                tracing::info!(booking_id = %payment.booking_id, refund_id = %refund.id, "payment refunded");
                Ok(WebhookAck::ok("Refund processed"))
            }
            None => Ok(WebhookAck::rejected("Payment not found")),
        }
    }

    async fn booking_for(
        &self,
        payment: &PaymentEntity,
    ) -> Result<Option<carrierhub_types::Booking>, RepoError> {
        match payment.order_id.as_deref() {
            Some(order_id) => self.repo.find_booking_by_order_id(order_id).await,
            None => Ok(None),
        }
    }
}

fn webhook_err(e: RepoError) -> AppError {
    AppError::Webhook(e.to_string())
}
