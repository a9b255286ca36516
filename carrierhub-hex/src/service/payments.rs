//! Checkout: gateway orders, signature verification and payment sessions.

use std::collections::BTreeMap;

use carrierhub_types::{
    AppError, BookingDetail, BookingId, BookingStatus, ConsultRepository, ConsultantType,
    Currency, NewPayment, OrderRequest, Payment, PaymentGateway, PaymentOrderResponse,
    PaymentSessionResponse, RecordOutcome, RepoError, Student, StudentId, VerifyPaymentRequest,
};

use super::ConsultService;
use crate::validation;

/// Path of the hosted checkout page.
pub const WEB_PAYMENT_PATH: &str = "/api/payments/web-payment";

/// Result of asking for a gateway order.
#[derive(Debug, Clone)]
pub struct OrderOutcome {
    pub order: PaymentOrderResponse,
    /// The booking already had an order attached; nothing was created.
    pub existing: bool,
}

impl OrderOutcome {
    pub fn message(&self) -> &'static str {
        if self.existing {
            "Payment order already exists"
        } else {
            "Payment order created successfully"
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub payment: Payment,
    pub already_verified: bool,
}

impl VerifyOutcome {
    pub fn message(&self) -> &'static str {
        if self.already_verified {
            "Payment already verified"
        } else {
            "Payment verified successfully"
        }
    }
}

/// Everything the hosted checkout page renders.
#[derive(Debug, Clone)]
pub struct CheckoutContext {
    pub key_id: String,
    pub order_id: String,
    pub booking_id: BookingId,
    pub consultant_type: ConsultantType,
    pub amount: i64,
    pub currency: Currency,
    pub student_name: String,
    pub student_email: String,
    pub student_phone: String,
}

impl<R: ConsultRepository, G: PaymentGateway> ConsultService<R, G> {
    pub fn key_id(&self) -> &str {
        self.gateway.key_id()
    }

    #[tracing::instrument(skip(self, student), fields(student_id = %student.id))]
    pub async fn create_payment_order(
        &self,
        student: &Student,
        booking_id: BookingId,
    ) -> Result<OrderOutcome, AppError> {
        let detail = self.payable_booking(booking_id, student.id).await?;
        let (order_id, existing) = self.ensure_order(&detail).await?;

        Ok(OrderOutcome {
            order: PaymentOrderResponse {
                order_id,
                amount: detail.booking.amount,
                currency: detail.booking.currency,
                key_id: self.gateway.key_id().to_string(),
            },
            existing,
        })
    }

    #[tracing::instrument(
        skip(self, student, req),
        fields(
            student_id = %student.id,
            order_id = %req.razorpay_order_id,
            payment_id = %req.razorpay_payment_id,
        )
    )]
    pub async fn verify_payment(
        &self,
        student: &Student,
        req: VerifyPaymentRequest,
    ) -> Result<VerifyOutcome, AppError> {
        let booking_id = validation::verify_payment(&req)?;

        let detail = self
            .repo
            .get_booking_for_student(booking_id, student.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

        if let Some(payment) = self
            .repo
            .find_payment_by_gateway_id(&req.razorpay_payment_id)
            .await?
        {
            if payment.booking_id != booking_id {
                return Err(AppError::PaymentMismatch(
                    "Payment belongs to a different booking".into(),
                ));
            }
            return Ok(VerifyOutcome {
                payment,
                already_verified: true,
            });
        }

        if let Some(order_id) = &detail.booking.razorpay_order_id {
            if *order_id != req.razorpay_order_id {
                return Err(AppError::PaymentMismatch(
                    "Order ID does not match this booking".into(),
                ));
            }
        }

        if !self.gateway.verify_payment_signature(
            &req.razorpay_order_id,
            &req.razorpay_payment_id,
            &req.razorpay_signature,
        ) {
            tracing::warn!(booking_id = %booking_id, "payment signature mismatch");
            if !detail.booking.status.is_settled() {
                self.repo
                    .update_booking_status(booking_id, BookingStatus::Failed)
                    .await?;
            }
            return Err(AppError::InvalidSignature("Invalid payment signature".into()));
        }

        let outcome = self
            .repo
            .record_payment(NewPayment {
                booking_id,
                razorpay_payment_id: req.razorpay_payment_id,
                razorpay_order_id: req.razorpay_order_id,
                razorpay_signature: req.razorpay_signature,
                amount: detail.booking.amount,
                currency: detail.booking.currency,
            })
            .await
            .map_err(|e| match e {
                RepoError::Conflict(_) => {
                    AppError::Duplicate("Booking already has a recorded payment".into())
                }
                other => other.into(),
            })?;

        let already_verified = matches!(outcome, RecordOutcome::AlreadyRecorded(_));
        let payment = match outcome {
            RecordOutcome::Recorded(p) | RecordOutcome::AlreadyRecorded(p) => p,
        };
        tracing::info!(booking_id = %booking_id, "payment verified");

        Ok(VerifyOutcome {
            payment,
            already_verified,
        })
    }

    /// Issues a short-lived token that opens the hosted checkout page.
    #[tracing::instrument(skip(self, student), fields(student_id = %student.id))]
    pub async fn create_payment_session(
        &self,
        student: &Student,
        booking_id: BookingId,
    ) -> Result<PaymentSessionResponse, AppError> {
        self.payable_booking(booking_id, student.id).await?;

        let payment_token = self.tokens.issue_payment_session(booking_id, student.id)?;
        let payment_url = format!("{WEB_PAYMENT_PATH}?token={payment_token}");

        Ok(PaymentSessionResponse {
            payment_token,
            payment_url,
        })
    }

    /// Resolves a payment session token into a ready-to-render checkout,
    /// creating the gateway order if the booking has none yet.
    #[tracing::instrument(skip(self, token))]
    pub async fn web_checkout(&self, token: &str) -> Result<CheckoutContext, AppError> {
        let claims = self.tokens.verify_payment_session(token)?;
        let detail = self
            .payable_booking(claims.booking_id, claims.student_id)
            .await?;
        let (order_id, _) = self.ensure_order(&detail).await?;

        Ok(CheckoutContext {
            key_id: self.gateway.key_id().to_string(),
            order_id,
            booking_id: detail.booking.id,
            consultant_type: detail.booking.consultant_type,
            amount: detail.booking.amount,
            currency: detail.booking.currency,
            student_name: detail.student.name,
            student_email: detail.student.email,
            student_phone: detail.student.phone,
        })
    }

    async fn payable_booking(
        &self,
        booking_id: BookingId,
        student_id: StudentId,
    ) -> Result<BookingDetail, AppError> {
        let detail = self
            .repo
            .get_booking_for_student(booking_id, student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

        if !detail.booking.status.is_payable() {
            return Err(AppError::InvalidBookingStatus(detail.booking.status));
        }
        Ok(detail)
    }

    /// Returns the attached order id, or creates and attaches one.
    async fn ensure_order(&self, detail: &BookingDetail) -> Result<(String, bool), AppError> {
        let booking = &detail.booking;
        if let Some(order_id) = &booking.razorpay_order_id {
            return Ok((order_id.clone(), true));
        }

        let notes = BTreeMap::from([
            ("bookingId".to_string(), booking.id.to_string()),
            ("studentId".to_string(), booking.student_id.to_string()),
            ("studentName".to_string(), detail.student.name.clone()),
            ("studentEmail".to_string(), detail.student.email.clone()),
            ("consultantType".to_string(), booking.consultant_type.to_string()),
            ("bookingDate".to_string(), booking.created_at.to_rfc3339()),
        ]);

        let order = self
            .gateway
            .create_order(OrderRequest {
                amount: booking.amount,
                currency: booking.currency,
                receipt: booking.id.to_string(),
                notes,
            })
            .await
            .inspect_err(|e| tracing::error!(booking_id = %booking.id, error = %e, "order creation failed"))?;

        self.repo.set_booking_order_id(booking.id, &order.id).await?;
        tracing::info!(booking_id = %booking.id, order_id = %order.id, "payment order created");
        Ok((order.id, false))
    }
}
