//! # CarrierHub Client SDK
//!
//! A typed Rust client for the CarrierHub API. Responses are unwrapped
//! from the `{ success, message, data }` envelope; failures surface the
//! server's error code and message.

use carrierhub_types::{
    AdminAuthResponse, AdminBookingQuery, ApiResponse, BookingDetail, BookingId,
    BookingListResponse, BookingResponse, CategoriesResponse, CategoryInfo, CreateBookingRequest,
    CreatePaymentRequest, DashboardStats, ErrorResponse, FieldError, HealthResponse,
    LoginRequest, PageQuery, Payment, PaymentKeyResponse, PaymentOrderResponse, PaymentResponse,
    PaymentSessionResponse, ProfileResponse, RegisterRequest, Student, StudentAuthResponse,
    UpdateBookingStatusRequest, VerifyPaymentRequest,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

const SIGNATURE_HEADER: &str = "x-razorpay-signature";
const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Vec<FieldError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response carried no data")]
    MissingData,
}

/// Outcome reported for a webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub success: bool,
    pub message: String,
}

/// CarrierHub API client.
pub struct CarrierHubClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl CarrierHubClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Public
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.send(self.http.get(self.url("/health"))).await
    }

    pub async fn categories(&self) -> Result<Vec<CategoryInfo>, ClientError> {
        let resp: CategoriesResponse = self
            .send(self.http.get(self.url("/api/categories")))
            .await?;
        Ok(resp.categories)
    }

    pub async fn payment_key(&self) -> Result<String, ClientError> {
        let resp: PaymentKeyResponse = self
            .send(self.http.get(self.url("/api/payments/key")))
            .await?;
        Ok(resp.key_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register(
        &self,
        req: &RegisterRequest,
    ) -> Result<StudentAuthResponse, ClientError> {
        self.send(self.http.post(self.url("/api/auth/register")).json(req))
            .await
    }

    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<StudentAuthResponse, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/api/auth/login")).json(&req))
            .await
    }

    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AdminAuthResponse, ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send(self.http.post(self.url("/api/auth/admin/login")).json(&req))
            .await
    }

    pub async fn me(&self) -> Result<Student, ClientError> {
        let resp: ProfileResponse = self
            .send(self.authed(self.http.get(self.url("/api/auth/me"))))
            .await?;
        Ok(resp.student)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_booking(
        &self,
        req: &CreateBookingRequest,
    ) -> Result<BookingDetail, ClientError> {
        let resp: BookingResponse = self
            .send(self.authed(self.http.post(self.url("/api/bookings")).json(req)))
            .await?;
        Ok(resp.booking)
    }

    pub async fn my_bookings(&self, page: &PageQuery) -> Result<BookingListResponse, ClientError> {
        self.send(self.authed(self.http.get(self.url("/api/bookings/me")).query(page)))
            .await
    }

    pub async fn get_booking(&self, id: BookingId) -> Result<BookingDetail, ClientError> {
        let resp: BookingResponse = self
            .send(self.authed(self.http.get(self.url(&format!("/api/bookings/{id}")))))
            .await?;
        Ok(resp.booking)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn admin_bookings(
        &self,
        query: &AdminBookingQuery,
    ) -> Result<BookingListResponse, ClientError> {
        self.send(self.authed(
            self.http.get(self.url("/api/admin/bookings")).query(query),
        ))
        .await
    }

    pub async fn update_booking_status(
        &self,
        id: BookingId,
        status: &str,
    ) -> Result<BookingDetail, ClientError> {
        let req = UpdateBookingStatusRequest {
            status: status.to_string(),
        };
        let resp: BookingResponse = self
            .send(self.authed(
                self.http
                    .patch(self.url(&format!("/api/admin/bookings/{id}/status")))
                    .json(&req),
            ))
            .await?;
        Ok(resp.booking)
    }

    /// Returns the CSV document as text.
    pub async fn export_bookings(&self, query: &AdminBookingQuery) -> Result<String, ClientError> {
        let resp = self
            .authed(self.http.get(self.url("/api/admin/bookings/export")).query(query))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        Ok(body)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        self.send(self.authed(self.http.get(self.url("/api/admin/dashboard/stats"))))
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Payments
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_payment(
        &self,
        booking_id: BookingId,
    ) -> Result<PaymentOrderResponse, ClientError> {
        let req = CreatePaymentRequest { booking_id };
        self.send(self.authed(
            self.http.post(self.url("/api/payments/create")).json(&req),
        ))
        .await
    }

    pub async fn verify_payment(&self, req: &VerifyPaymentRequest) -> Result<Payment, ClientError> {
        let resp: PaymentResponse = self
            .send(self.authed(self.http.post(self.url("/api/payments/verify")).json(req)))
            .await?;
        Ok(resp.payment)
    }

    pub async fn create_payment_session(
        &self,
        booking_id: BookingId,
    ) -> Result<PaymentSessionResponse, ClientError> {
        let req = CreatePaymentRequest { booking_id };
        self.send(self.authed(
            self.http
                .post(self.url("/api/payments/create-payment-session"))
                .json(&req),
        ))
        .await
    }

    /// Posts a raw webhook body exactly as given, so the signature still
    /// matches.
    pub async fn send_webhook(
        &self,
        body: Vec<u8>,
        signature: &str,
        event_id: Option<&str>,
    ) -> Result<WebhookReply, ClientError> {
        let mut req = self
            .http
            .post(self.url("/api/payments/webhook"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body);
        if let Some(id) = event_id {
            req = req.header(EVENT_ID_HEADER, id);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        let ack: ApiResponse<serde_json::Value> = serde_json::from_str(&body)?;
        Ok(WebhookReply {
            success: ack.success,
            message: ack.message,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        envelope.data.ok_or(ClientError::MissingData)
    }
}

/// Builds an `Api` error from an error envelope, falling back to the raw
/// body when the server did not send one.
fn api_error(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => ClientError::Api {
            status: status.as_u16(),
            code: err.error,
            message: err.message,
            details: err.details.unwrap_or_default(),
        },
        Err(_) => ClientError::Api {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("ERROR").to_string(),
            message: body.to_string(),
            details: Vec::new(),
        },
    }
}
