//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    Admin, BookingDetail, BookingId, BookingStatus, ConsultantType, Currency, Payment,
    Student, StudentId,
};
use crate::domain::ids::{optional_positive_id, positive_id};
use crate::error::FieldError;

// ─────────────────────────────────────────────────────────────────────────────
// Envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Success envelope wrapping every JSON response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Body without a payload, as used for webhook acknowledgements.
    pub fn ack(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            data: None,
        }
    }
}

/// Error envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    #[schema(example = "Validation failed")]
    pub message: String,
    /// Machine-readable error code
    #[schema(example = "VALIDATION_ERROR")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to register a new student.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Test Student")]
    #[serde(default)]
    pub name: String,
    #[schema(example = "student@carrierhub.com")]
    #[serde(default)]
    pub email: String,
    /// Indian mobile number, optionally prefixed with +91, 91 or 0
    #[schema(example = "9876543210")]
    #[serde(default)]
    pub phone: String,
    #[schema(example = "Student@123456")]
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentAuthResponse {
    pub student: Student,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminAuthResponse {
    pub admin: Admin,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub student: Student,
}

// ─────────────────────────────────────────────────────────────────────────────
// Booking DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to book a consultation.
///
/// `consultantType` stays a string here so that unknown values surface as
/// field-level validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[schema(example = "CAREER_GUIDANCE")]
    #[serde(default)]
    pub consultant_type: String,
    #[schema(example = "Need guidance on choosing between engineering and medicine")]
    #[serde(default)]
    pub details: String,
    /// Amount in paise
    #[schema(example = 150000)]
    #[serde(default)]
    pub amount: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookingStatusRequest {
    #[schema(example = "COMPLETED")]
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
    pub booking: BookingDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            pages: (total + limit_i - 1) / limit_i,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingListResponse {
    pub bookings: Vec<BookingDetail>,
    pub pagination: Pagination,
}

/// Query string of `GET /api/bookings/me`. Raw strings, validated by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Query string of the admin listing and export endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBookingQuery {
    pub status: Option<String>,
    pub consultant_type: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// One entry of the category catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryInfo {
    #[serde(rename = "type")]
    pub consultant_type: ConsultantType,
    pub title: String,
    pub description: String,
}

impl From<ConsultantType> for CategoryInfo {
    fn from(kind: ConsultantType) -> Self {
        Self {
            consultant_type: kind,
            title: kind.title().to_string(),
            description: kind.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryInfo>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryStat {
    #[serde(rename = "type")]
    pub consultant_type: ConsultantType,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub success_bookings: i64,
    pub completed_bookings: i64,
    /// Sum of successful payments, in paise
    pub total_revenue: i64,
    pub monthly_bookings: i64,
    pub category_stats: Vec<CategoryStat>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    #[serde(rename = "bookingId", deserialize_with = "positive_id")]
    pub booking_id: BookingId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderResponse {
    #[schema(example = "order_9A33XWu170gUtm")]
    pub order_id: String,
    pub amount: i64,
    pub currency: Currency,
    pub key_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentKeyResponse {
    pub key_id: String,
}

/// Fields handed back by Razorpay Checkout after a successful payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(default)]
    pub razorpay_payment_id: String,
    #[serde(default)]
    pub razorpay_order_id: String,
    #[serde(default)]
    pub razorpay_signature: String,
    #[serde(
        rename = "bookingId",
        default,
        deserialize_with = "optional_positive_id"
    )]
    pub booking_id: Option<BookingId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub payment: Payment,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionResponse {
    pub payment_token: String,
    #[schema(example = "/api/payments/web-payment?token=eyJ...")]
    pub payment_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebPaymentQuery {
    pub token: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "CarrierHub Backend")]
    pub service: String,
    pub timestamp: DateTime<Utc>,
    #[schema(example = "development")]
    pub environment: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository inputs
// ─────────────────────────────────────────────────────────────────────────────

/// A validated student registration, password already hashed.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct StudentCredentials {
    pub student: Student,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub admin: Admin,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: StudentId,
    pub consultant_type: ConsultantType,
    pub details: String,
    pub amount: i64,
    pub currency: Currency,
    pub status: BookingStatus,
}

/// Listing filter; every field is optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub student_id: Option<StudentId>,
    pub status: Option<BookingStatus>,
    pub consultant_type: Option<ConsultantType>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            limit: i64::from(limit),
            offset: i64::from(page.saturating_sub(1)) * i64::from(limit),
        }
    }
}

/// A payment confirmed either by checkout verification or a webhook.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: BookingId,
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
    pub amount: i64,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub enum RecordOutcome {
    Recorded(Payment),
    /// A payment with this gateway id exists; no write happened
    AlreadyRecorded(Payment),
}

impl RecordOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            RecordOutcome::Recorded(p) | RecordOutcome::AlreadyRecorded(p) => p,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub event_id: Option<String>,
    pub event_type: String,
    pub payload: serde_json::Value,
}
