//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use carrierhub_types::domain::{
    Admin, Booking, BookingDetail, BookingId, BookingStatus, ConsultantType, Currency, Payment,
    PaymentStatus, PaymentSummary, Student, StudentSummary,
};
use carrierhub_types::dto::{
    AdminAuthResponse, BookingListResponse, BookingResponse, CategoriesResponse, CategoryInfo,
    CategoryStat, CreateBookingRequest, CreatePaymentRequest, DashboardStats, ErrorResponse,
    HealthResponse, LoginRequest, Pagination, PaymentKeyResponse, PaymentOrderResponse,
    PaymentResponse, PaymentSessionResponse, ProfileResponse, RegisterRequest,
    StudentAuthResponse, UpdateBookingStatusRequest, VerifyPaymentRequest,
};
use carrierhub_types::error::FieldError;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation.
// Success bodies are wrapped in `{ success, message, data }`; the schemas
// below describe `data`.

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
async fn health() {}

/// Consultant category catalogue
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "health",
    responses(
        (status = 200, description = "All consultant categories", body = CategoriesResponse)
    )
)]
async fn categories() {}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Register a student account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Student registered", body = StudentAuthResponse),
        (status = 400, description = "Validation failed or email already registered", body = ErrorResponse),
        (status = 429, description = "Too many authentication attempts")
    )
)]
async fn register() {}

/// Student login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = StudentAuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 429, description = "Too many authentication attempts")
    )
)]
async fn login() {}

/// Current student profile
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorResponse)
    )
)]
async fn me() {}

/// Admin login
#[utoipa::path(
    post,
    path = "/api/auth/admin/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AdminAuthResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    )
)]
async fn admin_login() {}

// ─────────────────────────────────────────────────────────────────────────────
// Bookings
// ─────────────────────────────────────────────────────────────────────────────

/// Create a booking
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "bookings",
    request_body = CreateBookingRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
async fn create_booking() {}

/// List the current student's bookings, newest first
#[utoipa::path(
    get,
    path = "/api/bookings/me",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size 1-100, default 10")
    ),
    responses(
        (status = 200, description = "Bookings page", body = BookingListResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
async fn my_bookings() {}

/// Get one of the current student's bookings
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    tag = "bookings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = BookingResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    )
)]
async fn get_booking() {}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

/// List all bookings with filters
#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<BookingStatus>, Query, description = "Filter by status"),
        ("consultantType" = Option<ConsultantType>, Query, description = "Filter by category"),
        ("dateFrom" = Option<String>, Query, description = "ISO 8601 date or timestamp"),
        ("dateTo" = Option<String>, Query, description = "ISO 8601 date or timestamp"),
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size 1-100, default 10")
    ),
    responses(
        (status = 200, description = "Bookings page", body = BookingListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
async fn admin_bookings() {}

/// Export filtered bookings as CSV
#[utoipa::path(
    get,
    path = "/api/admin/bookings/export",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv", body = String)
    )
)]
async fn export_bookings() {}

/// Change a booking's status
#[utoipa::path(
    patch,
    path = "/api/admin/bookings/{id}/status",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Booking ID")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Booking updated", body = BookingResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse)
    )
)]
async fn update_booking_status() {}

/// Dashboard totals
#[utoipa::path(
    get,
    path = "/api/admin/dashboard/stats",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats)
    )
)]
async fn dashboard_stats() {}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

/// Public checkout key
#[utoipa::path(
    get,
    path = "/api/payments/key",
    tag = "payments",
    responses((status = 200, description = "Gateway key id", body = PaymentKeyResponse))
)]
async fn payment_key() {}

/// Create or reuse a gateway order for a booking
#[utoipa::path(
    post,
    path = "/api/payments/create",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Order ready for checkout", body = PaymentOrderResponse),
        (status = 400, description = "Booking is not payable", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 502, description = "Gateway error", body = ErrorResponse)
    )
)]
async fn create_payment() {}

/// Verify a checkout response and record the payment
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = PaymentResponse),
        (status = 400, description = "Invalid signature or mismatched payment", body = ErrorResponse)
    )
)]
async fn verify_payment() {}

/// Start a hosted checkout session
#[utoipa::path(
    post,
    path = "/api/payments/create-payment-session",
    tag = "payments",
    security(("bearer_auth" = [])),
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Session token and page URL", body = PaymentSessionResponse)
    )
)]
async fn create_payment_session() {}

/// Hosted checkout page
#[utoipa::path(
    get,
    path = "/api/payments/web-payment",
    tag = "payments",
    params(("token" = String, Query, description = "Payment session token")),
    responses(
        (status = 200, description = "Checkout page", content_type = "text/html", body = String),
        (status = 400, description = "Missing, invalid or expired session"),
        (status = 404, description = "Booking not found")
    )
)]
async fn web_payment() {}

/// Gateway webhook receiver
#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    tag = "payments",
    params(
        ("x-razorpay-signature" = String, Header, description = "HMAC-SHA256 of the raw body"),
        ("x-razorpay-event-id" = Option<String>, Header, description = "Delivery id used for deduplication")
    ),
    request_body(content = serde_json::Value, content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Invalid signature or payload", body = ErrorResponse),
        (status = 500, description = "Processing failed; the gateway should retry", body = ErrorResponse)
    )
)]
async fn webhook() {}

/// OpenAPI documentation for the CarrierHub API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "CarrierHub API",
        version = "1.0.0",
        description = "Career consultation booking with Razorpay payments.\n\n## Authentication\n\nStudent and admin endpoints take the JWT returned by the login endpoints:\n\n```\nAuthorization: Bearer <token>\n```",
    ),
    paths(
        health,
        categories,
        register,
        login,
        me,
        admin_login,
        create_booking,
        my_bookings,
        get_booking,
        admin_bookings,
        export_bookings,
        update_booking_status,
        dashboard_stats,
        payment_key,
        create_payment,
        verify_payment,
        create_payment_session,
        web_payment,
        webhook,
    ),
    components(
        schemas(
            Student,
            StudentSummary,
            Admin,
            Booking,
            BookingDetail,
            BookingId,
            BookingStatus,
            ConsultantType,
            Currency,
            Payment,
            PaymentStatus,
            PaymentSummary,
            RegisterRequest,
            LoginRequest,
            StudentAuthResponse,
            AdminAuthResponse,
            ProfileResponse,
            CreateBookingRequest,
            UpdateBookingStatusRequest,
            BookingResponse,
            BookingListResponse,
            Pagination,
            CategoryInfo,
            CategoriesResponse,
            CategoryStat,
            DashboardStats,
            CreatePaymentRequest,
            PaymentOrderResponse,
            PaymentKeyResponse,
            VerifyPaymentRequest,
            PaymentResponse,
            PaymentSessionResponse,
            HealthResponse,
            ErrorResponse,
            FieldError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health and catalogue endpoints"),
        (name = "auth", description = "Student and admin authentication"),
        (name = "bookings", description = "Student bookings"),
        (name = "admin", description = "Admin booking management and reporting"),
        (name = "payments", description = "Razorpay checkout, sessions and webhooks"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
