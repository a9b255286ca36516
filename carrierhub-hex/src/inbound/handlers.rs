//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, State, rejection::JsonRejection,
    },
    http::{HeaderMap, StatusCode, Uri, header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::de::DeserializeOwned;

use carrierhub_types::{
    Admin, AdminBookingQuery, ApiResponse, AppError, BookingResponse, CategoriesResponse,
    ConsultRepository, CreateBookingRequest, CreatePaymentRequest, ErrorResponse,
    HealthResponse, LoginRequest, PageQuery, PaymentGateway, PaymentKeyResponse,
    PaymentResponse, ProfileResponse, RegisterRequest, Student, UpdateBookingStatusRequest,
    VerifyPaymentRequest,
};

use crate::ConsultService;

pub const SERVICE_NAME: &str = "CarrierHub Backend";
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";
pub const EVENT_ID_HEADER: &str = "x-razorpay-event-id";

/// Application state shared across handlers.
pub struct AppState<R: ConsultRepository, G: PaymentGateway> {
    pub service: ConsultService<R, G>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

pub fn status_of(err: &AppError) -> StatusCode {
    match err {
        AppError::Validation(_)
        | AppError::BadRequest(_)
        | AppError::InvalidBookingStatus(_)
        | AppError::InvalidSignature(_)
        | AppError::InvalidPayload(_)
        | AppError::PaymentMismatch(_)
        | AppError::Duplicate(_) => StatusCode::BAD_REQUEST,
        AppError::NoToken
        | AppError::InvalidToken
        | AppError::TokenExpired
        | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
        AppError::Webhook(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_of(&self.0);

        let message = match &self.0 {
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let details = match &self.0 {
            AppError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            message,
            error: self.0.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections use the error envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    AppError::field("body", &rejection.body_text()).into()
}

/// Query string extractor whose rejections use the error envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(AppError::field("query", &rejection.body_text()).into()),
        }
    }
}

type Shared<R, G> = State<Arc<AppState<R, G>>>;

// ─────────────────────────────────────────────────────────────────────────────
// Health and metadata
// ─────────────────────────────────────────────────────────────────────────────

pub async fn health<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(
        format!("{SERVICE_NAME} is running"),
        HealthResponse {
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now(),
            environment: state.service.config().environment.clone(),
        },
    ))
}

pub async fn categories<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(
        "Categories retrieved successfully",
        CategoriesResponse {
            categories: state.service.categories(),
        },
    ))
}

pub async fn not_found(uri: Uri) -> ApiError {
    AppError::NotFound(format!("Route {} not found", uri.path())).into()
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all)]
pub async fn register<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.service.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Student registered successfully", auth)),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn login<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.service.login(req).await?;
    Ok(Json(ApiResponse::ok("Login successful", auth)))
}

#[tracing::instrument(skip_all)]
pub async fn admin_login<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.service.admin_login(req).await?;
    Ok(Json(ApiResponse::ok("Admin login successful", auth)))
}

#[tracing::instrument(skip_all, fields(student_id = %student.id))]
pub async fn me<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
) -> Result<impl IntoResponse, ApiError> {
    let student = state.service.me(&student).await?;
    Ok(Json(ApiResponse::ok(
        "Profile retrieved successfully",
        ProfileResponse { student },
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Student bookings
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all, fields(student_id = %student.id))]
pub async fn create_booking<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
    ApiJson(req): ApiJson<CreateBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.service.create_booking(&student, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            "Booking created successfully",
            BookingResponse { booking },
        )),
    ))
}

#[tracing::instrument(skip_all, fields(student_id = %student.id))]
pub async fn my_bookings<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state.service.list_my_bookings(&student, query).await?;
    Ok(Json(ApiResponse::ok("Bookings retrieved successfully", list)))
}

#[tracing::instrument(skip_all, fields(student_id = %student.id, booking_id = %id))]
pub async fn get_booking<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.service.get_my_booking(&student, &id).await?;
    Ok(Json(ApiResponse::ok(
        "Booking retrieved successfully",
        BookingResponse { booking },
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin
// ─────────────────────────────────────────────────────────────────────────────

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn admin_bookings<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(admin): Extension<Admin>,
    ApiQuery(query): ApiQuery<AdminBookingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let list = state.service.admin_list_bookings(query).await?;
    Ok(Json(ApiResponse::ok("Bookings retrieved successfully", list)))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id, booking_id = %id))]
pub async fn update_booking_status<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(admin): Extension<Admin>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateBookingStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.service.admin_update_status(&id, req).await?;
    Ok(Json(ApiResponse::ok(
        "Booking status updated successfully",
        BookingResponse { booking },
    )))
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn export_bookings<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(admin): Extension<Admin>,
    ApiQuery(query): ApiQuery<AdminBookingQuery>,
) -> Result<Response, ApiError> {
    let export = state.service.export_bookings(query).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}

#[tracing::instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn dashboard_stats<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(admin): Extension<Admin>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.service.dashboard_stats().await?;
    Ok(Json(ApiResponse::ok(
        "Dashboard stats retrieved successfully",
        stats,
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

pub async fn payment_key<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
) -> impl IntoResponse {
    Json(ApiResponse::ok(
        "Payment key retrieved successfully",
        PaymentKeyResponse {
            key_id: state.service.key_id().to_string(),
        },
    ))
}

#[tracing::instrument(skip_all, fields(student_id = %student.id, booking_id = %req.booking_id))]
pub async fn create_payment<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .service
        .create_payment_order(&student, req.booking_id)
        .await?;
    Ok(Json(ApiResponse::ok(outcome.message(), outcome.order)))
}

#[tracing::instrument(skip_all, fields(student_id = %student.id))]
pub async fn verify_payment<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
    ApiJson(req): ApiJson<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.service.verify_payment(&student, req).await?;
    Ok(Json(ApiResponse::ok(
        outcome.message(),
        PaymentResponse {
            payment: outcome.payment,
        },
    )))
}

#[tracing::instrument(skip_all, fields(student_id = %student.id, booking_id = %req.booking_id))]
pub async fn create_payment_session<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    Extension(student): Extension<Student>,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .service
        .create_payment_session(&student, req.booking_id)
        .await?;
    Ok(Json(ApiResponse::ok(
        "Payment session created successfully",
        session,
    )))
}

/// Gateway callback. Takes the raw body since the signature covers its
/// exact bytes.
pub async fn webhook<R: ConsultRepository, G: PaymentGateway>(
    State(state): Shared<R, G>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    let event_id = headers.get(EVENT_ID_HEADER).and_then(|v| v.to_str().ok());

    let ack = state
        .service
        .handle_webhook(&body, signature, event_id)
        .await?;
    Ok(Json(ApiResponse::ack(ack.success, ack.message)))
}
