//! Repository port trait.
//!
//! The primary port of the service. The SQLite and PostgreSQL adapters
//! implement it, and so does the in-memory mock used by service tests.

use chrono::{DateTime, Utc};

use crate::domain::{
    Admin, AdminId, Booking, BookingDetail, BookingId, BookingStatus, Payment, Student,
    StudentId, WebhookEvent, WebhookStatus,
};
use crate::dto::{
    AdminCredentials, BookingFilter, DashboardStats, NewAdmin, NewBooking, NewPayment,
    NewStudent, NewWebhookEvent, PageRequest, RecordOutcome, StudentCredentials,
};
use crate::error::RepoError;

/// Storage operations for accounts, bookings, payments and the webhook log.
///
/// Operations that touch both a payment and its booking MUST be atomic.
#[async_trait::async_trait]
pub trait ConsultRepository: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a student. A duplicate email is `RepoError::Conflict`.
    async fn create_student(&self, req: NewStudent) -> Result<Student, RepoError>;

    async fn find_student_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StudentCredentials>, RepoError>;

    async fn get_student(&self, id: StudentId) -> Result<Option<Student>, RepoError>;

    /// Creates an admin. A duplicate email is `RepoError::Conflict`.
    async fn create_admin(&self, req: NewAdmin) -> Result<Admin, RepoError>;

    async fn find_admin_credentials(
        &self,
        email: &str,
    ) -> Result<Option<AdminCredentials>, RepoError>;

    async fn get_admin(&self, id: AdminId) -> Result<Option<Admin>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────────

    async fn create_booking(&self, req: NewBooking) -> Result<BookingDetail, RepoError>;

    async fn get_booking(&self, id: BookingId) -> Result<Option<BookingDetail>, RepoError>;

    /// Same as `get_booking` but only returns bookings owned by `student_id`.
    async fn get_booking_for_student(
        &self,
        id: BookingId,
        student_id: StudentId,
    ) -> Result<Option<BookingDetail>, RepoError>;

    /// Newest first. Returns the requested page and the unpaged total.
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        page: Option<PageRequest>,
    ) -> Result<(Vec<BookingDetail>, i64), RepoError>;

    /// Returns `None` when the booking does not exist.
    async fn update_booking_status(
        &self,
        id: BookingId,
        status: BookingStatus,
    ) -> Result<Option<BookingDetail>, RepoError>;

    async fn set_booking_order_id(&self, id: BookingId, order_id: &str)
    -> Result<(), RepoError>;

    async fn find_booking_by_order_id(&self, order_id: &str)
    -> Result<Option<Booking>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Payments (MUST be atomic)
    // ─────────────────────────────────────────────────────────────────────────────

    async fn find_payment_by_gateway_id(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Payment>, RepoError>;

    /// Inserts a SUCCESS payment and moves its booking to SUCCESS.
    ///
    /// An existing payment with the same gateway id is returned untouched.
    async fn record_payment(&self, req: NewPayment) -> Result<RecordOutcome, RepoError>;

    /// Marks the payment REFUNDED and its booking FAILED.
    /// Returns `None` when no payment has that gateway id.
    async fn mark_payment_refunded(
        &self,
        razorpay_payment_id: &str,
    ) -> Result<Option<Payment>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Reporting
    // ─────────────────────────────────────────────────────────────────────────────

    /// `monthly_bookings` counts bookings created at or after `since`.
    async fn dashboard_stats(&self, since: DateTime<Utc>) -> Result<DashboardStats, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Webhook log
    // ─────────────────────────────────────────────────────────────────────────────

    /// Logs a delivery as PROCESSING. A first delivery gets a new row with
    /// `attempts = 1`; a redelivery of a known `event_id` reuses the latest row
    /// for it, clears its error and increments `attempts`.
    async fn record_webhook_event(&self, req: NewWebhookEvent)
    -> Result<WebhookEvent, RepoError>;

    /// Most recent delivery carrying this gateway event id.
    async fn find_webhook_event(&self, event_id: &str) -> Result<Option<WebhookEvent>, RepoError>;

    /// Sets the status and error; COMPLETED and FAILED also stamp `processed_at`.
    async fn update_webhook_status(
        &self,
        id: i64,
        status: WebhookStatus,
        last_error: Option<&str>,
    ) -> Result<(), RepoError>;
}
