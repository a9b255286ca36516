//! Row types shared by the SQLite and PostgreSQL adapters.
//!
//! Both backends store ids as 64-bit integers and timestamps as
//! `DateTime<Utc>`, so the same `FromRow` structs decode either one.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use carrierhub_types::{
    Admin, AdminId, Booking, BookingDetail, BookingId, DomainError, Payment, PaymentId,
    PaymentSummary, RepoError, Student, StudentId, StudentSummary, WebhookEvent,
};

/// Columns of a booking joined with its student and optional payment.
/// Append a `WHERE`/`ORDER BY` clause in the dialect of the caller.
pub const BOOKING_DETAIL_SELECT: &str = r#"SELECT
    b.id, b.student_id, b.consultant_type, b.details, b.amount, b.currency, b.status,
    b.razorpay_order_id, b.created_at, b.updated_at,
    s.name AS student_name, s.email AS student_email, s.phone AS student_phone,
    p.id AS payment_id, p.razorpay_payment_id AS payment_gateway_id,
    p.amount AS payment_amount, p.currency AS payment_currency,
    p.status AS payment_status, p.created_at AS payment_created_at
FROM bookings b
JOIN students s ON s.id = b.student_id
LEFT JOIN payments p ON p.booking_id = b.id"#;

pub const BOOKING_COLUMNS: &str = "id, student_id, consultant_type, details, amount, currency, status, razorpay_order_id, created_at, updated_at";

pub const PAYMENT_COLUMNS: &str = "id, booking_id, razorpay_payment_id, razorpay_order_id, razorpay_signature, amount, currency, status, created_at";

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(FromRow)]
pub struct DbStudent {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub struct DbAdmin {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub struct DbBooking {
    pub id: i64,
    pub student_id: i64,
    pub consultant_type: String,
    pub details: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub razorpay_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row produced by `BOOKING_DETAIL_SELECT`.
#[derive(FromRow)]
pub struct DbBookingDetail {
    #[sqlx(flatten)]
    pub booking: DbBooking,
    pub student_name: String,
    pub student_email: String,
    pub student_phone: String,
    pub payment_id: Option<i64>,
    pub payment_gateway_id: Option<String>,
    pub payment_amount: Option<i64>,
    pub payment_currency: Option<String>,
    pub payment_status: Option<String>,
    pub payment_created_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
pub struct DbPayment {
    pub id: i64,
    pub booking_id: i64,
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Webhook log row. The payload is always selected as text.
#[derive(FromRow)]
pub struct DbWebhookEvent {
    pub id: i64,
    pub event_id: Option<String>,
    pub event_type: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
pub struct DbCategoryCount {
    pub consultant_type: String,
    pub count: i64,
}

#[derive(FromRow)]
pub struct DbBookingCounts {
    pub total: i64,
    pub pending: i64,
    pub success: i64,
    pub completed: i64,
    pub monthly: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Parses a stored enum column; unknown text means the row is corrupt.
pub fn parse_column<T>(s: &str) -> Result<T, RepoError>
where
    T: FromStr<Err = DomainError>,
{
    s.parse()
        .map_err(|e: DomainError| RepoError::Database(e.to_string()))
}

/// Maps a driver error, turning unique-constraint violations into `Conflict`.
pub fn map_write_err(e: sqlx::Error, conflict: &str) -> RepoError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return RepoError::Conflict(conflict.to_string());
        }
    }
    RepoError::Database(e.to_string())
}

pub fn db_err(e: sqlx::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

impl DbStudent {
    pub fn into_domain(self) -> Student {
        Student {
            id: StudentId::new(self.id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            created_at: self.created_at,
        }
    }
}

impl DbAdmin {
    pub fn into_domain(self) -> Admin {
        Admin {
            id: AdminId::new(self.id),
            name: self.name,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

impl DbBooking {
    pub fn into_domain(self) -> Result<Booking, RepoError> {
        Ok(Booking {
            id: BookingId::new(self.id),
            student_id: StudentId::new(self.student_id),
            consultant_type: parse_column(&self.consultant_type)?,
            details: self.details,
            amount: self.amount,
            currency: parse_column(&self.currency)?,
            status: parse_column(&self.status)?,
            razorpay_order_id: self.razorpay_order_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl DbBookingDetail {
    pub fn into_domain(self) -> Result<BookingDetail, RepoError> {
        let booking = self.booking.into_domain()?;

        let payment = match (
            self.payment_id,
            self.payment_gateway_id,
            self.payment_amount,
            self.payment_currency,
            self.payment_status,
            self.payment_created_at,
        ) {
            (Some(id), Some(gateway_id), Some(amount), Some(currency), Some(status), Some(at)) => {
                Some(PaymentSummary {
                    id: PaymentId::new(id),
                    razorpay_payment_id: gateway_id,
                    amount,
                    currency: parse_column(&currency)?,
                    status: parse_column(&status)?,
                    created_at: at,
                })
            }
            _ => None,
        };

        Ok(BookingDetail {
            student: StudentSummary {
                id: booking.student_id,
                name: self.student_name,
                email: self.student_email,
                phone: self.student_phone,
            },
            booking,
            payment,
        })
    }
}

impl DbPayment {
    pub fn into_domain(self) -> Result<Payment, RepoError> {
        Ok(Payment {
            id: PaymentId::new(self.id),
            booking_id: BookingId::new(self.booking_id),
            razorpay_payment_id: self.razorpay_payment_id,
            razorpay_order_id: self.razorpay_order_id,
            razorpay_signature: self.razorpay_signature,
            amount: self.amount,
            currency: parse_column(&self.currency)?,
            status: parse_column(&self.status)?,
            created_at: self.created_at,
        })
    }
}

impl DbWebhookEvent {
    pub fn into_domain(self) -> Result<WebhookEvent, RepoError> {
        let payload =
            serde_json::from_str(&self.payload).map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(WebhookEvent {
            id: self.id,
            event_id: self.event_id,
            event_type: self.event_type,
            payload,
            status: parse_column(&self.status)?,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at: self.created_at,
            processed_at: self.processed_at,
        })
    }
}

/// Category rows come back ordered by count; unknown categories are skipped.
pub fn category_stats(rows: Vec<DbCategoryCount>) -> Vec<carrierhub_types::CategoryStat> {
    rows.into_iter()
        .filter_map(|row| {
            row.consultant_type
                .parse()
                .ok()
                .map(|consultant_type| carrierhub_types::CategoryStat {
                    consultant_type,
                    count: row.count,
                })
        })
        .collect()
}
