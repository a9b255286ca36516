//! Request validation.
//!
//! Every check collects [`FieldError`]s instead of stopping at the first
//! failure, so clients get all problems with a request in one response.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use carrierhub_types::{
    AdminBookingQuery, AppError, BookingFilter, BookingId, BookingStatus, ConsultantType,
    CreateBookingRequest, FieldError, LoginRequest, RegisterRequest, VerifyPaymentRequest,
};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$",
    )
    .expect("email pattern compiles")
});

static INDIAN_MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+91|91|0)?[6-9][0-9]{9}$").expect("phone pattern compiles")
});

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Collects field errors and turns them into `AppError::Validation`.
#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, AppError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self.0))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Accounts
// ─────────────────────────────────────────────────────────────────────────────

/// Trimmed and normalised registration fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

pub fn registration(req: &RegisterRequest) -> Result<Registration, AppError> {
    let mut errors = Errors::default();

    let name = req.name.trim().to_string();
    let name_len = name.chars().count();
    if !(2..=50).contains(&name_len) {
        errors.push("name", "Name must be between 2 and 50 characters");
    }

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        errors.push("email", "Please provide a valid email address");
    }

    let phone = req.phone.trim().to_string();
    if !is_indian_mobile(&phone) {
        errors.push("phone", "Please provide a valid Indian mobile number");
    }

    if req.password.chars().count() < 8 {
        errors.push("password", "Password must be at least 8 characters long");
    } else if !is_strong_password(&req.password) {
        errors.push(
            "password",
            "Password must contain at least one uppercase letter, one lowercase letter, and one number",
        );
    }

    errors.finish(Registration {
        name,
        email,
        phone,
        password: req.password.clone(),
    })
}

/// Returns the normalised email of a login attempt.
pub fn login(req: &LoginRequest) -> Result<String, AppError> {
    let mut errors = Errors::default();

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        errors.push("email", "Please provide a valid email address");
    }
    if req.password.is_empty() {
        errors.push("password", "Password is required");
    }

    errors.finish(email)
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL.is_match(email)
}

/// Ten digits starting 6-9, optionally prefixed with `+91`, `91` or `0`.
pub fn is_indian_mobile(phone: &str) -> bool {
    INDIAN_MOBILE.is_match(phone)
}

fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

// ─────────────────────────────────────────────────────────────────────────────
// Bookings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInput {
    pub consultant_type: ConsultantType,
    pub details: String,
    pub amount: i64,
}

pub fn booking(req: &CreateBookingRequest, min_amount: i64) -> Result<BookingInput, AppError> {
    let mut errors = Errors::default();

    let consultant_type = req.consultant_type.trim().parse::<ConsultantType>();
    if consultant_type.is_err() {
        errors.push("consultantType", "Invalid consultant type");
    }

    let details = req.details.trim().to_string();
    let details_len = details.chars().count();
    if !(10..=1000).contains(&details_len) {
        errors.push("details", "Details must be between 10 and 1000 characters");
    }

    if req.amount < min_amount {
        errors.push(
            "amount",
            &format!("Amount must be at least {min_amount} paise"),
        );
    }

    match consultant_type {
        Ok(consultant_type) => errors.finish(BookingInput {
            consultant_type,
            details,
            amount: req.amount,
        }),
        Err(_) => Err(AppError::Validation(errors.0)),
    }
}

/// Booking ids in paths must be positive integers.
pub fn booking_id(raw: &str) -> Result<BookingId, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(BookingId::new(id)),
        _ => Err(AppError::field("id", "Booking ID must be a positive integer")),
    }
}

pub fn booking_status(raw: &str) -> Result<BookingStatus, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::field("status", "Invalid booking status"))
}

/// `(page, limit)` with defaults 1 and 10.
pub fn pagination(page: Option<&str>, limit: Option<&str>) -> Result<(u32, u32), AppError> {
    let mut errors = Errors::default();

    let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
        None => 1,
        Some(raw) => match raw.parse::<u32>() {
            Ok(p) if p >= 1 => p,
            _ => {
                errors.push("page", "Page must be a positive integer");
                1
            }
        },
    };

    let limit = match limit.map(str::trim).filter(|l| !l.is_empty()) {
        None => DEFAULT_PAGE_LIMIT,
        Some(raw) => match raw.parse::<u32>() {
            Ok(l) if (1..=MAX_PAGE_LIMIT).contains(&l) => l,
            _ => {
                errors.push("limit", "Limit must be between 1 and 100");
                DEFAULT_PAGE_LIMIT
            }
        },
    };

    errors.finish((page, limit))
}

/// Builds the admin listing filter from raw query parameters.
pub fn admin_filter(query: &AdminBookingQuery) -> Result<BookingFilter, AppError> {
    let mut errors = Errors::default();
    let mut filter = BookingFilter::default();

    if let Some(raw) = non_empty(&query.status) {
        match raw.parse::<BookingStatus>() {
            Ok(status) => filter.status = Some(status),
            Err(_) => errors.push("status", "Invalid booking status"),
        }
    }

    if let Some(raw) = non_empty(&query.consultant_type) {
        match raw.parse::<ConsultantType>() {
            Ok(kind) => filter.consultant_type = Some(kind),
            Err(_) => errors.push("consultantType", "Invalid consultant type"),
        }
    }

    if let Some(raw) = non_empty(&query.date_from) {
        match parse_date(raw, false) {
            Some(from) => filter.created_from = Some(from),
            None => errors.push("dateFrom", "dateFrom must be a valid ISO 8601 date"),
        }
    }

    if let Some(raw) = non_empty(&query.date_to) {
        match parse_date(raw, true) {
            Some(to) => filter.created_to = Some(to),
            None => errors.push("dateTo", "dateTo must be a valid ISO 8601 date"),
        }
    }

    errors.finish(filter)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (read as UTC),
/// and bare dates. A bare date is the start of that day, or its last
/// instant when `end_of_day` is set.
pub fn parse_date(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?
    } else {
        NaiveTime::MIN
    };
    Some(date.and_time(time).and_utc())
}

// ─────────────────────────────────────────────────────────────────────────────
// Payments
// ─────────────────────────────────────────────────────────────────────────────

/// All four checkout fields are required.
pub fn verify_payment(req: &VerifyPaymentRequest) -> Result<BookingId, AppError> {
    let mut errors = Errors::default();

    if req.razorpay_payment_id.trim().is_empty() {
        errors.push("razorpay_payment_id", "Payment ID is required");
    }
    if req.razorpay_order_id.trim().is_empty() {
        errors.push("razorpay_order_id", "Order ID is required");
    }
    if req.razorpay_signature.trim().is_empty() {
        errors.push("razorpay_signature", "Signature is required");
    }
    let booking_id = match req.booking_id {
        Some(id) if id.get() > 0 => id,
        _ => {
            errors.push("bookingId", "Booking ID is required");
            BookingId::new(0)
        }
    };

    errors.finish(booking_id)
}
