//! JWT issuance and verification.
//!
//! Two kinds of token share one HS256 secret: access tokens naming a
//! student or admin, and short-lived payment session tokens that let the
//! hosted checkout page act for a single booking.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use carrierhub_types::{AppError, BookingId, StudentId};

pub const PAYMENT_SESSION_PURPOSE: &str = "payment_session";

/// Lifetime of a payment session token.
pub fn payment_session_ttl() -> Duration {
    Duration::minutes(15)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

/// Access token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Payment session claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSessionClaims {
    pub purpose: String,
    pub booking_id: BookingId,
    pub student_id: StudentId,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks tokens with a shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, role: Role, id: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        self.decode(token)
    }

    pub fn issue_payment_session(
        &self,
        booking_id: BookingId,
        student_id: StudentId,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = PaymentSessionClaims {
            purpose: PAYMENT_SESSION_PURPOSE.to_string(),
            booking_id,
            student_id,
            iat: now.timestamp(),
            exp: (now + payment_session_ttl()).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn verify_payment_session(&self, token: &str) -> Result<PaymentSessionClaims, AppError> {
        let claims: PaymentSessionClaims = self.decode(token)?;
        if claims.purpose != PAYMENT_SESSION_PURPOSE {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<T>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }
}

/// Parses lifetimes such as `7d`, `12h`, `30m`, `45s`, or a bare number of
/// seconds.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c)),
        _ => (raw, None),
    };
    let value: i64 = digits.parse().ok().filter(|v| *v > 0)?;

    match unit {
        None | Some('s') => Some(Duration::seconds(value)),
        Some('m') => Some(Duration::minutes(value)),
        Some('h') => Some(Duration::hours(value)),
        Some('d') => Some(Duration::days(value)),
        Some('w') => Some(Duration::weeks(value)),
        _ => None,
    }
}
