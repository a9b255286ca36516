//! # CarrierHub Types
//!
//! Domain types and port traits for the consultation-booking service.
//! This crate has no IO dependencies: only data structures, business rules
//! and the trait definitions adapters implement.
//!
//! ## Architecture
//!
//! - `domain/` - Students, admins, bookings, payments, webhook events
//! - `ports/` - Repository and payment gateway traits
//! - `dto/` - Request and response shapes for the HTTP boundary
//! - `error/` - Domain, repository, gateway and application errors

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

pub use domain::{
    Admin, AdminId, Booking, BookingDetail, BookingId, BookingStatus, ConsultantType, Currency,
    GatewayEvent, Money, Payment, PaymentEntity, PaymentId, PaymentStatus, PaymentSummary,
    RefundEntity, Student, StudentId, StudentSummary, WebhookEvent, WebhookStatus,
};
pub use dto::*;
pub use error::{AppError, DomainError, FieldError, GatewayError, RepoError};
pub use ports::{ConsultRepository, GatewayOrder, OrderRequest, PaymentGateway};
