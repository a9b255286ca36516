//! # CarrierHub Hex
//!
//! Application service layer and HTTP adapter for the consultation service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (accounts, bookings, payments, webhooks)
//! - `tokens` - JWT issuance and verification
//! - `validation` - Request validation into domain values
//! - `export` - CSV rendering of booking listings
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: ConsultRepository` and
//! `G: PaymentGateway`, so adapters are injected at compile time.

pub mod export;
pub mod inbound;
pub mod openapi;
pub mod service;
pub mod tokens;
pub mod validation;

#[cfg(test)]
mod service_tests;

pub use service::{ConsultService, ServiceConfig};
