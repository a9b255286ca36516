//! Consultation Application Service
//!
//! Orchestrates domain operations through the repository and payment
//! gateway ports. Contains no HTTP or SQL: handlers call in with decoded
//! requests, adapters are injected at compile time.

use chrono::Duration;

use carrierhub_types::{ConsultRepository, PaymentGateway};

use crate::tokens::TokenIssuer;

mod accounts;
mod bookings;
mod payments;
mod webhooks;

pub use bookings::CsvExport;
pub use payments::{CheckoutContext, OrderOutcome, VerifyOutcome};
pub use webhooks::WebhookAck;

/// Runtime knobs of the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    /// Smallest bookable amount in paise.
    pub min_booking_amount: i64,
    pub bcrypt_cost: u32,
    /// Reported by the health endpoint.
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl: Duration::days(7),
            min_booking_amount: 1000,
            bcrypt_cost: carrierhub_repo::security::PASSWORD_HASH_COST,
            environment: "development".to_string(),
        }
    }
}

/// Application service for accounts, bookings and payments.
///
/// Generic over `R: ConsultRepository` and `G: PaymentGateway`, so tests
/// run it against an in-memory repository and the offline gateway.
pub struct ConsultService<R: ConsultRepository, G: PaymentGateway> {
    repo: R,
    gateway: G,
    tokens: TokenIssuer,
    config: ServiceConfig,
}

impl<R: ConsultRepository, G: PaymentGateway> ConsultService<R, G> {
    pub fn new(repo: R, gateway: G, config: ServiceConfig) -> Self {
        let tokens = TokenIssuer::new(&config.jwt_secret, config.jwt_ttl);
        Self {
            repo,
            gateway,
            tokens,
            config,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
