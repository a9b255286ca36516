//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
pub mod handlers;
pub mod rate_limit;
mod server;
mod web_payment;

pub use rate_limit::RateLimitConfig;
pub use server::HttpServer;
