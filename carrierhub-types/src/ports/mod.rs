//! Port traits (interfaces for adapters).
//!
//! The application layer depends on these traits, not on concrete adapters.

mod gateway;
mod repository;

pub use gateway::{GatewayOrder, OrderRequest, PaymentGateway};
pub use repository::ConsultRepository;
