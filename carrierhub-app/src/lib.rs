//! # CarrierHub Application
//!
//! Wiring shared by the `carrierhub-server` and `carrierhub-seed` binaries:
//!
//! - `config` - Environment configuration
//! - `telemetry` - Tracing subscriber and OpenTelemetry exporters
//! - `seed` - Idempotent demo data for local environments

pub mod config;
pub mod seed;
pub mod telemetry;
