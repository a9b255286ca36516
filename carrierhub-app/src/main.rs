//! # CarrierHub Server
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize tracing and telemetry
//! - Initialize the repository and payment gateway adapters
//! - Create the consultation service
//! - Start the HTTP server

use carrierhub_app::{config::Config, telemetry};
use carrierhub_hex::{ConsultService, inbound::HttpServer};
use carrierhub_repo::build_repo;
use razorpay_gateway::Gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let telemetry = telemetry::init(config.log_format, config.otlp_endpoint.as_deref())?;

    tracing::info!(
        environment = %config.environment,
        "Starting CarrierHub server on {}",
        config.addr()
    );

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;
    tracing::info!(backend = repo.backend(), "Repository ready");

    let gateway = Gateway::from_config(config.razorpay.clone())?;
    tracing::info!(mode = gateway.mode(), "Payment gateway ready");
    if let Gateway::Offline(_) = gateway {
        tracing::warn!("RAZORPAY_KEY_ID not set, payment orders are created offline");
    }
    if config.rate_limit.trust_proxy {
        tracing::info!("Rate limiting clients by forwarded-for address");
    }
    if config.razorpay.webhook_secret.is_none() {
        tracing::warn!("RAZORPAY_WEBHOOK_SECRET not set, webhooks will be rejected");
    }

    let service = ConsultService::new(repo, gateway, config.service_config());

    // Create and run the HTTP server
    let server = HttpServer::new(service, config.rate_limit);
    server.run(&config.addr()).await?;

    // Ensure traces and metrics are flushed before exit
    telemetry.shutdown();
    Ok(())
}
