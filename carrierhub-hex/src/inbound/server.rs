//! HTTP Server configuration and startup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

use carrierhub_types::{ConsultRepository, PaymentGateway};

use super::auth::{require_admin, require_student};
use super::handlers::{self, AppState, SIGNATURE_HEADER};
use super::rate_limit::{RateLimitConfig, RateLimiterState, rate_limit_middleware};
use super::web_payment::web_payment;
use crate::ConsultService;
use crate::openapi::ApiDoc;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// HTTP Server for the CarrierHub API.
pub struct HttpServer<R: ConsultRepository, G: PaymentGateway> {
    state: Arc<AppState<R, G>>,
    general_limiter: Arc<RateLimiterState>,
    auth_limiter: Arc<RateLimiterState>,
}

impl<R: ConsultRepository, G: PaymentGateway> HttpServer<R, G> {
    pub fn new(service: ConsultService<R, G>, limits: RateLimitConfig) -> Self {
        Self {
            state: Arc::new(AppState { service }),
            general_limiter: Arc::new(RateLimiterState::general(&limits)),
            auth_limiter: Arc::new(RateLimiterState::auth(&limits)),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        // Build HTTP metrics layer (uses globally set MeterProvider)
        let metrics = axum_otel_metrics::HttpMetricsLayerBuilder::new().build();

        let auth_routes = Router::new()
            .route("/api/auth/register", post(handlers::register::<R, G>))
            .route("/api/auth/login", post(handlers::login::<R, G>))
            .route("/api/auth/admin/login", post(handlers::admin_login::<R, G>))
            .route("/api/admin/login", post(handlers::admin_login::<R, G>))
            .route_layer(middleware::from_fn_with_state(
                self.auth_limiter.clone(),
                rate_limit_middleware,
            ));

        let student_routes = Router::new()
            .route("/api/auth/me", get(handlers::me::<R, G>))
            .route("/api/bookings", post(handlers::create_booking::<R, G>))
            .route("/api/bookings/me", get(handlers::my_bookings::<R, G>))
            .route("/api/bookings/{id}", get(handlers::get_booking::<R, G>))
            .route("/api/payments/create", post(handlers::create_payment::<R, G>))
            .route("/api/payments/verify", post(handlers::verify_payment::<R, G>))
            .route(
                "/api/payments/create-payment-session",
                post(handlers::create_payment_session::<R, G>),
            )
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_student::<R, G>,
            ));

        let admin_routes = Router::new()
            .route("/api/admin/bookings", get(handlers::admin_bookings::<R, G>))
            .route(
                "/api/admin/bookings/export",
                get(handlers::export_bookings::<R, G>),
            )
            .route(
                "/api/admin/bookings/{id}/status",
                patch(handlers::update_booking_status::<R, G>),
            )
            .route(
                "/api/admin/dashboard/stats",
                get(handlers::dashboard_stats::<R, G>),
            )
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_admin::<R, G>,
            ));

        let public_routes = Router::new()
            .route("/health", get(handlers::health::<R, G>))
            .route("/api/docs", get(|| async { Json(ApiDoc::openapi()) }))
            .route("/api/categories", get(handlers::categories::<R, G>))
            .route("/api/payments/key", get(handlers::payment_key::<R, G>))
            .route("/api/payments/web-payment", get(web_payment::<R, G>))
            .route("/api/payments/webhook", post(handlers::webhook::<R, G>));

        Router::new()
            .merge(public_routes)
            .merge(auth_routes)
            .merge(student_routes)
            .merge(admin_routes)
            .fallback(handlers::not_found)
            .method_not_allowed_fallback(handlers::not_found)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(metrics)
            .layer(middleware::from_fn_with_state(
                self.general_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(security_headers(header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
            .layer(security_headers(header::X_FRAME_OPTIONS, "DENY"))
            .layer(security_headers(header::REFERRER_POLICY, "no-referrer"))
            .layer(cors())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

fn security_headers(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(SIGNATURE_HEADER),
            HeaderName::from_static("x-requested-with"),
        ])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
