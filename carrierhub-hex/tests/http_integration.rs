//! End-to-end tests of the HTTP surface against an in-memory SQLite store
//! and the offline gateway.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use carrierhub_hex::inbound::{HttpServer, RateLimitConfig};
use carrierhub_hex::{ConsultService, ServiceConfig};
use carrierhub_repo::{SqliteRepo, security};
use carrierhub_types::{ConsultRepository, NewAdmin};
use razorpay_gateway::{OfflineGateway, signature};

const KEY_SECRET: &str = "key_secret";
const WEBHOOK_SECRET: &str = "whsec_test";

async fn app() -> Router {
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    repo.create_admin(NewAdmin {
        name: "System Admin".to_string(),
        email: "admin@carrierhub.com".to_string(),
        password_hash: security::hash_password("Admin@123456", 4).unwrap(),
    })
    .await
    .unwrap();

    let gateway = OfflineGateway::new("rzp_test_key", KEY_SECRET, Some(WEBHOOK_SECRET.into()));
    let service = ConsultService::new(
        repo,
        gateway,
        ServiceConfig {
            jwt_secret: "integration-secret".to_string(),
            bcrypt_cost: 4,
            ..Default::default()
        },
    );
    HttpServer::new(service, RateLimitConfig::default()).router()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Asha Rao",
                "email": email,
                "phone": "+919876543210",
                "password": "Student@123456"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn book(app: &Router, token: &str, amount: i64) -> i64 {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/bookings",
            Some(token),
            Some(json!({
                "consultantType": "STUDY_ABROAD",
                "details": "Shortlisting universities for a masters in Germany",
                "amount": amount
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["booking"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["service"], "CarrierHub Backend");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/api/nope", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Route /api/nope not found");
}

#[tokio::test]
async fn test_wrong_method_is_json_404() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/api/auth/login", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Route /api/auth/login not found");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/api/docs", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "CarrierHub API");
    assert!(body["paths"].get("/health").is_some());
}

#[tokio::test]
async fn test_registration_errors() {
    let app = app().await;
    register(&app, "asha@example.com").await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "A",
                "email": "not-an-email",
                "phone": "12345",
                "password": "short"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["details"].as_array().unwrap().len(), 4);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Asha Again",
                "email": "ASHA@example.com",
                "phone": "9876543210",
                "password": "Student@123456"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn test_malformed_json_is_validation_error() {
    let app = app().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_repeated_query_parameter_is_validation_error() {
    let app = app().await;
    let token = register(&app, "asha@example.com").await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/bookings/me?page=1&page=2", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/payments/web-payment?token=a&token=b", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&html).contains("Invalid Payment Link"));
}

#[tokio::test]
async fn test_booking_id_accepts_numeric_string() {
    let app = app().await;
    let token = register(&app, "asha@example.com").await;
    let booking_id = book(&app, &token, 1500).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/payments/create",
            Some(&token),
            Some(json!({ "bookingId": booking_id.to_string() })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["amount"], 1500);

    for bad in [json!(0), json!(-3), json!("abc")] {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/payments/create",
                Some(&token),
                Some(json!({ "bookingId": bad })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_protected_routes_require_matching_role() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/api/auth/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NO_TOKEN");

    let (status, body) = send(&app, request(Method::GET, "/api/auth/me", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_TOKEN");

    let student = register(&app, "asha@example.com").await;
    let (status, body) = send(&app, request(Method::GET, "/api/auth/me", Some(&student), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["student"]["email"], "asha@example.com");
    assert_eq!(body["data"]["student"]["phone"], "+919876543210");

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/admin/dashboard/stats", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_checkout_flow() {
    let app = app().await;
    let token = register(&app, "asha@example.com").await;
    let booking_id = book(&app, &token, 200000).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/payments/create",
            Some(&token),
            Some(json!({ "bookingId": booking_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Payment order created successfully");
    assert_eq!(body["data"]["amount"], 200000);
    assert_eq!(body["data"]["keyId"], "rzp_test_key");
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();

    let verify = json!({
        "razorpay_payment_id": "pay_test_1",
        "razorpay_order_id": order_id,
        "razorpay_signature": signature::payment_signature(&order_id, "pay_test_1", KEY_SECRET),
        "bookingId": booking_id
    });
    let (status, body) = send(
        &app,
        request(Method::POST, "/api/payments/verify", Some(&token), Some(verify.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Payment verified successfully");

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/payments/verify", Some(&token), Some(verify)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment already verified");

    let (status, body) = send(
        &app,
        request(Method::GET, &format!("/api/bookings/{booking_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking"]["status"], "SUCCESS");
    assert_eq!(body["data"]["booking"]["payment"]["razorpayPaymentId"], "pay_test_1");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/payments/create",
            Some(&token),
            Some(json!({ "bookingId": booking_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_BOOKING_STATUS");
}

#[tokio::test]
async fn test_bookings_are_private() {
    let app = app().await;
    let asha = register(&app, "asha@example.com").await;
    let ravi = register(&app, "ravi@example.com").await;
    let booking_id = book(&app, &asha, 1500).await;

    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/bookings/{booking_id}"), Some(&ravi), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, request(Method::GET, "/api/bookings/me", Some(&ravi), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_admin_console() {
    let app = app().await;
    let student = register(&app, "asha@example.com").await;
    let booking_id = book(&app, &student, 150000).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/admin/login",
            None,
            Some(json!({ "email": "admin@carrierhub.com", "password": "Admin@123456" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let admin = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/api/admin/bookings/{booking_id}/status"),
            Some(&admin),
            Some(json!({ "status": "COMPLETED" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["booking"]["status"], "COMPLETED");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/admin/bookings?status=PAID", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "status");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/admin/dashboard/stats", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalBookings"], 1);
    assert_eq!(body["data"]["completedBookings"], 1);

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/admin/bookings/export", Some(&admin), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("bookings-export-")
    );
    let csv = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(csv.to_vec()).unwrap();
    assert!(csv.starts_with("Booking ID,"));
    assert!(csv.contains("STUDY_ABROAD"));
}

#[tokio::test]
async fn test_webhook_endpoint() {
    let app = app().await;
    let token = register(&app, "asha@example.com").await;
    let booking_id = book(&app, &token, 1500).await;
    let (_, body) = send(
        &app,
        request(
            Method::POST,
            "/api/payments/create",
            Some(&token),
            Some(json!({ "bookingId": booking_id })),
        ),
    )
    .await;
    let order_id = body["data"]["orderId"].as_str().unwrap().to_string();

    let payload = json!({
        "event": "payment.captured",
        "payload": {"payment": {"entity": {
            "id": "pay_hook_1", "order_id": order_id, "amount": 1500, "currency": "INR", "status": "captured"
        }}}
    })
    .to_string();

    let webhook = |sig: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/payments/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-razorpay-signature", sig)
            .header("x-razorpay-event-id", "evt_hook_1")
            .body(Body::from(payload.clone()))
            .unwrap()
    };

    let (status, body) = send(&app, webhook("bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_SIGNATURE");

    let sig = signature::sign(payload.as_bytes(), WEBHOOK_SECRET);
    let (status, body) = send(&app, webhook(&sig)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment captured successfully");

    let (status, body) = send(&app, webhook(&sig)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Event already processed");

    let (_, body) = send(
        &app,
        request(Method::GET, &format!("/api/bookings/{booking_id}"), Some(&token), None),
    )
    .await;
    assert_eq!(body["data"]["booking"]["status"], "SUCCESS");
}

#[tokio::test]
async fn test_web_payment_page() {
    let app = app().await;
    let token = register(&app, "asha@example.com").await;
    let booking_id = book(&app, &token, 1500).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/payments/create-payment-session",
            Some(&token),
            Some(json!({ "bookingId": booking_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let url = body["data"]["paymentUrl"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(request(Method::GET, &url, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(html.to_vec()).unwrap();
    assert!(html.contains("checkout.razorpay.com"));
    assert!(html.contains("order_"));

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/payments/web-payment", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
