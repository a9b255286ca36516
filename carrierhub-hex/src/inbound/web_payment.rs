//! Hosted checkout page opened from the mobile app.
//!
//! The page is reached with a payment session token, renders the booking
//! summary and hands off to Razorpay Checkout. On completion the browser is
//! redirected to an app deep link carrying the checkout response, which the
//! app then posts to `/api/payments/verify`.

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;

use carrierhub_types::{
    AppError, BookingId, ConsultRepository, Money, PaymentGateway, WebPaymentQuery,
};

use super::handlers::AppState;
use crate::service::CheckoutContext;

const CHECKOUT_SCRIPT: &str = "https://checkout.razorpay.com/v1/checkout.js";
const SUCCESS_LINK: &str = "carrierhub://payment-success";
const FAILURE_LINK: &str = "carrierhub://payment-failed";
const CANCEL_LINK: &str = "carrierhub://payment-cancelled";
const DASHBOARD_LINK: &str = "carrierhub://dashboard";

#[derive(Template)]
#[template(path = "checkout.html")]
struct CheckoutPage<'a> {
    booking_id: BookingId,
    title: &'a str,
    student_name: &'a str,
    student_email: &'a str,
    amount: String,
    script_url: &'a str,
    checkout: CheckoutData<'a>,
}

/// Values read by the page script: Checkout options and the deep links.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutData<'a> {
    key: &'a str,
    amount: i64,
    currency: &'a str,
    description: &'a str,
    order_id: &'a str,
    booking_id: BookingId,
    prefill: Prefill<'a>,
    success_url: &'a str,
    failure_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Serialize)]
struct Prefill<'a> {
    name: &'a str,
    email: &'a str,
    contact: &'a str,
}

#[derive(Template)]
#[template(path = "payment_error.html")]
struct ErrorPage<'a> {
    title: &'a str,
    message: &'a str,
    return_url: &'a str,
}

pub async fn web_payment<R: ConsultRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    query: Result<Query<WebPaymentQuery>, QueryRejection>,
) -> Response {
    let token = query.ok().and_then(|Query(q)| q.token);
    let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "Invalid Payment Link",
            "The payment link is missing its session token.",
        );
    };

    match state.service.web_checkout(&token).await {
        Ok(ctx) => render(StatusCode::OK, &checkout_page(&ctx)),
        Err(AppError::TokenExpired) => error_page(
            StatusCode::BAD_REQUEST,
            "Session Expired",
            "This payment session has expired. Please start the payment again from the app.",
        ),
        Err(AppError::InvalidToken) => error_page(
            StatusCode::BAD_REQUEST,
            "Invalid Payment Link",
            "This payment link is not valid.",
        ),
        Err(AppError::NotFound(_)) => error_page(
            StatusCode::NOT_FOUND,
            "Booking Not Found",
            "We could not find the booking for this payment.",
        ),
        Err(AppError::InvalidBookingStatus(status)) => error_page(
            StatusCode::BAD_REQUEST,
            "Payment Not Available",
            &format!("This booking is {status} and cannot be paid."),
        ),
        Err(e) => {
            tracing::error!(error = %e, "web checkout failed");
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Payment Error",
                "Something went wrong while preparing your payment. Please try again.",
            )
        }
    }
}

fn checkout_page(ctx: &CheckoutContext) -> CheckoutPage<'_> {
    let amount = Money::new(ctx.amount, ctx.currency)
        .map(|m| m.to_string())
        .unwrap_or_else(|_| ctx.amount.to_string());
    let title = ctx.consultant_type.title();

    CheckoutPage {
        booking_id: ctx.booking_id,
        title,
        student_name: &ctx.student_name,
        student_email: &ctx.student_email,
        amount,
        script_url: CHECKOUT_SCRIPT,
        checkout: CheckoutData {
            key: &ctx.key_id,
            amount: ctx.amount,
            currency: ctx.currency.as_str(),
            description: title,
            order_id: &ctx.order_id,
            booking_id: ctx.booking_id,
            prefill: Prefill {
                name: &ctx.student_name,
                email: &ctx.student_email,
                contact: &ctx.student_phone,
            },
            success_url: SUCCESS_LINK,
            failure_url: FAILURE_LINK,
            cancel_url: CANCEL_LINK,
        },
    }
}

fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    render(
        status,
        &ErrorPage {
            title,
            message,
            return_url: DASHBOARD_LINK,
        },
    )
}

fn render(status: StatusCode, page: &impl Template) -> Response {
    match page.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "payment page rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Payment page unavailable").into_response()
        }
    }
}
