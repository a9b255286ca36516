//! Bearer token guards for student and admin routes.
//!
//! Each guard resolves the token to its principal and stores it in the
//! request extensions, where handlers pick it up with `Extension<_>`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use carrierhub_types::{AppError, ConsultRepository, PaymentGateway};

use super::handlers::{ApiError, AppState};

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(auth_header: Option<&str>) -> Option<&str> {
    auth_header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Owned, so no borrow of the request is held across an await.
fn token_of(request: &Request) -> Result<String, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    bearer_token(header)
        .map(str::to_string)
        .ok_or(AppError::NoToken)
}

pub async fn require_student<R: ConsultRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_of(&request)?;
    let student = state.service.authenticate_student(&token).await?;

    request.extensions_mut().insert(student);
    Ok(next.run(request).await)
}

pub async fn require_admin<R: ConsultRepository, G: PaymentGateway>(
    State(state): State<Arc<AppState<R, G>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_of(&request)?;
    let admin = state.service.authenticate_admin(&token).await?;

    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_bearer_prefix_required() {
        assert_eq!(bearer_token(Some("abc.def")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
    }

    #[test]
    fn test_missing_or_empty_token() {
        assert_eq!(bearer_token(None), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
    }
}
