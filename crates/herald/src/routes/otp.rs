//! OTP issuance and validation endpoints.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State, rejection::JsonRejection},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use herald_common::constants::headers::{X_FORWARDED_FOR, X_RATELIMIT_REMAINING};
use herald_common::{OtpError, SendOtpRequest, SuccessResponse, ValidateOtpRequest};
use std::net::SocketAddr;

use super::ApiError;
use crate::rate_limit::Admission;
use crate::state::AppState;

/// `POST /send-otp`
pub async fn send_otp(
    State(state): State<AppState>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| reject_body(e, "Phone number is required"))?;
    state.otp_service.issue(&payload.phone_number).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// `POST /validate-otp`
pub async fn validate_otp(
    State(state): State<AppState>,
    payload: Result<Json<ValidateOtpRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| reject_body(e, "Phone number and OTP are required"))?;
    state
        .otp_service
        .validate(&payload.phone_number, &payload.otp)
        .await?;
    Ok(Json(SuccessResponse::ok()))
}

/// An unreadable body carries none of the required fields
fn reject_body(rejection: JsonRejection, missing: &'static str) -> ApiError {
    tracing::debug!(error = %rejection.body_text(), "Rejected request body");
    ApiError(OtpError::InvalidInput(missing))
}

/// Throttle issuance per request source
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let source = request_source(&request, state.config.rate_limit.trust_forwarded_for);

    match state.rate_limiter.check(&source).await {
        Admission::Admitted { remaining } => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static(X_RATELIMIT_REMAINING),
                HeaderValue::from(remaining),
            );
            response
        }
        Admission::Rejected { retry_after_secs } => {
            let mut response = ApiError(OtpError::RateLimitExceeded).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            response
        }
    }
}

/// Peer IP, or the first forwarded address when the proxy is trusted
fn request_source(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
