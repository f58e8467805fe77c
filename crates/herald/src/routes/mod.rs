//! HTTP route handlers for Herald.

use axum::{
    Json, Router, middleware,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use herald_common::{ErrorResponse, OtpError};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod channel;
mod health;
mod otp;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))

        // OTP endpoints (only issuance is throttled)
        .route(
            "/send-otp",
            post(otp::send_otp).route_layer(middleware::from_fn_with_state(
                state.clone(),
                otp::rate_limit,
            )),
        )
        .route("/validate-otp", post(otp::validate_otp))

        // Messaging bridge callbacks
        .route("/channel/events", post(channel::post_event))
        .route("/channel/status", get(channel::get_status))

        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}

/// `OtpError` rendered as `{ "error": "..." }`
pub struct ApiError(pub OtpError);

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse {
            error: self.0.public_message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
