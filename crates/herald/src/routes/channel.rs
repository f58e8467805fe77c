//! Messaging bridge lifecycle callbacks.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use herald_common::constants::headers::X_CHANNEL_TOKEN;
use herald_common::{ChannelEvent, ChannelState};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct ChannelStatusResponse {
    state: ChannelState,
    ready: bool,
}

#[derive(Serialize)]
pub struct EventResponse {
    from: ChannelState,
    to: ChannelState,
    changed: bool,
}

/// Apply a lifecycle event reported by the bridge
///
/// Returns 401 when an event token is configured and not presented.
pub async fn post_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<ChannelEvent>,
) -> Result<Json<EventResponse>, StatusCode> {
    if let Some(expected) = state.config.channel.event_token.as_deref() {
        let presented = headers.get(X_CHANNEL_TOKEN).and_then(|v| v.to_str().ok());
        if presented != Some(expected) {
            tracing::warn!("Rejected channel event with missing or wrong token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let transition = state.gate.apply(&event);

    Ok(Json(EventResponse {
        from: transition.from,
        to: transition.to,
        changed: transition.changed(),
    }))
}

/// Current channel state
pub async fn get_status(State(state): State<AppState>) -> Json<ChannelStatusResponse> {
    let current = state.gate.state();
    Json(ChannelStatusResponse {
        state: current,
        ready: current == ChannelState::Ready,
    })
}
