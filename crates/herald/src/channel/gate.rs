//! Channel readiness gate.
//!
//! Pure state tracking. Written by the collaborator's event stream, read by
//! every issuance request.

use herald_common::{ChannelEvent, ChannelState};
use std::sync::atomic::{AtomicU8, Ordering};

/// Outcome of applying one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ChannelState,
    pub to: ChannelState,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub struct ReadinessGate {
    state: AtomicU8,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ChannelState::Disconnected.as_u8()),
        }
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ChannelState::Ready
    }

    pub fn on_connecting(&self) -> Transition {
        self.apply(&ChannelEvent::Connecting)
    }

    pub fn on_ready(&self) -> Transition {
        self.apply(&ChannelEvent::Ready)
    }

    pub fn on_disconnected(&self, reason: Option<String>) -> Transition {
        self.apply(&ChannelEvent::Disconnected { reason })
    }

    pub fn on_auth_failed(&self, detail: Option<String>) -> Transition {
        self.apply(&ChannelEvent::AuthFailure { detail })
    }

    /// Apply a lifecycle event. Illegal transitions leave the state as is.
    pub fn apply(&self, event: &ChannelEvent) -> Transition {
        let result = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                next_state(ChannelState::from_u8(raw), event).map(ChannelState::as_u8)
            });

        let (from, to) = match result {
            Ok(prev) => {
                let from = ChannelState::from_u8(prev);
                (from, next_state(from, event).unwrap_or(from))
            }
            Err(current) => {
                let state = ChannelState::from_u8(current);
                (state, state)
            }
        };

        let transition = Transition { from, to };
        log_transition(event, transition);
        transition
    }
}

/// Transition function. `None` means the event is ignored in `current`.
fn next_state(current: ChannelState, event: &ChannelEvent) -> Option<ChannelState> {
    use ChannelState::*;

    match (current, event) {
        (_, ChannelEvent::Connecting | ChannelEvent::Qr { .. }) => Some(Connecting),
        (AuthFailed, _) => None,
        (_, ChannelEvent::Ready) => Some(Ready),
        (_, ChannelEvent::Disconnected { .. }) => Some(Disconnected),
        (_, ChannelEvent::AuthFailure { .. }) => Some(AuthFailed),
    }
}

fn log_transition(event: &ChannelEvent, transition: Transition) {
    if !transition.changed() {
        tracing::debug!(state = transition.to.as_str(), event = ?event, "Channel event caused no transition");
        return;
    }

    match event {
        ChannelEvent::Ready => tracing::info!("Messaging channel is ready"),
        ChannelEvent::Disconnected { reason } => {
            tracing::warn!(reason = ?reason, "Messaging channel disconnected")
        }
        ChannelEvent::AuthFailure { detail } => {
            tracing::error!(detail = ?detail, "Messaging channel authentication failed")
        }
        ChannelEvent::Qr { .. } => {
            tracing::info!("Pairing code received, waiting for the channel to be linked")
        }
        ChannelEvent::Connecting => tracing::info!("Messaging channel connecting"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disconnected() {
        let gate = ReadinessGate::new();
        assert_eq!(gate.state(), ChannelState::Disconnected);
        assert!(!gate.is_ready());
    }

    #[test]
    fn test_happy_path_and_revocation() {
        let gate = ReadinessGate::new();
        gate.on_connecting();
        assert!(!gate.is_ready());

        let t = gate.on_ready();
        assert_eq!(t.from, ChannelState::Connecting);
        assert!(gate.is_ready());

        gate.on_disconnected(Some("LOGOUT".to_string()));
        assert!(!gate.is_ready());
        assert_eq!(gate.state(), ChannelState::Disconnected);
    }

    #[test]
    fn test_on_ready_is_idempotent() {
        let gate = ReadinessGate::new();
        gate.on_connecting();
        assert!(gate.on_ready().changed());
        assert!(!gate.on_ready().changed());
        assert!(gate.is_ready());
    }

    #[test]
    fn test_ready_accepted_straight_from_disconnected() {
        // A bridge that reconnects without announcing `connecting` still opens the gate
        let gate = ReadinessGate::new();
        let t = gate.on_ready();
        assert_eq!(t.from, ChannelState::Disconnected);
        assert_eq!(t.to, ChannelState::Ready);
        assert!(gate.is_ready());

        gate.on_disconnected(None);
        assert!(gate.on_ready().changed());
        assert!(gate.is_ready());
    }

    #[test]
    fn test_auth_failed_is_sticky_until_connecting() {
        let gate = ReadinessGate::new();
        gate.on_connecting();
        gate.on_ready();
        gate.on_auth_failed(Some("bad session".to_string()));
        assert_eq!(gate.state(), ChannelState::AuthFailed);

        let t = gate.on_ready();
        assert!(!t.changed());
        assert!(!gate.is_ready());

        gate.on_disconnected(None);
        assert_eq!(gate.state(), ChannelState::AuthFailed);

        gate.apply(&ChannelEvent::Qr {
            code: "2@abc".to_string(),
        });
        assert_eq!(gate.state(), ChannelState::Connecting);
        gate.on_ready();
        assert!(gate.is_ready());
    }
}
