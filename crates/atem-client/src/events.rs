//! Observer seam for connection and switcher state changes.
//!
//! The engine owns one boxed [`SwitcherHandler`] and calls it
//! synchronously from its tick, so implementations should return
//! quickly. Default bodies are empty; an observer overrides only the
//! notifications it cares about.

use atem_core::SwitcherState;
use serde::{Deserialize, Serialize};

/// Lifecycle of one switcher session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session. The starting state, and the result of `disconnect()`.
    Disconnected,
    /// Handshake in flight.
    Connecting,
    /// Session established; heartbeats and state mirroring active.
    Connected,
    /// Session lost (handshake timeout or inbound silence). Stays here
    /// until `disconnect()` or a fresh `connect()`.
    Error,
}

/// Observer for session and mixer changes.
pub trait SwitcherHandler: Send {
    /// The session entered a new lifecycle state.
    fn connection_state_changed(&mut self, state: ConnectionState) {
        let _ = state;
    }

    /// The program bus switched to a new source.
    fn program_input_changed(&mut self, source: u16) {
        let _ = source;
    }

    /// The preview bus switched to a new source.
    fn preview_input_changed(&mut self, source: u16) {
        let _ = source;
    }

    /// Some state field changed this tick. Fired at most once per tick,
    /// after the per-field hooks, with the consolidated snapshot.
    fn state_changed(&mut self, state: &SwitcherState) {
        let _ = state;
    }
}

/// Handler that ignores every notification. The default until the caller
/// installs a real one.
#[derive(Debug, Default)]
pub struct NoopHandler;

impl SwitcherHandler for NoopHandler {}
