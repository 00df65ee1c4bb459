//! Per-session bookkeeping: ids, sequence counters, and liveness clocks.
//!
//! One [`SessionContext`] exists per `connect()` attempt. It tracks the
//! peer-assigned session id, the local outbound sequence, the highest
//! sequence seen from the peer, and the two timestamps the engine's
//! heartbeat and silence checks run on.

use std::time::{Duration, Instant};

use atem_core::protocol::header::{SEQUENCE_BOOTSTRAP, SESSION_ID_BOOTSTRAP};

/// Bookkeeping for one switcher session.
#[derive(Debug)]
pub struct SessionContext {
    session_id: u16,
    local_sequence: u16,
    remote_sequence: u16,
    last_heartbeat: Instant,
    last_inbound: Instant,
}

impl SessionContext {
    /// Fresh pre-handshake context: bootstrap session id, local counter at
    /// the bootstrap value, both clocks at now.
    pub fn new() -> SessionContext {
        let now = Instant::now();
        SessionContext {
            session_id: SESSION_ID_BOOTSTRAP,
            local_sequence: SEQUENCE_BOOTSTRAP,
            remote_sequence: 0,
            last_heartbeat: now,
            last_inbound: now,
        }
    }

    pub fn session_id(&self) -> u16 {
        self.session_id
    }

    /// Adopts a session id announced by the peer.
    pub fn adopt_session_id(&mut self, id: u16) {
        self.session_id = id;
    }

    /// Hands out the sequence for the next outbound frame and advances the
    /// counter. Wraps at `u16::MAX` without special handling; sessions are
    /// far shorter-lived than 65k reliable sends at typical rates.
    pub fn next_sequence(&mut self) -> u16 {
        let sequence = self.local_sequence;
        self.local_sequence = self.local_sequence.wrapping_add(1);
        sequence
    }

    /// Restarts the counter at 1 for the first post-handshake data frame.
    pub fn reset_data_sequence(&mut self) {
        self.local_sequence = 1;
    }

    /// Highest sequence observed from the peer this session.
    pub fn remote_sequence(&self) -> u16 {
        self.remote_sequence
    }

    /// Advances the remote-sequence watermark. Only moves forward; an
    /// older sequence (a retransmit) leaves it alone.
    pub fn observe_remote_sequence(&mut self, sequence: u16) {
        if sequence > self.remote_sequence {
            self.remote_sequence = sequence;
        }
    }

    /// Notes that a frame arrived, for the inbound-silence check.
    pub fn mark_inbound(&mut self) {
        self.last_inbound = Instant::now();
    }

    /// Time since the last inbound frame of at least header size.
    pub fn inbound_silence(&self) -> Duration {
        self.last_inbound.elapsed()
    }

    /// Notes that a heartbeat went out (or that the session just opened).
    pub fn mark_heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    /// Time since the last heartbeat mark.
    pub fn since_heartbeat(&self) -> Duration {
        self.last_heartbeat.elapsed()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
