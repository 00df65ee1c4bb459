//! atem-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! The client keeps one UDP session to a switcher alive:
//!
//! 1. `connect()` sends the hello frame and waits for the switcher to
//!    assign a session id.
//! 2. A caller-driven 10 ms tick (`poll()`) receives frames, applies
//!    program/preview reports to the mirrored state, answers retransmit
//!    requests from the outbound history ring, and emits heartbeats.
//! 3. Control operations (program, preview, cut, auto) go out as
//!    sequenced reliable frames the switcher can ask to have resent.
//!
//! `atem-core` holds the wire codecs and the state model; this crate
//! adds everything that needs a socket, a clock, or a session.

/// TOML application config plus the engine's timing knobs.
pub mod config;

/// The connection engine: handshake, tick loop, control operations.
pub mod connection;

/// Handler trait observers implement to hear about changes.
pub mod events;

/// Outbound frame history ring and the ack policy.
pub mod reliability;

/// Per-session ids, sequence counters, and liveness clocks.
pub mod session;

/// Datagram transport seam: real UDP plus a recording mock.
pub mod transport;
