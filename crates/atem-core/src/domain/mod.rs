//! Domain entities for ATEM-Control.
//!
//! Pure switcher-state bookkeeping with no sockets, timers, or other
//! infrastructure dependencies.

/// Mixer state snapshot and change tracking.
///
/// See [`state::StateStore`] for the main type.
pub mod state;
