//! Local mirror of the switcher's mixer state.
//!
//! The switcher is the single source of truth. Sending a bus-change
//! command changes nothing here; only the switcher's own report of the
//! new bus contents does. Until that report arrives the mirror keeps
//! showing the last confirmed values.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Snapshot of the mixer state this client tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwitcherState {
    /// Source id on the program bus (on air now).
    pub program_input: u16,
    /// Source id on the preview bus (on air after the next transition).
    pub preview_input: u16,
    /// `true` while a transition is running.
    pub in_transition: bool,
    /// Transition progress; 0 at rest.
    pub transition_position: u8,
}

/// Owns the state snapshot and tracks changes between ticks.
///
/// Any number of field changes within one tick collapse into a single
/// dirty flag, so observers get one consolidated notification per tick
/// rather than one per field.
#[derive(Debug, Default)]
pub struct StateStore {
    state: SwitcherState,
    dirty: bool,
}

impl StateStore {
    pub fn new() -> StateStore {
        StateStore::default()
    }

    /// Current snapshot, by copy.
    pub fn snapshot(&self) -> SwitcherState {
        self.state
    }

    pub fn program_input(&self) -> u16 {
        self.state.program_input
    }

    pub fn preview_input(&self) -> u16 {
        self.state.preview_input
    }

    /// Records a program bus report. Returns `true` if the value actually
    /// changed; a report repeating the current value is a no-op.
    pub fn apply_program_input(&mut self, source: u16) -> bool {
        if self.state.program_input == source {
            return false;
        }
        self.state.program_input = source;
        self.dirty = true;
        info!(source, "program input changed");
        true
    }

    /// Records a preview bus report. Returns `true` if the value actually
    /// changed.
    pub fn apply_preview_input(&mut self, source: u16) -> bool {
        if self.state.preview_input == source {
            return false;
        }
        self.state.preview_input = source;
        self.dirty = true;
        info!(source, "preview input changed");
        true
    }

    /// Clears and returns the dirty flag. Called once at the end of a
    /// tick to decide whether to publish a consolidated notification.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
