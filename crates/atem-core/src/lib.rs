//! # atem-core
//!
//! Shared library for ATEM-Control containing the datagram wire format,
//! command block codec, and the switcher state model.
//!
//! This crate is used by the client engine and by anything that needs to
//! speak the switcher protocol. It has zero dependencies on sockets,
//! timers, or async runtimes.
//!
//! # Architecture overview (for beginners)
//!
//! ATEM-Control talks to a broadcast video switcher over UDP. The switcher
//! mixes several video inputs (cameras, media players, color generators)
//! onto two buses: **program** (what is on air right now) and **preview**
//! (what goes on air at the next transition). A control client changes
//! those buses remotely and mirrors the switcher's state locally.
//!
//! This crate (`atem-core`) is the shared foundation. It defines:
//!
//! - **`protocol`** – How bytes travel over the network. Every datagram
//!   starts with a 12-byte header (flags, length, session id, sequence
//!   numbers); data frames then carry a train of length-prefixed command
//!   blocks, each identified by a four-character ASCII tag.
//!
//! - **`domain`** – The local mirror of the switcher: which source is on
//!   program, which is on preview, and whether a transition is running.
//!
//! - **`sources`** – The stable numeric ids the switcher assigns to its
//!   video sources (camera 1 is always 1, color bars are always 1000, and
//!   so on), shared by every model in the product line.

pub mod domain;
pub mod protocol;
pub mod sources;

// Re-export the most-used types at the crate root so callers can write
// `atem_core::FrameHeader` instead of `atem_core::protocol::header::FrameHeader`.
pub use domain::state::{StateStore, SwitcherState};
pub use protocol::command::{CommandBlock, CommandReader, ControlCommand, StateCommand};
pub use protocol::header::{encode_ack, encode_header, FrameHeader, HeaderFlags, WireError};
