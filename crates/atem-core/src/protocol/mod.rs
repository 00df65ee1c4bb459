//! Protocol module containing the frame header codec and command blocks.

pub mod command;
pub mod header;

pub use command::{CommandBlock, CommandReader, ControlCommand, StateCommand};
pub use header::{encode_ack, encode_header, FrameHeader, HeaderFlags, WireError};

/// UDP port the switcher listens on. Fixed across the product line.
pub const CONTROL_PORT: u16 = 9910;
