//! Command blocks carried in the payload of data frames.
//!
//! A frame payload is a train of blocks, each:
//! ```text
//! [length:2][reserved:2][tag:4][payload:length-8]
//! ```
//! The 2-byte big-endian length counts the 8-byte sub-header itself. The
//! tag is four ASCII characters naming the command. Unknown tags are
//! skipped by length so one frame can mix commands from any firmware
//! revision.

use tracing::error;

/// Size of the per-block sub-header (length + reserved + tag).
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Four-character tags for the commands this crate understands.
pub mod tags {
    /// Switcher reports the source on the program bus.
    pub const PROGRAM_INPUT: [u8; 4] = *b"PrgI";
    /// Switcher reports the source on the preview bus.
    pub const PREVIEW_INPUT: [u8; 4] = *b"PrvI";
    /// Client asks for a program bus change.
    pub const SET_PROGRAM: [u8; 4] = *b"CPgI";
    /// Client asks for a preview bus change.
    pub const SET_PREVIEW: [u8; 4] = *b"CPvI";
    /// Client triggers an immediate cut.
    pub const CUT: [u8; 4] = *b"DCut";
    /// Client triggers the configured auto transition.
    pub const AUTO: [u8; 4] = *b"DAut";
}

/// One command block, borrowed from the frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBlock<'a> {
    /// Four ASCII characters naming the command.
    pub tag: [u8; 4],
    /// Command data after the 8-byte sub-header.
    pub payload: &'a [u8],
}

impl CommandBlock<'_> {
    /// The tag as printable text, for logs.
    pub fn tag_str(&self) -> &str {
        std::str::from_utf8(&self.tag).unwrap_or("????")
    }
}

/// Iterator over the command blocks in one frame payload.
///
/// Iteration ends silently when fewer than [`BLOCK_HEADER_SIZE`] bytes
/// remain (trailing padding is normal). A block whose declared length is
/// shorter than its own sub-header, or runs past the end of the payload,
/// ends iteration with an error log; bytes after a corrupt length field
/// cannot be framed reliably.
pub struct CommandReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> CommandReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        CommandReader { buf: payload, pos: 0 }
    }
}

impl<'a> Iterator for CommandReader<'a> {
    type Item = CommandBlock<'a>;

    fn next(&mut self) -> Option<CommandBlock<'a>> {
        let remaining = self.buf.len() - self.pos;
        if remaining < BLOCK_HEADER_SIZE {
            return None;
        }

        let declared = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]) as usize;
        if declared < BLOCK_HEADER_SIZE {
            error!(
                declared,
                offset = self.pos,
                "command block length below sub-header size, dropping rest of frame"
            );
            self.pos = self.buf.len();
            return None;
        }
        if declared > remaining {
            error!(
                declared,
                remaining, "command block overruns frame payload, dropping rest of frame"
            );
            self.pos = self.buf.len();
            return None;
        }

        let mut tag = [0u8; 4];
        tag.copy_from_slice(&self.buf[self.pos + 4..self.pos + 8]);
        let payload = &self.buf[self.pos + BLOCK_HEADER_SIZE..self.pos + declared];
        self.pos += declared;
        Some(CommandBlock { tag, payload })
    }
}

// ── Outbound commands ─────────────────────────────────────────────────────────

/// Size of every control block this client sends: 8-byte sub-header plus
/// a 4-byte argument area.
pub const CONTROL_BLOCK_SIZE: usize = 12;

/// A control request the client can send to the switcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Put this source on the program bus.
    ProgramInput(u16),
    /// Put this source on the preview bus.
    PreviewInput(u16),
    /// Swap program and preview immediately.
    Cut,
    /// Run the configured transition between preview and program.
    AutoTransition,
}

impl ControlCommand {
    pub fn tag(&self) -> [u8; 4] {
        match self {
            ControlCommand::ProgramInput(_) => tags::SET_PROGRAM,
            ControlCommand::PreviewInput(_) => tags::SET_PREVIEW,
            ControlCommand::Cut => tags::CUT,
            ControlCommand::AutoTransition => tags::AUTO,
        }
    }

    /// Encodes the 12-byte command block.
    ///
    /// Argument bytes 0–1 select the mix effect bus; this client always
    /// addresses bus 0, which every model in the product line has. Bus
    /// changes carry the source id big-endian at argument bytes 2–3; cut
    /// and auto leave the whole argument area zero.
    pub fn encode_block(&self) -> [u8; CONTROL_BLOCK_SIZE] {
        let mut block = [0u8; CONTROL_BLOCK_SIZE];
        block[0..2].copy_from_slice(&(CONTROL_BLOCK_SIZE as u16).to_be_bytes());
        block[4..8].copy_from_slice(&self.tag());
        match self {
            ControlCommand::ProgramInput(source) | ControlCommand::PreviewInput(source) => {
                block[10..12].copy_from_slice(&source.to_be_bytes());
            }
            ControlCommand::Cut | ControlCommand::AutoTransition => {}
        }
        block
    }
}

// ── Inbound state reports ─────────────────────────────────────────────────────

/// A state report decoded from an inbound command block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCommand {
    /// Program bus now carries this source.
    ProgramInput { source: u16 },
    /// Preview bus now carries this source.
    PreviewInput { source: u16 },
}

impl StateCommand {
    /// Returns `true` for tags this decoder understands. Lets callers
    /// tell "unknown tag" apart from "known tag, bad payload".
    pub fn handles(tag: [u8; 4]) -> bool {
        matches!(tag, tags::PROGRAM_INPUT | tags::PREVIEW_INPUT)
    }

    /// Decodes a bus report, or `None` for unknown tags and payloads too
    /// short to carry a source id (those are logged at error level).
    pub fn decode(block: &CommandBlock<'_>) -> Option<StateCommand> {
        match block.tag {
            tags::PROGRAM_INPUT => {
                bus_source(block).map(|source| StateCommand::ProgramInput { source })
            }
            tags::PREVIEW_INPUT => {
                bus_source(block).map(|source| StateCommand::PreviewInput { source })
            }
            _ => None,
        }
    }
}

/// Reads the source id from a bus report payload. Bytes 0–1 are the mix
/// effect index (0 on single-bus models), bytes 2–3 the source.
fn bus_source(block: &CommandBlock<'_>) -> Option<u16> {
    if block.payload.len() < 4 {
        error!(
            tag = block.tag_str(),
            available = block.payload.len(),
            "bus report payload too short, ignoring"
        );
        return None;
    }
    Some(u16::from_be_bytes([block.payload[2], block.payload[3]]))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
