//! Frame header codec for the switcher's UDP control protocol.
//!
//! Wire format:
//! ```text
//! [flags:5 bits | total_len:11 bits][session_id:2][ack_seq:2][from_seq:2][reserved:2][sequence:2]
//! ```
//! Total header size: 12 bytes. All multi-byte integers are big-endian.
//!
//! # How the header is laid out (for beginners)
//!
//! The first two bytes are a packed big-endian word: the top 5 bits carry
//! the flag set and the low 11 bits carry the total datagram length,
//! header included. A header-only frame therefore encodes length 12.
//!
//! The sequence-number placement is asymmetric, and both sides of the
//! asymmetry matter:
//!
//! - An **acknowledgment** frame carries the sequence it acknowledges at
//!   bytes 4–5 and leaves bytes 6–11 zero. With the AckReply flag and
//!   length 12 its first two bytes are always `80 0C`.
//! - **Every other** frame carries its own sequence at bytes 10–11.
//! - A **retransmit request** additionally carries the sequence to resend
//!   from at bytes 6–7.
//!
//! Mixing these layouts up produces frames the switcher silently drops,
//! so the encoders below are kept separate per layout.

use thiserror::Error;

/// Size of the frame header in bytes. Every valid frame is at least this long.
pub const HEADER_SIZE: usize = 12;

/// Largest datagram either side will send. Frames above this are never
/// stored for retransmission.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

/// Mask extracting the 11-bit total-length field from the first header word.
pub const LENGTH_MASK: u16 = 0x07FF;

/// Session id a client uses before the switcher assigns a real one.
pub const SESSION_ID_BOOTSTRAP: u16 = 0x53AB;

/// Value of the local sequence counter before the handshake completes.
/// The first post-handshake data frame is sequence 1.
pub const SEQUENCE_BOOTSTRAP: u16 = 768;

/// The 20-byte handshake frame, sent verbatim to open a session.
///
/// Bytes 0–11 are a normal header (NewSessionId flag, length 20, bootstrap
/// session id); the 8-byte tail is opaque to us and reproduced exactly as
/// the reference clients send it. This frame is never stored for
/// retransmission.
pub const HELLO_FRAME: [u8; 20] = [
    0x10, 0x14, 0x53, 0xAB, 0x00, 0x00, 0x00, 0x00, 0x00, 0x3A, 0x00, 0x00, 0x01, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Errors that can occur while reading a frame header.
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    /// The datagram is shorter than the fixed header.
    #[error("truncated frame: need at least {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },
}

/// The 5-bit flag set packed into the top of the first header word.
///
/// - Bit 0: AckRequest – sender wants this frame acknowledged
/// - Bit 1: NewSessionId – frame announces a session id assignment
/// - Bit 2: IsRetransmit – frame is a resend of an earlier one
/// - Bit 3: RetransmitRequest – sender asks for resends from a sequence
/// - Bit 4: AckReply – frame acknowledges a received sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFlags(pub u8);

impl HeaderFlags {
    pub const ACK_REQUEST: u8 = 1 << 0;
    pub const NEW_SESSION_ID: u8 = 1 << 1;
    pub const IS_RETRANSMIT: u8 = 1 << 2;
    pub const RETRANSMIT_REQUEST: u8 = 1 << 3;
    pub const ACK_REPLY: u8 = 1 << 4;

    /// Returns `true` if every bit in `mask` is set.
    pub fn contains(&self, mask: u8) -> bool {
        self.0 & mask == mask
    }
}

/// A parsed frame header. Borrowing stops at the header; payload slicing is
/// the caller's to do with `declared_len` in hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Flag bits from the top of the first header word.
    pub flags: HeaderFlags,
    /// Total datagram length the sender declared, header included.
    pub declared_len: u16,
    /// Session id at bytes 2–3.
    pub session_id: u16,
    /// Bytes 6–7: in a retransmit request, the sequence to resend from.
    pub resend_from: u16,
    /// Bytes 10–11: the sender's own sequence number (zero in ack frames,
    /// which carry the acknowledged sequence at bytes 4–5 instead).
    pub sequence: u16,
}

impl FrameHeader {
    /// Parses the 12-byte header off the front of a datagram.
    ///
    /// A declared length that disagrees with the actual datagram size is
    /// **not** an error here; callers compare and log as they see fit.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::Truncated`] if fewer than 12 bytes are given.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use atem_core::protocol::header::{FrameHeader, HeaderFlags, HELLO_FRAME};
    ///
    /// let header = FrameHeader::parse(&HELLO_FRAME).unwrap();
    /// assert!(header.flags.contains(HeaderFlags::NEW_SESSION_ID));
    /// assert_eq!(header.declared_len, 20);
    /// assert_eq!(header.session_id, 0x53AB);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<FrameHeader, WireError> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }

        let word = u16::from_be_bytes([bytes[0], bytes[1]]);
        Ok(FrameHeader {
            flags: HeaderFlags((word >> 11) as u8),
            declared_len: word & LENGTH_MASK,
            session_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            resend_from: u16::from_be_bytes([bytes[6], bytes[7]]),
            sequence: u16::from_be_bytes([bytes[10], bytes[11]]),
        })
    }
}

// ── Encoders ──────────────────────────────────────────────────────────────────

/// Encodes the standard 12-byte header with the sender's sequence at
/// bytes 10–11. Used for every outbound frame except acknowledgments.
///
/// `total_len` is the full datagram length including this header; values
/// above the 11-bit field are truncated by the mask, so callers keep
/// frames under [`MAX_DATAGRAM_SIZE`].
pub fn encode_header(flags: HeaderFlags, total_len: u16, session_id: u16, sequence: u16) -> [u8; HEADER_SIZE] {
    let word = ((flags.0 as u16) << 11) | (total_len & LENGTH_MASK);
    let mut header = [0u8; HEADER_SIZE];
    header[0..2].copy_from_slice(&word.to_be_bytes());
    header[2..4].copy_from_slice(&session_id.to_be_bytes());
    header[10..12].copy_from_slice(&sequence.to_be_bytes());
    header
}

/// Encodes a header-only acknowledgment frame: AckReply flag, length 12,
/// the acknowledged sequence at bytes 4–5, bytes 6–11 zero.
///
/// The first two bytes of the result are always `0x80 0x0C`.
pub fn encode_ack(session_id: u16, acked_sequence: u16) -> [u8; HEADER_SIZE] {
    let word = ((HeaderFlags::ACK_REPLY as u16) << 11) | HEADER_SIZE as u16;
    let mut header = [0u8; HEADER_SIZE];
    header[0..2].copy_from_slice(&word.to_be_bytes());
    header[2..4].copy_from_slice(&session_id.to_be_bytes());
    header[4..6].copy_from_slice(&acked_sequence.to_be_bytes());
    header
}

// ── Tests ─────────────────────────────────────────────────────────────────────
