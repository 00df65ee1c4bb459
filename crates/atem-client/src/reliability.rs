//! Retransmission store for reliable outbound frames.
//!
//! # Why store sent frames? (for beginners)
//!
//! UDP gives no delivery guarantee, so the switcher protocol builds its
//! own: every data frame and heartbeat carries a sequence number, and the
//! receiving side acknowledges what it saw. When the switcher notices a
//! gap it sends a retransmit request naming the first sequence it is
//! missing, and the client must resend that frame and everything after
//! it, byte for byte.
//!
//! To make that possible the client keeps a copy of its recent reliable
//! sends in a fixed ring of slots. Storing overwrites the oldest slot, so
//! the ring holds the last N frames and no allocation happens after the
//! slots fill. A request for a frame that has already been overwritten
//! cannot be honored; the protocol accepts that and moves on.

use std::time::Instant;

use atem_core::protocol::header::{FrameHeader, HeaderFlags, HEADER_SIZE, MAX_DATAGRAM_SIZE};
use tracing::warn;

/// One reliable frame kept for possible resend.
#[derive(Debug, Clone)]
pub struct StoredFrame {
    /// Sequence the frame went out with.
    pub sequence: u16,
    /// The complete datagram, header included. Resends reuse it verbatim.
    pub bytes: Vec<u8>,
    /// When the frame was first sent.
    pub sent_at: Instant,
}

/// Fixed-capacity ring of recently sent reliable frames.
#[derive(Debug)]
pub struct RetransmitBuffer {
    slots: Vec<Option<StoredFrame>>,
    write_index: usize,
}

impl RetransmitBuffer {
    pub fn with_capacity(capacity: usize) -> RetransmitBuffer {
        RetransmitBuffer {
            slots: vec![None; capacity.max(1)],
            write_index: 0,
        }
    }

    /// Number of frames currently retained.
    pub fn retained(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stores a copy of an outbound frame, overwriting the oldest slot
    /// once the ring is full. Frames above the datagram size limit are
    /// refused; they could never have been sent whole in the first place.
    pub fn store(&mut self, sequence: u16, bytes: &[u8]) {
        if bytes.len() > MAX_DATAGRAM_SIZE {
            warn!(
                sequence,
                size = bytes.len(),
                limit = MAX_DATAGRAM_SIZE,
                "frame too large to store for retransmission"
            );
            return;
        }
        self.slots[self.write_index] = Some(StoredFrame {
            sequence,
            bytes: bytes.to_vec(),
            sent_at: Instant::now(),
        });
        self.write_index = (self.write_index + 1) % self.slots.len();
    }

    /// Selects the frames to answer a retransmit request: the entry with
    /// sequence `from` and every retained entry after it, in sequence
    /// order. Returns nothing when `from` itself is no longer retained;
    /// resending a train with its first frame missing would only produce
    /// another gap on the peer's side.
    pub fn frames_from(&self, from: u16) -> Vec<&StoredFrame> {
        let retained: Vec<&StoredFrame> = self.slots.iter().flatten().collect();
        if !retained.iter().any(|frame| frame.sequence == from) {
            return Vec::new();
        }

        let mut selected: Vec<&StoredFrame> = retained
            .into_iter()
            .filter(|frame| frame.sequence >= from)
            .collect();
        selected.sort_unstable_by_key(|frame| frame.sequence);
        selected
    }

    /// Drops every retained frame. Called when a session ends.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.write_index = 0;
    }
}

/// Acknowledgment policy for inbound frames: anything carrying payload
/// gets an ACK, as does any header-only frame that explicitly asks.
pub fn needs_ack(header: &FrameHeader, frame_len: usize) -> bool {
    frame_len > HEADER_SIZE || header.flags.contains(HeaderFlags::ACK_REQUEST)
}
