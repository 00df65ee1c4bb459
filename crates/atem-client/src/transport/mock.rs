//! Mock transport for engine tests.
//!
//! # Why a mock transport?
//!
//! The real transport needs a switcher (or at least a UDP peer) on the
//! other end, and what it carries disappears into the network. The
//! `MockTransport` replaces the socket with two in-memory queues:
//!
//! - Every frame the engine sends is appended to `sent`, so tests can
//!   assert exact byte images and ordering.
//! - Tests preload `inbound` with synthetic switcher frames; the engine's
//!   next receives drain them front first.
//!
//! # `fail_sends` flag
//!
//! Construct with [`MockTransport::failing`] to make every send fail,
//! or flip `set_fail_sends` mid-test to break the link after a
//! successful handshake, for exercising the engine's error paths
//! without a broken network.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::DatagramTransport;

/// A transport that records sends and replays queued inbound frames.
///
/// Records live in `Mutex` fields so tests can share the mock with the
/// engine through an `Arc` and inspect it afterwards.
#[derive(Default)]
pub struct MockTransport {
    /// Every frame the engine sent, in order.
    pub sent: Mutex<Vec<Vec<u8>>>,
    /// Frames waiting for the engine, delivered front first.
    pub inbound: Mutex<VecDeque<Vec<u8>>>,
    /// While `true`, every send fails with `BrokenPipe`.
    pub fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> MockTransport {
        MockTransport::default()
    }

    pub fn failing() -> MockTransport {
        MockTransport {
            fail_sends: AtomicBool::new(true),
            ..MockTransport::default()
        }
    }

    /// Turns send failure on or off for subsequent sends.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Queues a frame for the engine's next receive.
    pub fn push_inbound(&self, frame: &[u8]) {
        self.inbound.lock().unwrap().push_back(frame.to_vec());
    }

    /// Number of frames the engine has sent.
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Copy of the index-th sent frame. Panics if out of range, which in
    /// a test is the assertion failing.
    pub fn sent_frame(&self, index: usize) -> Vec<u8> {
        self.sent.lock().unwrap()[index].clone()
    }

    /// Copies of all sent frames, in order.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    /// Forgets recorded sends, keeping queued inbound frames.
    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl DatagramTransport for MockTransport {
    fn send(&self, frame: &[u8]) -> io::Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock send failure"));
        }
        self.sent.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.inbound.lock().unwrap().pop_front() {
            Some(frame) => {
                let len = frame.len().min(buf.len());
                buf[..len].copy_from_slice(&frame[..len]);
                Ok(Some(len))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_records_frames_in_order() {
        let mock = MockTransport::new();
        mock.send(&[1]).unwrap();
        mock.send(&[2, 2]).unwrap();

        assert_eq!(mock.sent_count(), 2);
        assert_eq!(mock.sent_frame(0), vec![1]);
        assert_eq!(mock.sent_frame(1), vec![2, 2]);
    }

    #[test]
    fn test_recv_drains_inbound_front_first() {
        let mock = MockTransport::new();
        mock.push_inbound(&[1, 1]);
        mock.push_inbound(&[2]);

        let mut buf = [0u8; 16];
        assert_eq!(mock.recv(&mut buf).unwrap(), Some(2));
        assert_eq!(&buf[..2], &[1, 1]);
        assert_eq!(mock.recv(&mut buf).unwrap(), Some(1));
        assert_eq!(mock.recv(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_failing_mock_rejects_sends() {
        let mock = MockTransport::failing();
        let err = mock.send(&[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(mock.sent_count(), 0);
    }

    #[test]
    fn test_fail_sends_toggles_mid_test() {
        let mock = MockTransport::new();
        mock.send(&[1]).unwrap();

        mock.set_fail_sends(true);
        assert!(mock.send(&[2]).is_err());

        mock.set_fail_sends(false);
        mock.send(&[3]).unwrap();
        assert_eq!(mock.sent_count(), 2);
    }

    #[test]
    fn test_recv_truncates_to_buffer_size() {
        let mock = MockTransport::new();
        mock.push_inbound(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(mock.recv(&mut buf).unwrap(), Some(3));
        assert_eq!(buf, [1, 2, 3]);
    }
}
