//! Integration tests for the connection engine over a mock transport.
//!
//! # Purpose
//!
//! These tests drive `SwitcherConnection` through its *public* API the
//! way the binary does, with a `MockTransport` standing in for the
//! switcher. They verify:
//!
//! - The happy path: handshake, state mirroring from inbound reports,
//!   and operator commands going out as sequenced reliable frames.
//! - The reliability layer: heartbeats, peer-driven retransmission from
//!   the history ring, and acknowledgment of the request frame.
//! - The error paths: handshake timeout, hello send failure, and the
//!   inbound-silence watchdog, each leaving the engine in Error exactly
//!   once.
//!
//! # What does the handshake look like?
//!
//! ```text
//! Client                                  Switcher
//! ──────                                  ────────
//! connect()
//!   send 20-byte hello (session 0x53AB)
//!                                         assign a session id
//!                                   ◄──── header, NewSessionId flag
//!   adopt session id
//!   ack the switcher's sequence
//!   state -> Connected
//!                                   ◄──── full state dump (PrgI, PrvI, …)
//!   mirror state, fire hooks
//! ```
//!
//! Frames the switcher sends are synthesised here with the same codec
//! the engine uses, so every byte offset in these tests doubles as wire
//! documentation.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use atem_client::config::{AppConfig, ConnectionConfig};
use atem_client::connection::{CommandError, ConnectError, SwitcherConnection};
use atem_client::events::{ConnectionState, SwitcherHandler};
use atem_client::transport::MockTransport;
use atem_core::protocol::command::tags;
use atem_core::protocol::header::{
    encode_ack, encode_header, FrameHeader, HeaderFlags, HEADER_SIZE, HELLO_FRAME,
};
use atem_core::SwitcherState;

// ── Test fixtures ─────────────────────────────────────────────────────────────

/// Handler that records every notification for later assertions. Clones
/// share the same underlying recorders, so a clone can go into the
/// engine while the test keeps the original.
#[derive(Default, Clone)]
struct Recorder {
    states: Arc<Mutex<Vec<ConnectionState>>>,
    program_changes: Arc<Mutex<Vec<u16>>>,
    preview_changes: Arc<Mutex<Vec<u16>>>,
    snapshots: Arc<Mutex<Vec<SwitcherState>>>,
}

impl Recorder {
    fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().unwrap().clone()
    }

    fn program_changes(&self) -> Vec<u16> {
        self.program_changes.lock().unwrap().clone()
    }

    fn preview_changes(&self) -> Vec<u16> {
        self.preview_changes.lock().unwrap().clone()
    }

    fn snapshot_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

impl SwitcherHandler for Recorder {
    fn connection_state_changed(&mut self, state: ConnectionState) {
        self.states.lock().unwrap().push(state);
    }

    fn program_input_changed(&mut self, source: u16) {
        self.program_changes.lock().unwrap().push(source);
    }

    fn preview_input_changed(&mut self, source: u16) {
        self.preview_changes.lock().unwrap().push(source);
    }

    fn state_changed(&mut self, state: &SwitcherState) {
        self.snapshots.lock().unwrap().push(*state);
    }
}

fn quiet_config() -> ConnectionConfig {
    ConnectionConfig {
        handshake_timeout: Duration::from_millis(200),
        heartbeat_interval: Duration::from_secs(60),
        inbound_timeout: Duration::from_secs(60),
        retransmit_capacity: 16,
    }
}

/// Header-only frame with the NewSessionId flag, the switcher's answer
/// to the hello.
fn hello_reply(session_id: u16, sequence: u16) -> Vec<u8> {
    encode_header(
        HeaderFlags(HeaderFlags::NEW_SESSION_ID),
        HEADER_SIZE as u16,
        session_id,
        sequence,
    )
    .to_vec()
}

/// Sequenced data frame carrying command blocks.
fn data_frame(session_id: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let total = (HEADER_SIZE + payload.len()) as u16;
    let mut frame = encode_header(
        HeaderFlags(HeaderFlags::ACK_REQUEST),
        total,
        session_id,
        sequence,
    )
    .to_vec();
    frame.extend_from_slice(payload);
    frame
}

/// Header-only retransmit request: resend from `from`, own sequence
/// `sequence` at bytes 10–11.
fn retransmit_request(session_id: u16, from: u16, sequence: u16) -> Vec<u8> {
    let mut frame = encode_header(
        HeaderFlags(HeaderFlags::RETRANSMIT_REQUEST),
        HEADER_SIZE as u16,
        session_id,
        sequence,
    )
    .to_vec();
    frame[6..8].copy_from_slice(&from.to_be_bytes());
    frame
}

/// 12-byte bus report block as the switcher announces program/preview
/// changes: mix effect index at payload bytes 0–1 (always 0 here), the
/// source id big-endian at bytes 2–3.
fn bus_block(tag: [u8; 4], source: u16) -> Vec<u8> {
    let mut block = vec![0u8; 12];
    block[1] = 12;
    block[4..8].copy_from_slice(&tag);
    block[10..12].copy_from_slice(&source.to_be_bytes());
    block
}

/// Connected engine with a recorder installed. The switcher side is the
/// returned mock; session id is 0x8001 and its hello reply used
/// sequence 1, so switcher frames in the test body continue from 2.
fn connected_engine(
    config: ConnectionConfig,
) -> (SwitcherConnection, Arc<MockTransport>, Recorder) {
    let transport = Arc::new(MockTransport::new());
    let mut conn = SwitcherConnection::new(transport.clone(), config);
    let recorder = Recorder::default();
    conn.set_handler(Box::new(recorder.clone()));

    transport.push_inbound(&hello_reply(0x8001, 1));
    conn.connect().expect("handshake must succeed");
    transport.clear_sent();
    (conn, transport, recorder)
}

// ── Handshake ─────────────────────────────────────────────────────────────────

/// Tests the complete happy-path handshake: the engine sends exactly the
/// 20-byte hello literal, adopts the session id the switcher assigns,
/// acknowledges the switcher's sequence, and fires the Connected hook
/// exactly once.
#[test]
fn test_full_handshake_establishes_a_session() {
    let transport = Arc::new(MockTransport::new());
    let mut conn = SwitcherConnection::new(transport.clone(), quiet_config());
    let recorder = Recorder::default();
    conn.set_handler(Box::new(recorder.clone()));

    transport.push_inbound(&hello_reply(0x1234, 1));
    conn.connect().expect("handshake must succeed");

    assert!(conn.is_connected());
    assert_eq!(conn.session_id(), 0x1234);
    assert_eq!(
        transport.sent_frame(0),
        HELLO_FRAME.to_vec(),
        "the hello must go out byte-identical to the protocol literal"
    );
    assert_eq!(
        transport.sent_frame(1),
        encode_ack(0x1234, 1).to_vec(),
        "the handshake reply must be acknowledged under the adopted session id"
    );
    assert_eq!(recorder.states(), vec![ConnectionState::Connected]);
}

/// Tests that a silent switcher fails the handshake: `connect()` returns
/// `HandshakeTimeout` after the configured window, the engine lands in
/// Error, and the hook fires for Error exactly once (never for
/// Connecting, which is not an announced state).
#[test]
fn test_handshake_timeout_reports_error() {
    let mut config = quiet_config();
    config.handshake_timeout = Duration::from_millis(20);
    let transport = Arc::new(MockTransport::new());
    let mut conn = SwitcherConnection::new(transport, config);
    let recorder = Recorder::default();
    conn.set_handler(Box::new(recorder.clone()));

    let result = conn.connect();

    assert!(matches!(result, Err(ConnectError::HandshakeTimeout(_))));
    assert_eq!(conn.state(), ConnectionState::Error);
    assert_eq!(recorder.states(), vec![ConnectionState::Error]);
}

/// Tests that a transport failure while sending the hello surfaces as a
/// transport error with the engine in Error, and that no state hook
/// fires: the session never got far enough to announce anything.
#[test]
fn test_hello_send_failure_reports_error_without_a_hook() {
    let transport = Arc::new(MockTransport::failing());
    let mut conn = SwitcherConnection::new(transport, quiet_config());
    let recorder = Recorder::default();
    conn.set_handler(Box::new(recorder.clone()));

    let result = conn.connect();

    assert!(matches!(result, Err(ConnectError::Transport(_))));
    assert_eq!(conn.state(), ConnectionState::Error);
    assert!(
        recorder.states().is_empty(),
        "a failed hello must not announce any state"
    );
}

// ── State mirroring ───────────────────────────────────────────────────────────

/// Tests a full production switchover as the switcher reports it: an
/// initial state dump (camera 1 on program, camera 2 on preview)
/// followed by a cut performed on the physical panel. The mirror must
/// track both updates, fire per-field hooks in arrival order, and emit
/// one consolidated snapshot per tick that changed something.
#[test]
fn test_bus_mirror_tracks_a_panel_switchover() {
    let (mut conn, transport, recorder) = connected_engine(quiet_config());

    // Initial state dump: one frame, two blocks.
    let mut dump = bus_block(tags::PROGRAM_INPUT, 1);
    dump.extend_from_slice(&bus_block(tags::PREVIEW_INPUT, 2));
    transport.push_inbound(&data_frame(0x8001, 2, &dump));
    conn.poll().expect("poll");

    assert_eq!(conn.program_input(), 1);
    assert_eq!(conn.preview_input(), 2);
    assert_eq!(recorder.snapshot_count(), 1, "one tick, one snapshot");

    // Operator presses CUT on the panel: the buses swap.
    let mut swap = bus_block(tags::PROGRAM_INPUT, 2);
    swap.extend_from_slice(&bus_block(tags::PREVIEW_INPUT, 1));
    transport.push_inbound(&data_frame(0x8001, 3, &swap));
    conn.poll().expect("poll");

    assert_eq!(conn.program_input(), 2);
    assert_eq!(conn.preview_input(), 1);
    assert_eq!(recorder.program_changes(), vec![1, 2]);
    assert_eq!(recorder.preview_changes(), vec![2, 1]);
    assert_eq!(recorder.snapshot_count(), 2);
}

/// Tests an operator command round trip: `change_preview_input` goes out
/// as a 24-byte CPvI frame, and when the switcher confirms with a PrvI
/// report the mirror and the hooks update. The mirror never updates
/// speculatively on send.
#[test]
fn test_operator_command_round_trip() {
    let (mut conn, transport, recorder) = connected_engine(quiet_config());

    conn.change_preview_input(4).expect("send");
    assert_eq!(
        conn.preview_input(),
        0,
        "sending alone must not touch the mirror; the switcher confirms"
    );

    let command = transport.sent_frame(0);
    assert_eq!(command.len(), 24);
    assert_eq!(&command[16..20], b"CPvI");
    assert_eq!(&command[22..24], &4u16.to_be_bytes());

    // The switcher applies it and reports the new preview source.
    transport.push_inbound(&data_frame(0x8001, 2, &bus_block(tags::PREVIEW_INPUT, 4)));
    conn.poll().expect("poll");

    assert_eq!(conn.preview_input(), 4);
    assert_eq!(recorder.preview_changes(), vec![4]);
}

/// Tests that re-delivered frames are applied again: the protocol keeps
/// no replay record, so two frames carrying the same sequence both reach
/// the state store. The second report moves the bus again and fires a
/// second hook.
#[test]
fn test_repeated_sequences_are_not_deduplicated() {
    let (mut conn, transport, recorder) = connected_engine(quiet_config());

    transport.push_inbound(&data_frame(0x8001, 2, &bus_block(tags::PROGRAM_INPUT, 3)));
    conn.poll().expect("poll");
    transport.push_inbound(&data_frame(0x8001, 2, &bus_block(tags::PROGRAM_INPUT, 5)));
    conn.poll().expect("poll");

    assert_eq!(conn.program_input(), 5);
    assert_eq!(recorder.program_changes(), vec![3, 5]);
}

// ── Reliability ───────────────────────────────────────────────────────────────

/// Tests peer-driven retransmission end to end: after three commands,
/// the switcher reports it lost everything from the second one. The
/// engine must resend sequences 2 and 3 byte-identical to the originals
/// and then acknowledge the request frame itself, exactly once.
#[test]
fn test_lost_frames_are_served_from_history() {
    let (mut conn, transport, _recorder) = connected_engine(quiet_config());

    conn.change_program_input(1).expect("send");
    conn.change_program_input(2).expect("send");
    conn.change_program_input(3).expect("send");
    let originals = transport.sent_frames();
    transport.clear_sent();

    transport.push_inbound(&retransmit_request(0x8001, 2, 7));
    conn.poll().expect("poll");

    let frames = transport.sent_frames();
    assert_eq!(frames.len(), 3, "two resends plus one ack");
    assert_eq!(frames[0], originals[1]);
    assert_eq!(frames[1], originals[2]);
    assert_eq!(frames[2], encode_ack(0x8001, 7).to_vec());
}

/// Tests the unrecoverable-history case: a retransmit request for a
/// sequence the ring no longer retains resends nothing, but the request
/// frame still gets its ack so the switcher is not left waiting.
#[test]
fn test_history_loss_still_acknowledges_the_request() {
    let mut config = quiet_config();
    config.retransmit_capacity = 2;
    let (mut conn, transport, _recorder) = connected_engine(config);

    // Three sends through a two-slot ring evict sequence 1.
    conn.change_program_input(1).expect("send");
    conn.change_program_input(2).expect("send");
    conn.change_program_input(3).expect("send");
    transport.clear_sent();

    transport.push_inbound(&retransmit_request(0x8001, 1, 9));
    conn.poll().expect("poll");

    assert_eq!(
        transport.sent_frames(),
        vec![encode_ack(0x8001, 9).to_vec()],
        "evicted history must yield the ack alone"
    );
}

/// Tests that heartbeats keep flowing between commands and share the
/// sequence space with them: two keepalives take sequences 1 and 2, and
/// the next command continues at 3.
#[test]
fn test_heartbeats_share_the_sequence_space_with_commands() {
    let mut config = quiet_config();
    config.heartbeat_interval = Duration::from_millis(5);
    let (mut conn, transport, _recorder) = connected_engine(config);

    thread::sleep(Duration::from_millis(8));
    conn.poll().expect("poll");
    thread::sleep(Duration::from_millis(8));
    conn.poll().expect("poll");
    conn.change_program_input(1000).expect("send");

    let sequences: Vec<u16> = transport
        .sent_frames()
        .iter()
        .map(|f| FrameHeader::parse(f).unwrap().sequence)
        .collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let heartbeat = transport.sent_frame(0);
    assert_eq!(heartbeat.len(), HEADER_SIZE, "keepalives are header-only");
    assert_eq!(&heartbeat[0..2], &[0x08, 0x0C]);
}

// ── Liveness and teardown ─────────────────────────────────────────────────────

/// Tests the inbound-silence watchdog: once the switcher stops talking
/// for longer than the timeout, the engine drops to Error and announces
/// it exactly once, no matter how many further ticks run.
#[test]
fn test_silence_drops_the_session_exactly_once() {
    let mut config = quiet_config();
    config.inbound_timeout = Duration::from_millis(5);
    let (mut conn, _transport, recorder) = connected_engine(config);

    thread::sleep(Duration::from_millis(10));
    conn.poll().expect("poll");
    conn.poll().expect("poll");
    conn.poll().expect("poll");

    assert_eq!(conn.state(), ConnectionState::Error);
    assert_eq!(
        recorder.states(),
        vec![ConnectionState::Connected, ConnectionState::Error],
        "the Error announcement must not repeat"
    );
}

/// Tests the teardown lifecycle: disconnect announces Disconnected,
/// commands are refused afterwards, and a second disconnect stays
/// silent because the state does not change.
#[test]
fn test_disconnect_lifecycle() {
    let (mut conn, _transport, recorder) = connected_engine(quiet_config());

    conn.disconnect();
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(matches!(
        conn.change_program_input(1),
        Err(CommandError::NotConnected)
    ));

    conn.disconnect();
    assert_eq!(
        recorder.states(),
        vec![ConnectionState::Connected, ConnectionState::Disconnected],
        "repeating disconnect must not repeat the announcement"
    );
}

// ── Extension points and configuration ────────────────────────────────────────

/// Tests that unimplemented device features fail loudly with the wire
/// tag they would use, rather than silently doing nothing or sending a
/// guessed encoding.
#[test]
fn test_unsupported_features_fail_loudly() {
    let transport = Arc::new(MockTransport::new());
    let mut conn = SwitcherConnection::new(transport.clone(), quiet_config());

    assert!(matches!(
        conn.fade_to_black(),
        Err(CommandError::Unsupported("FtbS"))
    ));
    assert!(matches!(
        conn.set_downstream_key_on_air(0, true),
        Err(CommandError::Unsupported("CDsL"))
    ));
    assert!(matches!(
        conn.set_upstream_key_cut_source(0, 3011),
        Err(CommandError::Unsupported("CKeC"))
    ));
    assert!(matches!(
        conn.set_upstream_key_fill_source(0, 3010),
        Err(CommandError::Unsupported("CKeF"))
    ));
    assert!(matches!(
        conn.set_multiviewer_window_source(2, 1000),
        Err(CommandError::Unsupported("CMvI"))
    ));
    assert_eq!(transport.sent_count(), 0, "nothing may reach the wire");
}

/// Tests that the default application config drives the engine with the
/// protocol's expected timing: 5 s handshake and silence windows, 500 ms
/// heartbeats, a 100-frame history. Changing these affects live
/// deployments, so this test acts as a breaking-change guard.
#[test]
fn test_default_config_matches_protocol_timing() {
    let conn_cfg = AppConfig::default().connection();

    assert_eq!(conn_cfg.handshake_timeout, Duration::from_secs(5));
    assert_eq!(conn_cfg.heartbeat_interval, Duration::from_millis(500));
    assert_eq!(conn_cfg.inbound_timeout, Duration::from_secs(5));
    assert_eq!(conn_cfg.retransmit_capacity, 100);
}
