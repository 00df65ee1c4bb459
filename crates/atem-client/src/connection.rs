//! SwitcherConnection: the connection engine driving one control session.
//!
//! Everything the protocol needs at runtime happens inside two calls:
//! `connect()` performs the handshake, and `poll()` runs one tick of
//! receive, heartbeat, liveness, and notification work. The caller is
//! expected to invoke `poll()` roughly every 10 ms; nothing here spawns
//! threads or holds locks.
//!
//! # Session lifecycle
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──handshake──► Connected
//!       ▲                          │                        │
//!       │                       timeout              inbound silence
//!       │                          ▼                        ▼
//!       └──────disconnect()────── Error ◄───────────────────┘
//! ```
//!
//! `disconnect()` returns to `Disconnected` from any state. `Error` is
//! sticky until the caller disconnects or reconnects; reconnection
//! policy stays with the caller.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use atem_core::protocol::command::{CommandReader, ControlCommand, StateCommand};
use atem_core::protocol::header::{
    encode_ack, encode_header, FrameHeader, HeaderFlags, HEADER_SIZE, HELLO_FRAME,
    MAX_DATAGRAM_SIZE,
};
use atem_core::{StateStore, SwitcherState};

use crate::config::ConnectionConfig;
use crate::events::{ConnectionState, NoopHandler, SwitcherHandler};
use crate::reliability::{needs_ack, RetransmitBuffer};
use crate::session::SessionContext;
use crate::transport::DatagramTransport;

/// Sleep between transport checks while waiting for the handshake reply.
const HANDSHAKE_POLL: Duration = Duration::from_millis(10);

/// Error type for `connect()`.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The switcher never answered the hello. Single attempt; retrying
    /// is the caller's call.
    #[error("no handshake response from the switcher within {0:?}")]
    HandshakeTimeout(Duration),

    /// The transport failed while sending or receiving.
    #[error("transport error during connect: {0}")]
    Transport(#[from] io::Error),
}

/// Error type for control operations and `poll()`.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The session is not in the Connected state.
    #[error("not connected to a switcher")]
    NotConnected,

    /// The transport failed to send. The frame stays in the
    /// retransmission ring; there is no automatic retry.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The operation's wire format is not implemented. Carries the tag
    /// the command would use.
    #[error("operation not supported by this client (wire tag {0})")]
    Unsupported(&'static str),
}

/// One control session with a switcher.
///
/// Owns the session bookkeeping, the retransmission ring, the mirrored
/// switcher state, and the handler receiving change notifications. All
/// methods are synchronous; callers needing concurrency serialize
/// externally.
///
/// ```rust
/// use std::sync::Arc;
/// use atem_client::config::ConnectionConfig;
/// use atem_client::connection::SwitcherConnection;
/// use atem_client::transport::MockTransport;
///
/// let transport = Arc::new(MockTransport::new());
/// let mut conn = SwitcherConnection::new(transport, ConnectionConfig::default());
/// assert!(!conn.is_connected());
/// ```
pub struct SwitcherConnection {
    transport: Arc<dyn DatagramTransport>,
    config: ConnectionConfig,
    state: ConnectionState,
    session: SessionContext,
    retransmit: RetransmitBuffer,
    store: StateStore,
    handler: Box<dyn SwitcherHandler>,
}

impl SwitcherConnection {
    /// Creates a disconnected engine over the given transport.
    pub fn new(transport: Arc<dyn DatagramTransport>, config: ConnectionConfig) -> Self {
        let retransmit = RetransmitBuffer::with_capacity(config.retransmit_capacity);
        SwitcherConnection {
            transport,
            config,
            state: ConnectionState::Disconnected,
            session: SessionContext::new(),
            retransmit,
            store: StateStore::new(),
            handler: Box::new(NoopHandler),
        }
    }

    /// Installs the handler that receives change notifications. Replaces
    /// the previous one.
    pub fn set_handler(&mut self, handler: Box<dyn SwitcherHandler>) {
        self.handler = handler;
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Performs the handshake: sends the hello frame, then polls the
    /// transport in a 10 ms sleep/check cycle until the switcher assigns
    /// a session id or the handshake timeout passes.
    ///
    /// Blocks for up to `handshake_timeout`. One attempt, no retry.
    ///
    /// # Errors
    ///
    /// [`ConnectError::Transport`] if the transport fails,
    /// [`ConnectError::HandshakeTimeout`] if the switcher stays silent.
    /// Both leave the engine in the Error state.
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        self.session = SessionContext::new();
        self.retransmit.clear();
        self.state = ConnectionState::Connecting;

        debug!("sending handshake hello");
        if let Err(e) = self.transport.send(&HELLO_FRAME) {
            error!(error = %e, "hello send failed");
            self.state = ConnectionState::Error;
            return Err(ConnectError::Transport(e));
        }
        // The hello itself carries the bootstrap sequence; data frames
        // restart at 1.
        self.session.reset_data_sequence();

        let deadline = Instant::now() + self.config.handshake_timeout;
        while Instant::now() < deadline {
            match self.receive_once() {
                Ok(true) => {
                    if self.state == ConnectionState::Connected {
                        info!(session_id = self.session.session_id(), "session established");
                        return Ok(());
                    }
                }
                Ok(false) => thread::sleep(HANDSHAKE_POLL),
                Err(e) => {
                    error!(error = %e, "transport error while waiting for handshake");
                    self.state = ConnectionState::Error;
                    return Err(ConnectError::Transport(e));
                }
            }
        }

        warn!(
            timeout_ms = self.config.handshake_timeout.as_millis() as u64,
            "handshake timed out"
        );
        self.transition(ConnectionState::Error);
        Err(ConnectError::HandshakeTimeout(self.config.handshake_timeout))
    }

    /// Runs one engine tick: at most one non-blocking receive, then the
    /// heartbeat check, then the inbound-silence check, then the
    /// consolidated state notification. Call roughly every 10 ms.
    ///
    /// # Errors
    ///
    /// [`CommandError::Transport`] if the heartbeat send fails. The
    /// failure is reported only after the silence check and the state
    /// notification have run; it never cuts the tick short. Receive
    /// errors are logged and the tick continues.
    pub fn poll(&mut self) -> Result<(), CommandError> {
        if let Err(e) = self.receive_once() {
            warn!(error = %e, "transport receive error");
        }

        let mut heartbeat_failure = None;
        if self.state == ConnectionState::Connected
            && self.session.since_heartbeat() >= self.config.heartbeat_interval
        {
            let result = self.send_heartbeat();
            self.session.mark_heartbeat();
            if let Err(e) = result {
                warn!(error = %e, "heartbeat send failed");
                heartbeat_failure = Some(e);
            }
        }

        if self.state == ConnectionState::Connected
            && self.session.inbound_silence() > self.config.inbound_timeout
        {
            warn!(
                silence_ms = self.session.inbound_silence().as_millis() as u64,
                "switcher went silent, dropping the session"
            );
            self.transition(ConnectionState::Error);
        }

        if self.store.take_dirty() {
            let snapshot = self.store.snapshot();
            self.handler.state_changed(&snapshot);
        }

        match heartbeat_failure {
            Some(e) => Err(CommandError::Transport(e)),
            None => Ok(()),
        }
    }

    /// Tears the session down immediately: clears the retransmission
    /// ring, resets session bookkeeping, and transitions to Disconnected
    /// from whatever state the engine is in. No goodbye frame is sent;
    /// the switcher notices through its own timeout.
    pub fn disconnect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!("disconnecting");
        }
        self.retransmit.clear();
        self.session = SessionContext::new();
        self.transition(ConnectionState::Disconnected);
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Session id in use: peer-assigned once connected, the bootstrap
    /// value before that.
    pub fn session_id(&self) -> u16 {
        self.session.session_id()
    }

    /// Snapshot of the mirrored switcher state.
    pub fn switcher_state(&self) -> SwitcherState {
        self.store.snapshot()
    }

    /// Last-known program bus source.
    pub fn program_input(&self) -> u16 {
        self.store.program_input()
    }

    /// Last-known preview bus source.
    pub fn preview_input(&self) -> u16 {
        self.store.preview_input()
    }

    // ── Control operations ────────────────────────────────────────────────────

    /// Puts `source` on the program bus.
    ///
    /// Always transmits, even when the mirrored state already shows
    /// `source`; the switcher is the authority on whether that is a
    /// change.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotConnected`] outside the Connected state,
    /// [`CommandError::Transport`] if the send fails.
    pub fn change_program_input(&mut self, source: u16) -> Result<(), CommandError> {
        self.send_control(ControlCommand::ProgramInput(source))
    }

    /// Puts `source` on the preview bus.
    ///
    /// # Errors
    ///
    /// Same as [`SwitcherConnection::change_program_input`].
    pub fn change_preview_input(&mut self, source: u16) -> Result<(), CommandError> {
        self.send_control(ControlCommand::PreviewInput(source))
    }

    /// Swaps program and preview immediately.
    ///
    /// # Errors
    ///
    /// Same as [`SwitcherConnection::change_program_input`].
    pub fn cut(&mut self) -> Result<(), CommandError> {
        self.send_control(ControlCommand::Cut)
    }

    /// Runs the switcher's configured transition between preview and
    /// program.
    ///
    /// # Errors
    ///
    /// Same as [`SwitcherConnection::change_program_input`].
    pub fn auto_transition(&mut self) -> Result<(), CommandError> {
        self.send_control(ControlCommand::AutoTransition)
    }

    // ── Unimplemented device features ─────────────────────────────────────────
    //
    // The wire tags below are known from packet captures, but their
    // argument layouts are unverified on real hardware. Each surfaces an
    // explicit error naming the tag instead of sending a guessed
    // encoding or silently doing nothing.

    /// Fade-to-black toggle.
    pub fn fade_to_black(&mut self) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("FtbS"))
    }

    /// Fade-to-black rate in frames.
    pub fn set_fade_to_black_rate(&mut self, _frames: u8) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("FtbP"))
    }

    /// Manual transition slider position.
    pub fn set_transition_position(&mut self, _position: u16) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CTPs"))
    }

    /// Preview-transition toggle.
    pub fn set_preview_transition(&mut self, _enabled: bool) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CTPr"))
    }

    /// AUX bus routing.
    pub fn set_aux_source(&mut self, _aux: u8, _source: u16) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CAuS"))
    }

    /// Downstream keyer on-air state.
    pub fn set_downstream_key_on_air(
        &mut self,
        _keyer: u8,
        _on_air: bool,
    ) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CDsL"))
    }

    /// Downstream keyer auto transition.
    pub fn downstream_key_auto(&mut self, _keyer: u8) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("DDsA"))
    }

    /// Upstream keyer on-air state.
    pub fn set_upstream_key_on_air(
        &mut self,
        _keyer: u8,
        _on_air: bool,
    ) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CKOn"))
    }

    /// Upstream keyer cut (key) source.
    pub fn set_upstream_key_cut_source(
        &mut self,
        _keyer: u8,
        _source: u16,
    ) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CKeC"))
    }

    /// Upstream keyer fill source.
    pub fn set_upstream_key_fill_source(
        &mut self,
        _keyer: u8,
        _source: u16,
    ) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CKeF"))
    }

    /// Color generator hue/saturation/luma.
    pub fn set_color_generator(
        &mut self,
        _generator: u8,
        _hue: u16,
        _saturation: u16,
        _luma: u16,
    ) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CClV"))
    }

    /// Media player still selection.
    pub fn set_media_player_source(&mut self, _player: u8, _still: u8) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("MPCS"))
    }

    /// Multiviewer window source routing.
    pub fn set_multiviewer_window_source(
        &mut self,
        _window: u8,
        _source: u16,
    ) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CMvI"))
    }

    /// Per-input audio gain.
    pub fn set_audio_input_gain(&mut self, _input: u16, _gain: i16) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CAIP"))
    }

    /// Master audio gain.
    pub fn set_audio_master_gain(&mut self, _gain: i16) -> Result<(), CommandError> {
        Err(CommandError::Unsupported("CAMP"))
    }

    // ── Outbound path ─────────────────────────────────────────────────────────

    fn send_control(&mut self, command: ControlCommand) -> Result<(), CommandError> {
        if self.state != ConnectionState::Connected {
            warn!(?command, "command rejected, not connected");
            return Err(CommandError::NotConnected);
        }
        debug!(?command, "sending control command");
        let block = command.encode_block();
        self.send_reliable(&block).map_err(|e| {
            error!(error = %e, ?command, "command send failed");
            CommandError::Transport(e)
        })
    }

    /// Header-only keepalive, sequenced and ring-stored like any other
    /// reliable frame.
    fn send_heartbeat(&mut self) -> io::Result<()> {
        debug!("heartbeat");
        self.send_reliable(&[])
    }

    /// The single reliable-send path: assign a sequence, frame, store in
    /// the ring, transmit. The counter advances whether or not the
    /// transmit succeeds, so a lost send never reuses its sequence.
    fn send_reliable(&mut self, payload: &[u8]) -> io::Result<()> {
        let sequence = self.session.next_sequence();
        let total = HEADER_SIZE + payload.len();
        let mut frame = Vec::with_capacity(total);
        frame.extend_from_slice(&encode_header(
            HeaderFlags(HeaderFlags::ACK_REQUEST),
            total as u16,
            self.session.session_id(),
            sequence,
        ));
        frame.extend_from_slice(payload);
        self.retransmit.store(sequence, &frame);
        self.transport.send(&frame)
    }

    fn send_ack(&self, acked_sequence: u16) -> io::Result<()> {
        let frame = encode_ack(self.session.session_id(), acked_sequence);
        self.transport.send(&frame)
    }

    // ── Inbound path ──────────────────────────────────────────────────────────

    /// Pulls at most one datagram off the transport and processes it.
    /// Returns whether a datagram was consumed.
    fn receive_once(&mut self) -> io::Result<bool> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = match self.transport.recv(&mut buf)? {
            Some(len) => len,
            None => return Ok(false),
        };
        self.handle_frame(&buf[..len]);
        Ok(true)
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        let header = match FrameHeader::parse(frame) {
            Ok(header) => header,
            Err(e) => {
                debug!(error = %e, len = frame.len(), "dropping runt datagram");
                return;
            }
        };
        self.session.mark_inbound();

        if usize::from(header.declared_len) != frame.len() {
            warn!(
                declared = header.declared_len,
                actual = frame.len(),
                "declared frame length disagrees with datagram size"
            );
        }

        // Handshake completion: the switcher assigns the real session id.
        if self.state == ConnectionState::Connecting
            && header.flags.contains(HeaderFlags::NEW_SESSION_ID)
        {
            self.session.adopt_session_id(header.session_id);
            self.session.mark_heartbeat();
            if header.sequence > 0 {
                if let Err(e) = self.send_ack(header.sequence) {
                    warn!(error = %e, "handshake ack send failed");
                }
                self.session.observe_remote_sequence(header.sequence);
            }
            self.transition(ConnectionState::Connected);
            return;
        }

        // The switcher can reassign the session mid-stream.
        if self.state == ConnectionState::Connected && header.session_id != self.session.session_id()
        {
            info!(
                old = self.session.session_id(),
                new = header.session_id,
                "switcher reassigned the session id"
            );
            self.session.adopt_session_id(header.session_id);
        }

        self.session.observe_remote_sequence(header.sequence);

        if header.flags.contains(HeaderFlags::RETRANSMIT_REQUEST) {
            self.handle_retransmit_request(header.resend_from, header.sequence);
            return;
        }

        // Inbound acks need nothing from us; the ring keeps frames until
        // overwritten regardless of what the peer has confirmed.
        if needs_ack(&header, frame.len()) {
            if let Err(e) = self.send_ack(header.sequence) {
                warn!(error = %e, "ack send failed");
            }
        }

        if frame.len() > HEADER_SIZE {
            self.apply_payload(&frame[HEADER_SIZE..]);
        }
    }

    /// Resends every retained frame from `from` onward in sequence
    /// order, then acknowledges the request frame itself. A `from` older
    /// than the ring's history means the gap is unrecoverable; the
    /// switcher gets the ack alone and deals with the loss.
    fn handle_retransmit_request(&self, from: u16, request_sequence: u16) {
        let frames = self.retransmit.frames_from(from);
        if frames.is_empty() {
            warn!(from, "retransmit request for sequences no longer retained");
        } else {
            info!(from, count = frames.len(), "resending frames");
            for stored in frames {
                debug!(
                    sequence = stored.sequence,
                    age_ms = stored.sent_at.elapsed().as_millis() as u64,
                    "resending frame"
                );
                if let Err(e) = self.transport.send(&stored.bytes) {
                    warn!(error = %e, sequence = stored.sequence, "resend failed");
                }
            }
        }
        if let Err(e) = self.send_ack(request_sequence) {
            warn!(error = %e, "retransmit-request ack send failed");
        }
    }

    /// Walks the command blocks in a frame payload and applies the ones
    /// this client mirrors.
    fn apply_payload(&mut self, payload: &[u8]) {
        for block in CommandReader::new(payload) {
            match StateCommand::decode(&block) {
                Some(StateCommand::ProgramInput { source }) => {
                    if self.store.apply_program_input(source) {
                        self.handler.program_input_changed(source);
                    }
                }
                Some(StateCommand::PreviewInput { source }) => {
                    if self.store.apply_preview_input(source) {
                        self.handler.preview_input_changed(source);
                    }
                }
                None => {
                    if !StateCommand::handles(block.tag) {
                        debug!(
                            tag = block.tag_str(),
                            len = block.payload.len(),
                            "skipping unhandled command block"
                        );
                    }
                }
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        debug!(from = ?self.state, to = ?next, "connection state change");
        self.state = next;
        self.handler.connection_state_changed(next);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
