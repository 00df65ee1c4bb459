//! ATEM control client application entry point.
//!
//! Loads the TOML configuration, opens the UDP transport, connects to
//! the switcher, and drives the engine tick until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()              -- TOML, defaults when absent
//!  └─ UdpTransport::connect()    -- ephemeral local port -> switcher:9910
//!  └─ SwitcherConnection
//!       ├─ connect()             -- blocking handshake, one attempt
//!       └─ poll() every 10 ms    -- receive / heartbeat / liveness
//! ```
//!
//! The engine is synchronous; tokio only supplies the 10 ms interval and
//! the Ctrl-C future. State changes arrive through `LoggingHandler`,
//! which writes them to the log, making the binary a wire monitor as
//! much as a controller.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use atem_client::config::load_config;
use atem_client::connection::SwitcherConnection;
use atem_client::events::{ConnectionState, SwitcherHandler};
use atem_client::transport::UdpTransport;

/// Writes every notification to the log.
struct LoggingHandler;

impl SwitcherHandler for LoggingHandler {
    fn connection_state_changed(&mut self, state: ConnectionState) {
        info!(?state, "connection state changed");
    }

    fn program_input_changed(&mut self, source: u16) {
        info!(source, "program bus changed");
    }

    fn preview_input_changed(&mut self, source: u16) {
        info!(source, "preview bus changed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "atem-client.toml".to_string());
    let config = load_config(Path::new(&config_path)).context("loading configuration")?;

    // Initialise structured logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    info!(config = %config_path, "ATEM control client starting");

    // ── Transport ─────────────────────────────────────────────────────────────
    let addr = config
        .switcher_addr()
        .context("resolving switcher address")?;
    let transport = Arc::new(UdpTransport::connect(addr).context("opening control socket")?);
    info!(switcher = %addr, local = ?transport.local_addr().ok(), "control socket open");

    // ── Session ───────────────────────────────────────────────────────────────
    let mut conn = SwitcherConnection::new(transport, config.connection());
    conn.set_handler(Box::new(LoggingHandler));
    conn.connect().context("connecting to the switcher")?;

    // ── Tick loop ─────────────────────────────────────────────────────────────
    let mut tick = tokio::time::interval(Duration::from_millis(10));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = conn.poll() {
                    warn!(error = %e, "engine tick error");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    conn.disconnect();
    info!("ATEM control client stopped");
    Ok(())
}
