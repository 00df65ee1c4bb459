//! TOML-based configuration for the client application.
//!
//! The binary reads one config file (path given on the command line,
//! `atem-client.toml` by default) shaped like:
//!
//! ```toml
//! [client]
//! log_level = "info"
//!
//! [switcher]
//! host = "192.168.10.240"
//! port = 9910
//!
//! [session]
//! handshake_timeout_ms = 5000
//! heartbeat_interval_ms = 500
//! inbound_timeout_ms = 5000
//! retransmit_capacity = 100
//! ```
//!
//! Every field is optional: fields annotated `#[serde(default = "fn")]`
//! fall back to the values above, and a missing file yields the full
//! default configuration so the client runs unconfigured against a
//! factory-addressed switcher.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The switcher host/port did not resolve to an address.
    #[error("could not resolve switcher address {host}:{port}: {source}")]
    AddressResolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
}

// ── Engine tuning ─────────────────────────────────────────────────────────────

/// Timing and capacity knobs the connection engine runs on.
///
/// The defaults match the switcher's expectations: it drops sessions
/// after about five seconds of client silence, so the heartbeat interval
/// must sit well inside the inbound timeout.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// How long `connect()` waits for the handshake response.
    pub handshake_timeout: Duration,
    /// Gap between keepalive heartbeats while connected.
    pub heartbeat_interval: Duration,
    /// Inbound silence after which the session counts as lost.
    pub inbound_timeout: Duration,
    /// Slots in the retransmission ring.
    pub retransmit_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            handshake_timeout: Duration::from_millis(5000),
            heartbeat_interval: Duration::from_millis(500),
            inbound_timeout: Duration::from_millis(5000),
            retransmit_capacity: 100,
        }
    }
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub switcher: SwitcherConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// General client behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` overrides this when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which switcher to talk to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitcherConfig {
    /// Hostname or IP of the switcher. The default is the factory
    /// address the devices ship with.
    #[serde(default = "default_host")]
    pub host: String,
    /// UDP control port. Fixed at 9910 on every model; configurable for
    /// test rigs only.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Session timing and reliability settings, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_inbound_timeout_ms")]
    pub inbound_timeout_ms: u64,
    #[serde(default = "default_retransmit_capacity")]
    pub retransmit_capacity: usize,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "192.168.10.240".to_string()
}
fn default_port() -> u16 {
    atem_core::protocol::CONTROL_PORT
}
fn default_handshake_timeout_ms() -> u64 {
    5000
}
fn default_heartbeat_interval_ms() -> u64 {
    500
}
fn default_inbound_timeout_ms() -> u64 {
    5000
}
fn default_retransmit_capacity() -> usize {
    100
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for SwitcherConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            inbound_timeout_ms: default_inbound_timeout_ms(),
            retransmit_capacity: default_retransmit_capacity(),
        }
    }
}

impl AppConfig {
    /// The engine tuning derived from the `[session]` table.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            handshake_timeout: Duration::from_millis(self.session.handshake_timeout_ms),
            heartbeat_interval: Duration::from_millis(self.session.heartbeat_interval_ms),
            inbound_timeout: Duration::from_millis(self.session.inbound_timeout_ms),
            retransmit_capacity: self.session.retransmit_capacity,
        }
    }

    /// Resolves the `[switcher]` host and port to a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AddressResolve`] when the host does not
    /// resolve.
    pub fn switcher_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.switcher.host.as_str();
        let port = self.switcher.port;
        (host, port)
            .to_socket_addrs()
            .map_err(|source| ConfigError::AddressResolve {
                host: host.to_string(),
                port,
                source,
            })?
            .next()
            .ok_or_else(|| ConfigError::AddressResolve {
                host: host.to_string(),
                port,
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"),
            })
    }
}

/// Loads [`AppConfig`] from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
