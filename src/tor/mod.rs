//! Tor integration
//!
//! The crawler never manages the Tor process itself. It needs two things
//! from a running Tor:
//! - a SOCKS5 proxy every request is routed through
//! - a control port to request a fresh circuit when the current exit is
//!   failing or blocked

mod control;
mod proxy;
mod rotator;

pub use control::{ControlAuth, TorControl};
pub use proxy::{probe_proxy, verify_tor_routing};
pub use rotator::CircuitRotator;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from the Tor control port
///
/// None of these are fatal for a crawl; a failed rotation is logged and the
/// current circuit keeps being used.
#[derive(Debug, Error)]
pub enum TorError {
    #[error("Failed to connect to control port {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("Failed to read control auth cookie {path}: {source}")]
    Cookie {
        path: String,
        source: std::io::Error,
    },

    #[error("Control port replied {code}: {message}")]
    Rejected { code: String, message: String },

    #[error("Malformed control reply: {0:?}")]
    Protocol(String),

    #[error("Control connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Control port did not answer within {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can switch the crawler onto a new Tor circuit
#[async_trait]
pub trait CircuitControl: Send + Sync {
    async fn new_circuit(&self) -> Result<(), TorError>;
}
