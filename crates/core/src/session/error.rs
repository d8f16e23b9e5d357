use std::io;

use thiserror::Error;

/// Failures that end or prevent a session. Everything recoverable is logged
/// inside dispatch instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("could not resolve {0}")]
    AddressResolution(String),
    #[error("session is not connected")]
    NotConnected,
}
