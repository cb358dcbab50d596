//! Typed error definitions for the gateway.
//!
//! Provides [`GatewayError`] for the failures that are allowed to escape the
//! event loop. Per-session I/O errors never show up here: the loop converts
//! them into session teardown. All variants implement `std::error::Error`
//! via `thiserror`, so they integrate with `anyhow::Result` in the runner.

use std::io;

use thiserror::Error;

/// Errors that terminate the gateway or prevent it from starting.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The listening socket failed in a way that cannot be retried.
    #[error("listener error: {0}")]
    Listener(#[source] io::Error),

    /// The readiness primitive failed (poll, registry setup).
    #[error("poll error: {0}")]
    Poll(#[source] io::Error),

    /// Connecting to an upstream endpoint failed.
    #[error("connect error: {addr}: {source}")]
    Connect {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl GatewayError {
    /// Returns `true` for errors raised by the readiness primitive itself.
    pub fn is_poll(&self) -> bool {
        matches!(self, Self::Poll(_))
    }
}
