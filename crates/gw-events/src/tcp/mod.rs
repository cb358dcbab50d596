//! TCP implementations of the collaborator contracts.
//!
//! Payload-agnostic: received bytes are handed to an [`OnDataCallback`] and
//! heartbeats are opaque byte strings taken from the config.
//!
//! # Architecture
//!
//! ```text
//! client ──TCP──► TcpAcceptor ──► TcpSession
//!                                  ├─ protocol:    TcpChannel (accepted client socket)
//!                                  └─ order_entry: TcpChannel (upstream connection) ──TCP──► trading system
//! ```

mod acceptor;
mod channel;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gw_core::config::AppConfig;

pub use acceptor::TcpAcceptor;
pub use channel::TcpChannel;
pub use session::TcpSession;

use crate::channel::ChannelRole;

/// Callback invoked for each chunk of received bytes.
///
/// Parameters: `(client_addr, role, bytes)`
pub type OnDataCallback = Arc<dyn Fn(SocketAddr, ChannelRole, &[u8]) + Send + Sync>;

/// Keep-alive behaviour of one channel.
#[derive(Debug, Clone)]
pub struct KeepAlive {
    /// Outbound idle time after which `heartbeat` is written.
    pub heartbeat_interval: Duration,
    /// Inbound silence after which the peer is considered gone.
    pub idle_timeout: Duration,
    /// Bytes written as a heartbeat. Empty disables outbound heartbeats.
    pub heartbeat: Arc<[u8]>,
}

/// Everything the acceptor needs besides the listen address.
#[derive(Clone)]
pub struct TcpSettings {
    /// Upstream order-entry endpoint.
    pub order_entry_addr: SocketAddr,
    /// Time allowed for the non-blocking upstream connect to complete.
    pub connect_timeout: Duration,
    pub protocol_keep_alive: KeepAlive,
    pub order_entry_keep_alive: KeepAlive,
    pub on_data: Option<OnDataCallback>,
}

impl TcpSettings {
    /// Build settings from the config. Assumes [`AppConfig::validate`] passed.
    pub fn from_config(config: &AppConfig) -> Result<Self, gw_core::GatewayError> {
        let ka = &config.keep_alive;
        let keep_alive = |payload: Option<&String>| KeepAlive {
            heartbeat_interval: ka.effective_heartbeat_interval(),
            idle_timeout: ka.effective_idle_timeout(),
            heartbeat: payload.map(|p| p.as_bytes()).unwrap_or_default().into(),
        };

        Ok(Self {
            order_entry_addr: config.order_entry.endpoint.socket_addr()?,
            connect_timeout: config.order_entry.effective_connect_timeout(),
            protocol_keep_alive: keep_alive(ka.protocol_heartbeat.as_ref()),
            order_entry_keep_alive: keep_alive(ka.order_entry_heartbeat.as_ref()),
            on_data: None,
        })
    }

    pub fn with_on_data(mut self, on_data: OnDataCallback) -> Self {
        self.on_data = Some(on_data);
        self
    }
}
