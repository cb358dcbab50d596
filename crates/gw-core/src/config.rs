//! Configuration parsing for the order-entry gateway.
//!
//! The gateway reads its settings from a single JSON config file. The
//! top-level structure contains logging metadata, the client-facing listen
//! address, the upstream order-entry endpoint and the event loop tunables.
//!
//! # Example config
//!
//! ```json
//! {
//!   "Gateway": { "module_name": "fix_gw", "log_path": "/tmp/log" },
//!   "listen": { "ip": "0.0.0.0", "port": 4010 },
//!   "order_entry": { "ip": "127.0.0.1", "port": 4000, "connect_timeout_ms": 500 },
//!   "event_loop": { "poll_timeout_ms": 500, "events_capacity": 1024, "cpu_affinity": 2 },
//!   "keep_alive": { "heartbeat_interval_ms": 1000, "idle_timeout_ms": 15000 }
//! }
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::GatewayError;

/// Default readiness wait, in milliseconds.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 500;

/// Default number of readiness events fetched per poll.
pub const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// Default time allowed for an upstream connect to complete.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 500;

/// Default interval between outbound heartbeats on an idle channel.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// Default inbound silence after which a peer is considered unresponsive.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 15_000;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    #[serde(rename = "Gateway")]
    pub gateway: Option<ModuleMeta>,

    /// Client-facing listen address.
    pub listen: EndpointConfig,

    /// Upstream order-entry endpoint; one connection is opened per session.
    pub order_entry: UpstreamConfig,

    /// Event loop tunables.
    #[serde(default)]
    pub event_loop: EventLoopConfig,

    /// Keep-alive tunables shared by both channels of every session.
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
}

impl AppConfig {
    /// Returns the module name, defaulting to `"gateway"`.
    pub fn module_name(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "gateway".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.gateway.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), GatewayError> {
        self.listen.socket_addr()?;
        self.order_entry.endpoint.socket_addr()?;

        if self.event_loop.poll_timeout_ms == Some(0) {
            return Err(GatewayError::Config("event_loop.poll_timeout_ms must be > 0".into()));
        }
        if self.event_loop.events_capacity == Some(0) {
            return Err(GatewayError::Config("event_loop.events_capacity must be > 0".into()));
        }
        if self.order_entry.connect_timeout_ms == Some(0) {
            return Err(GatewayError::Config("order_entry.connect_timeout_ms must be > 0".into()));
        }

        let hb = self.keep_alive.effective_heartbeat_interval();
        let idle = self.keep_alive.effective_idle_timeout();
        if hb.is_zero() {
            return Err(GatewayError::Config("keep_alive.heartbeat_interval_ms must be > 0".into()));
        }
        if idle <= hb {
            return Err(GatewayError::Config(format!(
                "keep_alive.idle_timeout_ms ({}) must exceed heartbeat_interval_ms ({})",
                idle.as_millis(),
                hb.as_millis(),
            )));
        }
        Ok(())
    }
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// An `ip` + `port` pair.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub ip: String,
    pub port: u16,
}

impl EndpointConfig {
    /// Parse into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, GatewayError> {
        format!("{}:{}", self.ip, self.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid address {}:{}: {e}", self.ip, self.port)))
    }
}

/// Upstream order-entry endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(flatten)]
    pub endpoint: EndpointConfig,

    /// Time allowed for the upstream connect to complete (default: 500).
    pub connect_timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    pub fn effective_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS))
    }
}

/// Event loop tunables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventLoopConfig {
    /// Upper bound on each readiness wait (default: 500).
    pub poll_timeout_ms: Option<u64>,

    /// Readiness events fetched per poll (default: 1024).
    pub events_capacity: Option<usize>,

    /// CPU core to pin the loop thread to.
    pub cpu_affinity: Option<i32>,
}

impl EventLoopConfig {
    pub fn effective_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.unwrap_or(DEFAULT_POLL_TIMEOUT_MS))
    }

    pub fn effective_events_capacity(&self) -> usize {
        self.events_capacity.unwrap_or(DEFAULT_EVENTS_CAPACITY)
    }
}

/// Keep-alive tunables.
///
/// Heartbeat payloads are sent verbatim; encoding them is the job of whoever
/// writes the config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeepAliveConfig {
    /// Outbound idle time after which a heartbeat is written (default: 1000).
    pub heartbeat_interval_ms: Option<u64>,

    /// Inbound silence after which keep-alive fails (default: 15000).
    pub idle_timeout_ms: Option<u64>,

    /// Heartbeat bytes for the protocol channel.
    pub protocol_heartbeat: Option<String>,

    /// Heartbeat bytes for the order-entry channel.
    pub order_entry_heartbeat: Option<String>,
}

impl KeepAliveConfig {
    pub fn effective_heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS))
    }

    pub fn effective_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS))
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"{
        "listen": { "ip": "127.0.0.1", "port": 4010 },
        "order_entry": { "ip": "127.0.0.1", "port": 4000 }
    }"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg: AppConfig = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(cfg.module_name(), "gateway");
        assert_eq!(cfg.log_path(), None);
        assert_eq!(cfg.event_loop.effective_poll_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.event_loop.effective_events_capacity(), 1024);
        assert_eq!(cfg.order_entry.effective_connect_timeout(), Duration::from_millis(500));
        assert_eq!(cfg.keep_alive.effective_heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(cfg.keep_alive.effective_idle_timeout(), Duration::from_secs(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn full_config_round_trips_fields() {
        let json = r#"{
            "Gateway": { "module_name": "fix_gw", "log_path": "/tmp/log" },
            "listen": { "ip": "0.0.0.0", "port": 4010 },
            "order_entry": { "ip": "10.0.0.5", "port": 4000, "connect_timeout_ms": 250 },
            "event_loop": { "poll_timeout_ms": 100, "events_capacity": 64, "cpu_affinity": 3 },
            "keep_alive": {
                "heartbeat_interval_ms": 2000,
                "idle_timeout_ms": 6000,
                "protocol_heartbeat": "HB\n",
                "order_entry_heartbeat": "\u0000\u0001H"
            }
        }"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.module_name(), "fix_gw");
        assert_eq!(cfg.log_path().as_deref(), Some("/tmp/log"));
        assert_eq!(cfg.order_entry.endpoint.socket_addr().unwrap(), "10.0.0.5:4000".parse().unwrap());
        assert_eq!(cfg.order_entry.effective_connect_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.event_loop.effective_poll_timeout(), Duration::from_millis(100));
        assert_eq!(cfg.event_loop.cpu_affinity, Some(3));
        assert_eq!(cfg.keep_alive.order_entry_heartbeat.as_deref(), Some("\u{0}\u{1}H"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_tunables() {
        let mut cfg: AppConfig = serde_json::from_str(MINIMAL).unwrap();
        cfg.event_loop.poll_timeout_ms = Some(0);
        assert!(matches!(cfg.validate(), Err(GatewayError::Config(_))));

        let mut cfg: AppConfig = serde_json::from_str(MINIMAL).unwrap();
        cfg.keep_alive.heartbeat_interval_ms = Some(5_000);
        cfg.keep_alive.idle_timeout_ms = Some(5_000);
        assert!(cfg.validate().is_err());

        let mut cfg: AppConfig = serde_json::from_str(MINIMAL).unwrap();
        cfg.listen.ip = "not-an-ip".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.listen.port, 4010);
        assert_eq!(cfg.order_entry.endpoint.port, 4000);
    }

    #[test]
    fn load_config_reports_missing_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "listen": { "ip": "127.0.0.1", "port": 1 } }"#).unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
