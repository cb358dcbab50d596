//! # gw-core
//!
//! Core crate for the order-entry gateway, providing:
//!
//! - **Configuration** (`config`): JSON config deserialization and validation
//! - **Error types** (`error`): domain-specific `GatewayError` via thiserror
//! - **CPU affinity** (`cpu_affinity`): pinning the event loop thread to a core
//! - **Time utilities** (`time_util`): high-precision timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod cpu_affinity;
pub mod error;
pub mod logging;
pub mod time_util;

pub use error::GatewayError;
