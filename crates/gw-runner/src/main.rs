//! # gw-runner
//!
//! Main entry point for the order-entry gateway.
//!
//! Loads a JSON configuration file, binds the client listener, and runs the
//! session event loop on the main thread until it fails.
//!
//! # Usage
//!
//! ```bash
//! gw-runner config.json --log-level info
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gw_core::logging::LogFormat;
use gw_events::tcp::{OnDataCallback, TcpAcceptor, TcpSettings};
use gw_events::{EventLoop, MioPoller};
use tracing::{info, trace};

/// Order-Entry Gateway Session Runner.
#[derive(Parser)]
#[command(name = "gw-runner", about = "Order-Entry Gateway Session Runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides the config's log_path).
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and check configuration
    let config = gw_core::config::load_config(&cli.config)?;
    config.validate()?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    let format = if cli.log_json { LogFormat::Json } else { LogFormat::Text };
    gw_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name(), format);

    info!("gw-runner starting, config={}, log_level={}", cli.config.display(), cli.log_level);

    // 3. Bind the listener
    let on_data: OnDataCallback = Arc::new(|client, role, bytes| {
        trace!("[{client}] {role}: {} bytes", bytes.len());
    });
    let settings = TcpSettings::from_config(&config)?.with_on_data(on_data);
    let acceptor = TcpAcceptor::bind(config.listen.socket_addr()?, settings)?;

    // 4. Build the loop and pin its thread
    let poller = MioPoller::new(config.event_loop.effective_events_capacity())?;
    let mut event_loop = EventLoop::new(acceptor, poller, config.event_loop.effective_poll_timeout())?;
    gw_core::cpu_affinity::maybe_bind(config.event_loop.cpu_affinity);

    // 5. Run until the poller or the listener gives out
    match event_loop.run() {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}
