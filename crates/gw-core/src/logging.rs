//! Logging initialization using the `tracing` ecosystem.
//!
//! Console output is always on; a daily-rotating file (via `tracing-appender`)
//! is added when a log directory is given. `RUST_LOG` takes precedence over
//! the level passed in.

use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Output format of every log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, colored on the console.
    #[default]
    Text,
    /// One JSON object per line, for log shippers.
    Json,
}

fn layer<W>(format: LogFormat, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let base = fmt::layer().with_writer(writer).with_target(true).with_thread_ids(true);
    match format {
        LogFormat::Text => base.with_ansi(ansi).boxed(),
        LogFormat::Json => base.json().boxed(),
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once, before the event loop is entered.
///
/// # Parameters
///
/// - `log_level`: default level if `RUST_LOG` env var is not set (e.g. `"info"`)
/// - `log_dir`: optional directory for daily-rotating log files
/// - `module_name`: used as the log file prefix (e.g. `"fix_gw"`)
/// - `format`: text or JSON lines
pub fn init_logging(log_level: &str, log_dir: Option<&str>, module_name: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let mut layers = vec![layer(format, std::io::stdout, true)];
    if let Some(dir) = log_dir {
        layers.push(layer(format, tracing_appender::rolling::daily(dir, module_name), false));
    }

    tracing_subscriber::registry().with(layers).with(env_filter).init();
}
