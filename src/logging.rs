//! Tracing subscriber setup for the command line tool.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

static INIT_ONCE: Once = Once::new();

/// Installs the global subscriber. `RUST_LOG` takes precedence over
/// `verbose`. Later calls are no-ops.
pub fn init(format: LogFormat, verbose: bool) {
    INIT_ONCE.call_once(|| {
        let default_level = if verbose {
            "typetree_history=debug"
        } else {
            "typetree_history=info"
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        // Another subscriber may already be installed, e.g. by a test harness
        let _ = match format {
            LogFormat::Pretty => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
    });
}
