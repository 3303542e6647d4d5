//! Tracing initialisation for QA Gate binaries.
//!
//! Logs always go to stderr; stdout is reserved for command output and the
//! final summary line.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` wins over `level`.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    tracing_subscriber::registry()
        .with(output_layer(json).with_filter(filter(level)))
        .try_init()
        .ok();
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Text or newline-delimited JSON lines on stderr.
fn output_layer(json: bool) -> OutputLayer {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_ignored() {
        init_tracing(true, Level::DEBUG);
        init_tracing(false, Level::INFO);
        tracing::info!(event = "telemetry.test", "still logging");
    }
}
