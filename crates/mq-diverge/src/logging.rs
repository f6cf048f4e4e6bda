//! Log subscriber setup.
//!
//! Logs go to stderr so the report on stdout can be piped or diffed.

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::SubscriberInitExt;

static INIT_ONCE: Once = Once::new();

/// Default filter directive for a given `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "mq_compare=warn,mq_diverge=warn",
        1 => "mq_compare=info,mq_diverge=info",
        2 => "mq_compare=debug,mq_diverge=debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
///
/// Later calls are no-ops.
pub fn init(verbosity: u8, json: bool) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);
        // A subscriber installed elsewhere (e.g. by a test harness) is fine.
        let _ = if json {
            builder.json().finish().try_init()
        } else {
            builder.finish().try_init()
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(0, false);
        init(3, true);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(default_directive(0), "mq_compare=warn,mq_diverge=warn");
        assert_eq!(default_directive(2), "mq_compare=debug,mq_diverge=debug");
        assert_eq!(default_directive(9), "trace");
    }
}
