use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "prasad_ledger=info";

/// Initializes the global tracing subscriber. `RUST_LOG` directives are
/// honoured; the crate logs at `info` unless told otherwise.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
        // A subscriber installed by the host application takes precedence.
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
