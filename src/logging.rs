use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber. `RUST_LOG` overrides the
/// default `expense_classifier=info`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("expense_classifier=info,expense_server=info,tower_http=info"));

        // Logs go to stderr so CSV written to stdout stays clean
        fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    });
}
