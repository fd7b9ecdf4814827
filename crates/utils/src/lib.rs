pub mod log_msg;
pub mod msg_store;
pub mod shell;
pub mod sink;
pub mod stream_ext;
pub mod tokio;

use std::env;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the process-wide subscriber: `RUST_LOG` (or `default_filter`)
/// filtering, formatted to stderr so diagnostics never mix with relayed
/// child stdout.
pub fn init_tracing(default_filter: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(fmt_layer)
        .try_init();
}
