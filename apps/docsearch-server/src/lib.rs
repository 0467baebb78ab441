//! docsearch-server
//!
//! HTTP surface over the document service, plus the process bootstrap shared
//! by the server and the admin CLI.
pub mod api;
pub mod bootstrap;

pub use api::{create_router, AppState};
pub use bootstrap::Services;

pub const DEFAULT_LOG_FILTER: &str = "docsearch=info,tower_http=info";

/// Installs the fmt subscriber, honouring `RUST_LOG` when set.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
