use tracing_forest::ForestLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

/// `RUST_LOG` wins; otherwise info for us and the HTTP trace layer.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(ForestLayer::default())
        .init();
}
