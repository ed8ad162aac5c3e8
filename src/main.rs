//! Farm2Bag chat widget server
//!
//! Entry point: loads configuration and serves the widget.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use farm2bag_chat::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before RUST_LOG and clap's env fallbacks are read
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        reply_ordering = ?config.widget.reply_ordering,
        "Configuration loaded"
    );

    farm2bag_chat::server::start_server(Arc::new(config)).await
}
