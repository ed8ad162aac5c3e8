use crate::widget::WidgetSettings;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `F2B_SERVER__PORT=8000`.
pub const ENV_PREFIX: &str = "F2B";

/// Config file picked up from the working directory when none is given.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Product lookup endpoint (`/get_product`)
    #[arg(long, env = "PRODUCT_LOOKUP_URL")]
    pub lookup_url: Option<String>,

    /// Product suggestion endpoint (`/get_suggestions`)
    #[arg(long, env = "PRODUCT_SUGGESTIONS_URL")]
    pub suggestions_url: Option<String>,

    /// Add-to-cart endpoint
    #[arg(long, env = "CART_URL")]
    pub cart_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub shop: ShopConfig,
    pub widget: WidgetSettings,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Directory served under `/static`.
    pub static_dir: String,
}

/// Endpoints of the external shop services.
#[derive(Debug, Deserialize, Clone)]
pub struct ShopConfig {
    pub lookup_url: String,
    pub suggestions_url: String,
    pub cart_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Sweep period, never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > CLI env var > `F2B_` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.static_dir", "static")?
            .set_default("shop.lookup_url", "http://127.0.0.1:5000/get_product")?
            .set_default("shop.suggestions_url", "http://127.0.0.1:5000/get_suggestions")?
            .set_default("shop.cart_url", "https://farm2bag.com/api/add-to-cart")?
            .set_default("widget.currency_symbol", "₹")?
            .set_default("widget.reply_ordering", "unordered")?
            .set_default("widget.suggestion_limit", 10)?
            .set_default("session.idle_timeout_secs", 30 * 60)?
            .set_default("session.sweep_interval_secs", 60)?;

        // Explicit file must exist; the working-directory fallback is optional.
        match &cli.config {
            Some(path) => builder = builder.add_source(File::with_name(path).required(true)),
            None if Path::new(CWD_CONFIG_FILE).exists() => {
                builder = builder.add_source(File::with_name(CWD_CONFIG_FILE).required(false));
            }
            None => {}
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // clap has already folded its env vars into these.
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(url) = cli.lookup_url {
            builder = builder.set_override("shop.lookup_url", url)?;
        }
        if let Some(url) = cli.suggestions_url {
            builder = builder.set_override("shop.suggestions_url", url)?;
        }
        if let Some(url) = cli.cart_url {
            builder = builder.set_override("shop.cart_url", url)?;
        }

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::ReplyOrdering;

    #[test]
    fn test_cli_flags_override_defaults() {
        let config = AppConfig::load_from_args([
            "farm2bag-chat",
            "--port",
            "8123",
            "--lookup-url",
            "http://shop.internal/get_product",
        ])
        .unwrap();

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.shop.lookup_url, "http://shop.internal/get_product");
        assert_eq!(config.widget.reply_ordering, ReplyOrdering::Unordered);
    }

    #[test]
    fn test_unknown_flag_is_config_error() {
        let err = AppConfig::load_from_args(["farm2bag-chat", "--no-such-flag"]).unwrap_err();
        assert!(matches!(err, config::ConfigError::Message(_)));
    }

    #[test]
    fn test_sweep_interval_floor() {
        let session = SessionConfig {
            idle_timeout_secs: 10,
            sweep_interval_secs: 0,
        };
        assert_eq!(session.sweep_interval(), Duration::from_secs(1));
        assert_eq!(session.idle_timeout(), Duration::from_secs(10));
    }
}
