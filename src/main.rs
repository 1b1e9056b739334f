//! illust-proxy server binary
//!
//! Configuration is read from the JSON file named by `ILLUST_PROXY_CONFIG`
//! (optional), then overlaid with `PIXIV_*` / `ILLUST_PROXY_BIND` environment
//! variables. Log verbosity follows `RUST_LOG` (default `info`).

use illust_proxy::{Config, ImageProxy, run_with_shutdown};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const CONFIG_PATH_VAR: &str = "ILLUST_PROXY_CONFIG";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    let config = load_config()?;
    if config.identity.cookie.trim().is_empty() {
        tracing::warn!(
            "PIXIV_COOKIE is not set; requests without an X-Upstream-Cookie header will be rejected"
        );
    }

    let proxy = Arc::new(ImageProxy::with_tracing_sink(config.clone())?);
    run_with_shutdown(proxy, Arc::new(config)).await?;

    Ok(())
}

fn load_config() -> illust_proxy::Result<Config> {
    let mut config = match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) if !path.trim().is_empty() => {
            tracing::info!(path = %path, "Loading configuration file");
            Config::from_file(&path)?
        }
        _ => Config::default(),
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}
