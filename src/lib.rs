//! # illust-proxy
//!
//! Image retrieval proxy for hotlink-protected illustration hosts.
//!
//! Given an illustration id and an optional size tier, the proxy looks up the
//! available image URLs, then walks an ordered sequence of (size tier,
//! transport strategy) attempts until one download succeeds:
//!
//! - **Cheapest tier first** - thumb_mini, small, regular, original
//! - **Configurable strategies** - direct fetch, host rewrites, alternate
//!   fingerprints and third-party relays are plain configuration
//! - **Sequential and cancellable** - one request in flight at a time, dropped
//!   as soon as the caller goes away
//! - **Diagnosable** - every attempt is recorded under the request's task id
//!
//! ## Quick Start
//!
//! ```no_run
//! use illust_proxy::{Config, ImageProxy, IllustrationId};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.identity.cookie = "PHPSESSID=...".to_string();
//!
//!     let proxy = ImageProxy::with_tracing_sink(config)?;
//!     let id: IllustrationId = "12345".parse()?;
//!
//!     let image = proxy
//!         .proxy_image(&id, None, &proxy.default_identity(), "example", &CancellationToken::new())
//!         .await?;
//!     println!("{} bytes of {}", image.bytes.len(), image.content_type);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API module
pub mod api;
/// Configuration types
pub mod config;
/// Single-URL image download
pub mod downloader;
/// Error types
pub mod error;
/// Fallback planning and orchestration
pub mod fallback;
/// Outbound request identity
pub mod identity;
/// Per-task diagnostic logging
pub mod log_manager;
/// Upstream metadata lookups
pub mod metadata;
/// The proxy pipeline facade
pub mod proxy;
/// Transport strategies
pub mod strategy;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{CachePolicy, Config, HeaderVariant, StrategyConfig, UrlTransform};
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use identity::RequestIdentity;
pub use log_manager::{LogSink, MemoryLogSink, TaskLogger, TracingLogSink};
pub use proxy::{ImageProxy, ProxyReport};
pub use types::{
    AttemptOutcome, FailureKind, IllustrationId, ImagePageInfo, LogEntry, LogLevel, ProxiedImage,
    ProxyResult, SizeTier,
};

/// Serve the HTTP API until a termination signal arrives.
///
/// On the signal, in-flight proxy requests are cancelled and the server
/// drains its open connections before returning.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use illust_proxy::{Config, ImageProxy, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let proxy = Arc::new(ImageProxy::with_tracing_sink(config.clone())?);
///
///     // Run with automatic signal handling
///     run_with_shutdown(proxy, Arc::new(config)).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(
    proxy: std::sync::Arc<ImageProxy>,
    config: std::sync::Arc<Config>,
) -> Result<()> {
    let shutdown = tokio_util::sync::CancellationToken::new();
    let mut server = tokio::spawn(api::start_api_server(proxy, config, shutdown.clone()));

    tokio::select! {
        result = &mut server => return join_server(result),
        _ = wait_for_signal() => {
            tracing::info!("Shutting down API server");
            shutdown.cancel();
        }
    }

    join_server(server.await)
}

fn join_server(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    result.map_err(|e| Error::ApiServerError(format!("server task failed: {}", e)))?
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
