//! HTTP API server module
//!
//! Exposes the image proxy over HTTP: `GET /proxy/:id` plus health, service
//! description and OpenAPI endpoints. Every non-2xx response is the
//! `{success, error, message}` envelope.

use crate::{Config, ImageProxy, Result};
use axum::{Router, http::HeaderValue, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// How long browsers may cache a CORS preflight answer
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Proxy
/// - `GET /proxy/:id?size=&taskId=` - Image bytes or JSON error
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /api/info` - Endpoint, parameter and header description
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /` - Redirects to `/api/info`
///
/// Any other path answers with a 404 envelope. Requests are never cancelled
/// by the router itself; use [`start_api_server`] to tie them to a shutdown
/// signal.
pub fn create_router(proxy: Arc<ImageProxy>, config: Arc<Config>) -> Router {
    build_router(AppState::new(proxy, config, CancellationToken::new()))
}

fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        // Proxy
        .route("/proxy/:id", get(routes::proxy_image))
        // System
        .route("/health", get(routes::health_check))
        .route("/api/info", get(routes::api_info))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/", get(routes::root_redirect))
        .fallback(routes::route_not_found)
        .with_state(state);

    // In Axum's onion model the LAST layer applied is the OUTERMOST. We want:
    //   Request → CORS → Trace → Catch panic → Handler
    let router = router
        .layer(CatchPanicLayer::custom(error_response::panic_response))
        .layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        router.layer(build_cors_layer(&config.api.cors_origins))
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// # Arguments
///
/// * `origins` - List of allowed origins (supports "*" for any origin)
///
/// # Returns
///
/// A configured CorsLayer that allows the specified origins, all methods,
/// and all headers. `OPTIONS` requests are answered directly with 200.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let layer = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    layer
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            axum::http::HeaderName::from_static(routes::TIER_HEADER),
            axum::http::HeaderName::from_static(routes::STRATEGY_HEADER),
        ])
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Start the API server on the configured bind address.
///
/// Serves until `shutdown` is cancelled. Cancelling also cancels every
/// in-flight proxy request, which stops its remaining download attempts.
///
/// # Example
///
/// ```no_run
/// use illust_proxy::{Config, ImageProxy};
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let proxy = Arc::new(ImageProxy::with_tracing_sink(config.clone())?);
///
/// // Start API server (blocks until the token is cancelled)
/// illust_proxy::api::start_api_server(proxy, Arc::new(config), CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    proxy: Arc<ImageProxy>,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = build_router(AppState::new(proxy, config, shutdown.clone()));

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
