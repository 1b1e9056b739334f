//! Application state for the API server

use crate::{Config, ImageProxy};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the proxy instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The image proxy pipeline
    pub proxy: Arc<ImageProxy>,

    /// HTTP server settings (read-only); pipeline settings live in `proxy.config()`
    pub config: Arc<Config>,

    /// Server-wide shutdown signal; every proxy request runs under a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create a new AppState
    pub fn new(proxy: Arc<ImageProxy>, config: Arc<Config>, shutdown: CancellationToken) -> Self {
        Self {
            proxy,
            config,
            shutdown,
        }
    }
}
