//! The image proxy pipeline
//!
//! [`ImageProxy`] owns the shared HTTP client, the metadata fetcher, the
//! fallback orchestrator and the log sink. One call to [`ImageProxy::run`]
//! handles one inbound request end to end:
//!
//! 1. Fail fast with [`Error::AuthMissing`] when the identity has no cookie
//! 2. Look up the tier map, or fail with [`Error::MetadataNotFound`]
//! 3. Resolve the artist name (best effort), then run the fallback plan
//! 4. Return the first image, or [`Error::AllStrategiesExhausted`]


use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::fallback::FallbackOrchestrator;
use crate::identity::RequestIdentity;
use crate::log_manager::{LogSink, TaskLogger, TracingLogSink};
use crate::metadata::MetadataFetcher;
use crate::strategy::TransportStrategy;
use crate::types::{AttemptOutcome, IllustrationId, LogEntry, ProxyResult, SizeTier};
use axum::http::HeaderMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything one proxy request produced
#[derive(Debug)]
pub struct ProxyReport {
    /// The terminal outcome
    pub result: ProxyResult,
    /// Download attempts in execution order; empty when no download ran
    pub attempts: Vec<AttemptOutcome>,
    /// Creator name, when the diagnostic lookup succeeded
    pub artist: Option<String>,
}

impl ProxyReport {
    fn failed(error: Error) -> Self {
        Self {
            result: Err(error),
            attempts: Vec::new(),
            artist: None,
        }
    }
}

/// Image retrieval proxy
#[derive(Clone)]
pub struct ImageProxy {
    config: Arc<Config>,
    metadata: MetadataFetcher,
    orchestrator: FallbackOrchestrator,
    log_sink: Arc<dyn LogSink>,
}

impl ImageProxy {
    /// Create a proxy that records diagnostics into `log_sink`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Config, log_sink: Arc<dyn LogSink>) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder().build()?;
        let metadata = MetadataFetcher::new(client.clone(), config.upstream.clone());
        let downloader = Downloader::new(
            client,
            config.upstream.download_timeout,
            config.upstream.body_snippet_len,
        );
        let orchestrator = FallbackOrchestrator::new(
            downloader,
            TransportStrategy::from_configs(&config.strategies),
            config.fallback.degrade_to_any_tier,
        );

        tracing::info!(
            strategies = config.strategies.len(),
            degrade_to_any_tier = config.fallback.degrade_to_any_tier,
            "image proxy initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            metadata,
            orchestrator,
            log_sink,
        })
    }

    /// Create a proxy logging through a bounded [`TracingLogSink`]
    pub fn with_tracing_sink(config: Config) -> Result<Self> {
        let sink = Arc::new(TracingLogSink::new(config.logging.max_entries));
        Self::new(config, sink)
    }

    /// The active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared diagnostic sink
    pub fn log_sink(&self) -> &Arc<dyn LogSink> {
        &self.log_sink
    }

    /// Diagnostic entries recorded for one task id
    pub fn logs_for_task(&self, task_id: &str) -> Vec<LogEntry> {
        self.log_sink.logs_for_task(task_id)
    }

    /// Resolve the outbound identity from inbound override headers
    pub fn identity_from_headers(&self, headers: &HeaderMap) -> RequestIdentity {
        RequestIdentity::from_headers(headers, &self.config.identity)
    }

    /// The identity used when a request carries no overrides
    pub fn default_identity(&self) -> RequestIdentity {
        RequestIdentity::builder(&self.config.identity).build()
    }

    /// Fetch the image for `id`, returning only the terminal outcome
    pub async fn proxy_image(
        &self,
        id: &IllustrationId,
        requested: Option<SizeTier>,
        identity: &RequestIdentity,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> ProxyResult {
        self.run(id, requested, identity, task_id, cancel)
            .await
            .result
    }

    /// Fetch the image for `id` and report every attempt made
    pub async fn run(
        &self,
        id: &IllustrationId,
        requested: Option<SizeTier>,
        identity: &RequestIdentity,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> ProxyReport {
        let log = TaskLogger::new(self.log_sink.clone(), task_id);
        log.info(format!(
            "proxy request for illustration {} (size: {})",
            id,
            requested.map(|t| t.as_str()).unwrap_or("any")
        ));

        if !identity.has_cookie() {
            log.error("no upstream cookie available, refusing to contact the upstream");
            return ProxyReport::failed(Error::AuthMissing);
        }

        let info = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log.warning("request cancelled during metadata lookup");
                return ProxyReport::failed(Error::Cancelled);
            }
            info = self.metadata.get_image_page_info(id, identity, &log) => info,
        };
        let Some(info) = info else {
            log.error(format!("no usable page info for illustration {}", id));
            return ProxyReport::failed(Error::MetadataNotFound { id: id.to_string() });
        };

        // one upstream call at a time; the lookup is bounded by the metadata timeout
        let artist = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log.warning("request cancelled during artist lookup");
                return ProxyReport::failed(Error::Cancelled);
            }
            name = self.metadata.get_artist_name(id, identity, &log) => name,
        };

        let run = self
            .orchestrator
            .run(&info, requested, identity, &log, cancel)
            .await;

        let blocked = run.blocked_count();
        let result = match run.image {
            Some(image) => Ok(image),
            None if run.cancelled => Err(Error::Cancelled),
            None => Err(Error::AllStrategiesExhausted {
                id: id.to_string(),
                attempts: run.attempts.len(),
                blocked,
            }),
        };

        ProxyReport {
            result,
            attempts: run.attempts,
            artist,
        }
    }
}

impl std::fmt::Debug for ImageProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageProxy")
            .field("strategies", &self.orchestrator.strategies().len())
            .field("degrade_to_any_tier", &self.config.fallback.degrade_to_any_tier)
            .finish_non_exhaustive()
    }
}
