//! Single-URL image download
//!
//! [`Downloader::try_download`] performs exactly one GET with a browser-like
//! header set and classifies the result. It never returns an error: every
//! failure becomes an [`AttemptOutcome`] so the orchestrator can move on.

use crate::identity::RequestIdentity;
use crate::log_manager::TaskLogger;
use crate::metadata::snippet;
use crate::strategy::TransportStrategy;
use crate::types::{AttemptOutcome, FailureKind, ProxiedImage, SizeTier};
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, COOKIE, ORIGIN, REFERER, USER_AGENT,
};
use std::time::Duration;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";

/// Body markers of bot-detection challenge pages
const CHALLENGE_MARKERS: &[&str] = &[
    "cf-chl",
    "challenge-platform",
    "Just a moment",
    "Attention Required",
    "captcha",
];

/// Body markers of rate-limit pages
const RATE_LIMIT_MARKERS: &[&str] = &["Too Many Requests", "rate limit", "rate-limited"];

/// Most bytes of a failed response body read for diagnostics
const DIAGNOSTIC_BODY_LIMIT: usize = 16 * 1024;

/// Result of one download attempt
#[derive(Debug)]
pub struct Attempt {
    /// What happened, for the attempt log
    pub outcome: AttemptOutcome,
    /// The image, when the attempt succeeded
    pub image: Option<ProxiedImage>,
}

/// Performs single image downloads against the upstream or a mirror
#[derive(Clone, Debug)]
pub struct Downloader {
    client: reqwest::Client,
    timeout: Duration,
    body_snippet_len: usize,
}

impl Downloader {
    /// Create a downloader sharing `client`; every request carries `timeout`
    pub fn new(client: reqwest::Client, timeout: Duration, body_snippet_len: usize) -> Self {
        Self {
            client,
            timeout,
            body_snippet_len,
        }
    }

    /// Fetch `candidate` for `tier` through `strategy`
    pub async fn try_download(
        &self,
        candidate: &str,
        tier: SizeTier,
        strategy: &TransportStrategy,
        identity: &RequestIdentity,
        log: &TaskLogger,
    ) -> Attempt {
        let url = match strategy.transform_url(candidate) {
            Ok(url) => url,
            Err(detail) => {
                log.warning(format!(
                    "[{}] {} skipped: {}",
                    strategy.name(),
                    tier,
                    detail
                ));
                return failed(strategy, tier, candidate, FailureKind::InvalidUrl, detail);
            }
        };

        let identity = strategy.identity_for(identity);
        log.info(format!("[{}] requesting {} image: {}", strategy.name(), tier, url));

        let mut request = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header(USER_AGENT, identity.user_agent())
            .header(ACCEPT, IMAGE_ACCEPT)
            .header(ACCEPT_LANGUAGE, identity.accept_language())
            .header(REFERER, identity.referer())
            .header(ORIGIN, identity.origin())
            .header("sec-fetch-dest", "image")
            .header("sec-fetch-mode", "no-cors")
            .header("sec-fetch-site", "cross-site");
        if identity.has_cookie() {
            request = request.header(COOKIE, identity.cookie());
        }
        if let Some(cache_control) = strategy.cache_control() {
            request = request.header(CACHE_CONTROL, cache_control);
        }

        let mut response = match request.send().await {
            Ok(response) => response,
            Err(e) => return self.transport_failure(strategy, tier, url, e, log),
        };

        let status = response.status();
        if status.is_success() {
            return match response.bytes().await {
                Ok(bytes) => {
                    // mirrors and relays serve the same file, so the candidate decides the type
                    let content_type = content_type_for_url(candidate);
                    tracing::debug!(
                        strategy = strategy.name(),
                        tier = %tier,
                        status = status.as_u16(),
                        bytes = bytes.len(),
                        "download attempt succeeded"
                    );
                    log.success(format!(
                        "[{}] {} downloaded: {:.2} MB ({})",
                        strategy.name(),
                        tier,
                        bytes.len() as f64 / (1024.0 * 1024.0),
                        content_type
                    ));
                    Attempt {
                        outcome: AttemptOutcome {
                            strategy: strategy.name().to_string(),
                            tier,
                            url,
                            success: true,
                            bytes: bytes.len(),
                            status: Some(status.as_u16()),
                            failure: None,
                            detail: None,
                        },
                        image: Some(ProxiedImage {
                            bytes,
                            content_type,
                            tier,
                            strategy: strategy.name().to_string(),
                        }),
                    }
                }
                Err(e) => self.transport_failure(strategy, tier, url, e, log),
            };
        }

        // Non-2xx: challenge markers sit near the top of the page
        let body = read_body_prefix(&mut response, DIAGNOSTIC_BODY_LIMIT).await;
        let failure = classify_failure(status, &body);
        let hint = match &failure {
            FailureKind::Blocked { marker, .. } => {
                format!("bot challenge page detected (marker '{}')", marker)
            }
            FailureKind::RateLimited { .. } => "rate limited by upstream".to_string(),
            _ if status == StatusCode::FORBIDDEN => {
                "forbidden, likely hotlink protection (check referer and cookie)".to_string()
            }
            _ if status == StatusCode::NOT_FOUND => "no image at this URL".to_string(),
            _ => "unexpected upstream status".to_string(),
        };
        let detail = format!("HTTP {}: {}", status.as_u16(), hint);
        tracing::debug!(
            strategy = strategy.name(),
            tier = %tier,
            status = status.as_u16(),
            blocked = failure.is_blocked(),
            "download attempt failed"
        );

        log.warning(format!("[{}] {} failed: {}", strategy.name(), tier, detail));
        if !body.trim().is_empty() {
            log.info(format!(
                "[{}] response body: {}",
                strategy.name(),
                snippet(&body, self.body_snippet_len)
            ));
        }

        Attempt {
            outcome: AttemptOutcome {
                strategy: strategy.name().to_string(),
                tier,
                url,
                success: false,
                bytes: 0,
                status: Some(status.as_u16()),
                failure: Some(failure),
                detail: Some(detail),
            },
            image: None,
        }
    }

    fn transport_failure(
        &self,
        strategy: &TransportStrategy,
        tier: SizeTier,
        url: String,
        error: reqwest::Error,
        log: &TaskLogger,
    ) -> Attempt {
        let (failure, detail) = if error.is_timeout() {
            (
                FailureKind::Timeout,
                format!("timed out after {} seconds", self.timeout.as_secs_f64()),
            )
        } else {
            (FailureKind::Transport, error.to_string())
        };
        log.warning(format!("[{}] {} failed: {}", strategy.name(), tier, detail));
        failed(strategy, tier, &url, failure, detail)
    }
}

fn failed(
    strategy: &TransportStrategy,
    tier: SizeTier,
    url: &str,
    failure: FailureKind,
    detail: String,
) -> Attempt {
    Attempt {
        outcome: AttemptOutcome {
            strategy: strategy.name().to_string(),
            tier,
            url: url.to_string(),
            success: false,
            bytes: 0,
            status: failure.status(),
            failure: Some(failure),
            detail: Some(detail),
        },
        image: None,
    }
}

/// Read at most `limit` bytes of a response body; the rest is never buffered
///
/// Read errors end the prefix early. Invalid UTF-8 is replaced.
pub(crate) async fn read_body_prefix(response: &mut reqwest::Response, limit: usize) -> String {
    let mut prefix = Vec::new();
    while prefix.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - prefix.len());
                prefix.extend_from_slice(&chunk[..take]);
            }
            Ok(None) | Err(_) => break,
        }
    }
    String::from_utf8_lossy(&prefix).into_owned()
}

/// Classify a non-2xx response by status and body markers
pub fn classify_failure(status: StatusCode, body: &str) -> FailureKind {
    let lowered = body.to_ascii_lowercase();
    let status = status.as_u16();

    if let Some(marker) = CHALLENGE_MARKERS
        .iter()
        .find(|marker| lowered.contains(&marker.to_ascii_lowercase()))
    {
        return FailureKind::Blocked {
            status,
            marker: (*marker).to_string(),
        };
    }

    if status == 429
        || RATE_LIMIT_MARKERS
            .iter()
            .any(|marker| lowered.contains(&marker.to_ascii_lowercase()))
    {
        return FailureKind::RateLimited { status };
    }

    FailureKind::Http { status }
}

/// MIME type for the file extension of a URL path; the query is ignored
pub fn content_type_for_url(url: &str) -> &'static str {
    let path = url::Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or_default().to_string());

    let extension = path
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
