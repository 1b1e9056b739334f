//! Core types for illust-proxy

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Identifier of one artwork on the upstream host
///
/// Always a non-empty string of ASCII digits. Construct with [`str::parse`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IllustrationId(String);

impl IllustrationId {
    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IllustrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for IllustrationId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::Error::InvalidIllustId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Image fidelity level offered by the upstream
///
/// The declaration order is the default fallback priority: cheapest first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SizeTier {
    /// Tiny square thumbnail
    ThumbMini,
    /// Small preview
    Small,
    /// Regular (web-sized) rendition
    Regular,
    /// Full-resolution original
    Original,
}

impl SizeTier {
    /// All tiers in ascending fidelity order
    pub const ALL: [SizeTier; 4] = [
        SizeTier::ThumbMini,
        SizeTier::Small,
        SizeTier::Regular,
        SizeTier::Original,
    ];

    /// Wire name used by the upstream and the `size` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeTier::ThumbMini => "thumb_mini",
            SizeTier::Small => "small",
            SizeTier::Regular => "regular",
            SizeTier::Original => "original",
        }
    }
}

impl std::fmt::Display for SizeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SizeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown size tier '{}'", s))
    }
}

/// Candidate source URL per tier for one illustration
///
/// A missing tier is valid and means "skip", never "fail".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImagePageInfo {
    urls: BTreeMap<SizeTier, String>,
    /// Number of pages the upstream reported (tiers are read from the first)
    pub page_count: usize,
}

impl ImagePageInfo {
    /// Build from (tier, url) pairs; empty URLs are dropped
    pub fn new(urls: impl IntoIterator<Item = (SizeTier, String)>, page_count: usize) -> Self {
        Self {
            urls: urls
                .into_iter()
                .filter(|(_, url)| !url.trim().is_empty())
                .collect(),
            page_count,
        }
    }

    /// URL for a tier, if the upstream offers it
    pub fn url(&self, tier: SizeTier) -> Option<&str> {
        self.urls.get(&tier).map(String::as_str)
    }

    /// Whether no tier has a URL
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Tiers that have a URL, in ascending fidelity order
    pub fn tiers(&self) -> impl Iterator<Item = (SizeTier, &str)> {
        self.urls.iter().map(|(tier, url)| (*tier, url.as_str()))
    }
}

/// Why a single download attempt did not produce bytes
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Non-2xx status with no recognizable challenge page
    Http {
        /// HTTP status returned by the upstream
        status: u16,
    },
    /// Upstream served a bot-detection challenge page
    Blocked {
        /// HTTP status returned with the challenge page
        status: u16,
        /// The marker that identified the challenge
        marker: String,
    },
    /// Upstream signalled rate limiting
    RateLimited {
        /// HTTP status returned by the upstream
        status: u16,
    },
    /// The request exceeded the configured timeout
    Timeout,
    /// Connection, TLS or body-read failure
    Transport,
    /// Strategy could not produce a usable URL for the candidate
    InvalidUrl,
}

impl FailureKind {
    /// HTTP status involved in the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FailureKind::Http { status }
            | FailureKind::Blocked { status, .. }
            | FailureKind::RateLimited { status } => Some(*status),
            FailureKind::Timeout | FailureKind::Transport | FailureKind::InvalidUrl => None,
        }
    }

    /// Whether the upstream actively refused automated traffic
    pub fn is_blocked(&self) -> bool {
        matches!(
            self,
            FailureKind::Blocked { .. } | FailureKind::RateLimited { .. }
        )
    }
}

/// Record of one downloader invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttemptOutcome {
    /// Name of the transport strategy used
    pub strategy: String,
    /// Tier being fetched
    pub tier: SizeTier,
    /// The concrete URL requested after the strategy transform
    pub url: String,
    /// Whether the attempt produced bytes
    pub success: bool,
    /// Number of body bytes received on success
    pub bytes: usize,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
    /// Failure classification; `None` on success
    pub failure: Option<FailureKind>,
    /// Human-readable failure detail; `None` on success
    pub detail: Option<String>,
}

/// Image bytes produced by a successful attempt
#[derive(Clone, Debug)]
pub struct ProxiedImage {
    /// Raw image body
    pub bytes: Bytes,
    /// MIME type resolved from the URL extension
    pub content_type: &'static str,
    /// Tier that was served
    pub tier: SizeTier,
    /// Strategy that succeeded
    pub strategy: String,
}

/// Terminal value of the proxy pipeline
pub type ProxyResult = crate::Result<ProxiedImage>;

/// Severity of a diagnostic log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress information
    Info,
    /// Recoverable problem, the pipeline continues
    Warning,
    /// Failure of a step
    Error,
    /// A step produced the requested result
    Success,
}

impl LogLevel {
    /// Lowercase name as shown in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        }
    }
}

/// One append-only diagnostic record
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Log message
    pub message: String,
    /// Severity
    pub level: LogLevel,
    /// Task correlation id of the request that produced the entry
    pub task_id: String,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
}
