//! Configuration types for illust-proxy

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{net::SocketAddr, path::Path, time::Duration};

/// Default outbound identity used when a request carries no override headers
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityDefaults {
    /// User-Agent sent upstream (default: desktop Chrome)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream session cookie (default: empty, which makes every proxy request fail with 401)
    #[serde(default)]
    pub cookie: String,

    /// Referer sent upstream (default: "https://www.pixiv.net/")
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Accept-Language sent upstream (default: "zh-CN,zh;q=0.9,en;q=0.8")
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// Origin header sent with image downloads (default: "https://www.pixiv.net")
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for IdentityDefaults {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            cookie: String::new(),
            referer: default_referer(),
            accept_language: default_accept_language(),
            origin: default_origin(),
        }
    }
}

/// Upstream endpoints and network limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the metadata API (default: "https://www.pixiv.net")
    #[serde(default = "default_metadata_base_url")]
    pub metadata_base_url: String,

    /// `lang` query parameter for the page info endpoint (default: "zh")
    #[serde(default = "default_metadata_lang")]
    pub metadata_lang: String,

    /// Timeout for each metadata call (default: 15 seconds)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub metadata_timeout: Duration,

    /// Timeout for each image download attempt (default: 30 seconds)
    #[serde(default = "default_download_timeout", with = "duration_serde")]
    pub download_timeout: Duration,

    /// Maximum characters of an error body kept for diagnostics (default: 512)
    #[serde(default = "default_body_snippet_len")]
    pub body_snippet_len: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            metadata_base_url: default_metadata_base_url(),
            metadata_lang: default_metadata_lang(),
            metadata_timeout: default_metadata_timeout(),
            download_timeout: default_download_timeout(),
            body_snippet_len: default_body_snippet_len(),
        }
    }
}

/// One entry of the ordered transport strategy list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Name used in logs and the `X-Proxy-Strategy` response header
    pub name: String,

    /// How the candidate URL is rewritten
    #[serde(default)]
    pub url: UrlTransform,

    /// Which identity headers are sent
    #[serde(default)]
    pub headers: HeaderVariant,

    /// Cache directive sent with the request
    #[serde(default)]
    pub cache: CachePolicy,
}

/// URL rewrite applied by a strategy
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UrlTransform {
    /// Fetch the candidate URL as-is
    #[default]
    Unchanged,
    /// Swap the URL host when it equals `from`
    ReplaceHost {
        /// Host to replace
        from: String,
        /// Replacement host
        to: String,
    },
    /// Fetch through a relay; `{url}` in the template is replaced with the encoded candidate URL
    Relay {
        /// Relay URL template
        template: String,
    },
}

/// Identity variant derived for a strategy
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeaderVariant {
    /// The full resolved identity including the cookie
    #[default]
    Authenticated,
    /// The resolved identity with a different User-Agent
    AlternateUserAgent {
        /// User-Agent to send instead
        user_agent: String,
    },
    /// The resolved identity without the cookie
    Anonymous,
}

/// Cache directive attached to an outbound request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePolicy {
    /// Send no Cache-Control header
    #[default]
    Default,
    /// `Cache-Control: no-store`
    NoStore,
    /// `Cache-Control: max-age=<secs>`
    MaxAge {
        /// Maximum age in seconds
        secs: u64,
    },
}

/// Fallback behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// After a requested tier fails, keep sweeping the other tiers (default: true)
    ///
    /// When false, only the requested tier is tried (with every strategy).
    #[serde(default = "default_true")]
    pub degrade_to_any_tier: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            degrade_to_any_tier: true,
        }
    }
}

/// Diagnostic log history
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Entries kept in the process-wide history before the oldest are evicted (default: 10000)
    #[serde(default = "default_max_log_entries")]
    pub max_entries: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_log_entries(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8787)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// `max-age` of the Cache-Control header on image responses (default: one year)
    #[serde(default = "default_image_max_age")]
    pub image_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            image_max_age_secs: default_image_max_age(),
        }
    }
}

/// Main configuration for ImageProxy
///
/// Every field has a default, so an empty JSON object is a valid config.
/// Only the upstream cookie has to be provided (here, via `PIXIV_COOKIE`, or per request).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Default outbound identity
    #[serde(default)]
    pub identity: IdentityDefaults,

    /// Upstream endpoints and timeouts
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Transport strategies in priority order; the first is the primary strategy
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,

    /// Fallback behavior
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Diagnostic log history
    #[serde(default)]
    pub logging: LoggingConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: IdentityDefaults::default(),
            upstream: UpstreamConfig::default(),
            strategies: default_strategies(),
            fallback: FallbackConfig::default(),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Overlay values from the process environment
    ///
    /// See [`Config::apply_env_from`] for the recognized variables.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup function
    ///
    /// Recognized keys: `PIXIV_COOKIE`, `PIXIV_USER_AGENT`, `PIXIV_REFERER`,
    /// `PIXIV_ACCEPT_LANGUAGE` and `ILLUST_PROXY_BIND`. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(cookie) = get("PIXIV_COOKIE") {
            self.identity.cookie = cookie;
        }
        if let Some(user_agent) = get("PIXIV_USER_AGENT") {
            self.identity.user_agent = user_agent;
        }
        if let Some(referer) = get("PIXIV_REFERER") {
            self.identity.referer = referer;
        }
        if let Some(accept_language) = get("PIXIV_ACCEPT_LANGUAGE") {
            self.identity.accept_language = accept_language;
        }
        if let Some(bind) = get("ILLUST_PROXY_BIND") {
            self.api.bind_address = bind.parse().map_err(|e| {
                Error::config(
                    "ILLUST_PROXY_BIND",
                    format!("invalid bind address '{}': {}", bind, e),
                )
            })?;
        }

        Ok(())
    }

    /// Check the configuration for values the proxy cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.strategies.is_empty() {
            return Err(Error::config(
                "strategies",
                "at least one transport strategy is required",
            ));
        }

        let mut names = HashSet::new();
        for strategy in &self.strategies {
            if strategy.name.trim().is_empty() {
                return Err(Error::config("strategies", "strategy names must not be empty"));
            }
            if !names.insert(strategy.name.as_str()) {
                return Err(Error::config(
                    "strategies",
                    format!("duplicate strategy name '{}'", strategy.name),
                ));
            }
            match &strategy.url {
                UrlTransform::Relay { template } if !template.contains("{url}") => {
                    return Err(Error::config(
                        "strategies",
                        format!(
                            "relay template of '{}' must contain {{url}}",
                            strategy.name
                        ),
                    ));
                }
                UrlTransform::ReplaceHost { from, to }
                    if from.trim().is_empty() || to.trim().is_empty() =>
                {
                    return Err(Error::config(
                        "strategies",
                        format!("replace_host of '{}' needs both hosts", strategy.name),
                    ));
                }
                _ => {}
            }
        }

        if self.upstream.metadata_timeout.is_zero() {
            return Err(Error::config(
                "upstream.metadata_timeout",
                "timeout must be greater than zero",
            ));
        }
        if self.upstream.download_timeout.is_zero() {
            return Err(Error::config(
                "upstream.download_timeout",
                "timeout must be greater than zero",
            ));
        }

        Ok(())
    }
}

// Default value functions
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
}

fn default_referer() -> String {
    "https://www.pixiv.net/".into()
}

fn default_accept_language() -> String {
    "zh-CN,zh;q=0.9,en;q=0.8".into()
}

fn default_origin() -> String {
    "https://www.pixiv.net".into()
}

fn default_metadata_base_url() -> String {
    "https://www.pixiv.net".into()
}

fn default_metadata_lang() -> String {
    "zh".into()
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_body_snippet_len() -> usize {
    512
}

fn default_true() -> bool {
    true
}

fn default_max_log_entries() -> usize {
    10_000
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_image_max_age() -> u64 {
    31_536_000 // 1 year
}

fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig {
            name: "direct".into(),
            url: UrlTransform::Unchanged,
            headers: HeaderVariant::Authenticated,
            cache: CachePolicy::MaxAge { secs: 3600 },
        },
        StrategyConfig {
            name: "domain-rewrite".into(),
            url: UrlTransform::ReplaceHost {
                from: "i.pximg.net".into(),
                to: "i.pixiv.re".into(),
            },
            headers: HeaderVariant::Anonymous,
            cache: CachePolicy::MaxAge { secs: 3600 },
        },
        StrategyConfig {
            name: "alternate-ua".into(),
            url: UrlTransform::Unchanged,
            headers: HeaderVariant::AlternateUserAgent {
                user_agent: "TelegramBot (like TwitterBot)".into(),
            },
            cache: CachePolicy::MaxAge { secs: 3600 },
        },
        StrategyConfig {
            name: "third-party-mirror".into(),
            url: UrlTransform::Relay {
                template: "https://wsrv.nl/?url={url}".into(),
            },
            headers: HeaderVariant::Anonymous,
            cache: CachePolicy::Default,
        },
    ]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
