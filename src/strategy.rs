//! Transport strategies
//!
//! A strategy turns a candidate image URL into a concrete fetch: a URL
//! rewrite, an identity variant and a cache directive. Strategies are built
//! from the ordered [`StrategyConfig`] list, so adding or removing a bypass
//! mirror is a configuration change.

use crate::config::{CachePolicy, HeaderVariant, StrategyConfig, UrlTransform};
use crate::identity::RequestIdentity;
use url::Url;

/// A named policy for fetching one candidate URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportStrategy {
    name: String,
    url: UrlTransform,
    headers: HeaderVariant,
    cache: CachePolicy,
}

impl From<&StrategyConfig> for TransportStrategy {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            headers: config.headers.clone(),
            cache: config.cache.clone(),
        }
    }
}

impl TransportStrategy {
    /// Build the ordered strategy list from configuration
    pub fn from_configs(configs: &[StrategyConfig]) -> Vec<Self> {
        configs.iter().map(Self::from).collect()
    }

    /// Strategy name used in logs and response headers
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrite a candidate URL for this strategy
    ///
    /// `replace_host` leaves URLs on other hosts unchanged. Returns an error
    /// message when the candidate is not a valid absolute URL.
    pub fn transform_url(&self, candidate: &str) -> Result<String, String> {
        match &self.url {
            UrlTransform::Unchanged => Ok(candidate.to_string()),
            UrlTransform::ReplaceHost { from, to } => {
                let mut parsed = Url::parse(candidate)
                    .map_err(|e| format!("invalid candidate URL '{}': {}", candidate, e))?;
                if parsed.host_str() != Some(from.as_str()) {
                    return Ok(candidate.to_string());
                }
                parsed
                    .set_host(Some(to))
                    .map_err(|e| format!("invalid replacement host '{}': {}", to, e))?;
                Ok(parsed.to_string())
            }
            UrlTransform::Relay { template } => {
                Url::parse(candidate)
                    .map_err(|e| format!("invalid candidate URL '{}': {}", candidate, e))?;
                Ok(template.replace("{url}", &urlencoding::encode(candidate)))
            }
        }
    }

    /// Derive the identity this strategy sends; the shared identity is not modified
    pub fn identity_for(&self, base: &RequestIdentity) -> RequestIdentity {
        match &self.headers {
            HeaderVariant::Authenticated => base.clone(),
            HeaderVariant::AlternateUserAgent { user_agent } => base.with_user_agent(user_agent),
            HeaderVariant::Anonymous => base.without_cookie(),
        }
    }

    /// `Cache-Control` request header value, if the policy sets one
    pub fn cache_control(&self) -> Option<String> {
        match &self.cache {
            CachePolicy::Default => None,
            CachePolicy::NoStore => Some("no-store".to_string()),
            CachePolicy::MaxAge { secs } => Some(format!("max-age={}", secs)),
        }
    }
}
