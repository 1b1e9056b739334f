//! Outbound request identity
//!
//! A [`RequestIdentity`] is resolved once per inbound request from optional
//! override headers, falling back field by field to [`IdentityDefaults`].
//! It is never mutated afterwards; strategy variants derive new identities.

use crate::config::IdentityDefaults;
use axum::http::HeaderMap;

/// Override header carrying the upstream cookie
pub const COOKIE_HEADER: &str = "x-upstream-cookie";
/// Override header carrying the User-Agent
pub const USER_AGENT_HEADER: &str = "x-upstream-user-agent";
/// Override header carrying the Referer
pub const REFERER_HEADER: &str = "x-upstream-referer";
/// Override header carrying the Accept-Language
pub const ACCEPT_LANGUAGE_HEADER: &str = "x-upstream-accept-language";

/// The header bundle sent with every outbound call for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestIdentity {
    user_agent: String,
    cookie: String,
    referer: String,
    accept_language: String,
    origin: String,
}

impl RequestIdentity {
    /// Start a builder that falls back to `defaults` for unset fields
    pub fn builder(defaults: &IdentityDefaults) -> RequestIdentityBuilder<'_> {
        RequestIdentityBuilder {
            defaults,
            user_agent: None,
            cookie: None,
            referer: None,
            accept_language: None,
        }
    }

    /// Resolve an identity from inbound override headers
    pub fn from_headers(headers: &HeaderMap, defaults: &IdentityDefaults) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let mut builder = Self::builder(defaults);
        if let Some(cookie) = get(COOKIE_HEADER) {
            builder = builder.cookie(cookie);
        }
        if let Some(user_agent) = get(USER_AGENT_HEADER) {
            builder = builder.user_agent(user_agent);
        }
        if let Some(referer) = get(REFERER_HEADER) {
            builder = builder.referer(referer);
        }
        if let Some(accept_language) = get(ACCEPT_LANGUAGE_HEADER) {
            builder = builder.accept_language(accept_language);
        }
        builder.build()
    }

    /// User-Agent header value
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Cookie header value; may be empty
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Whether a cookie credential is present
    pub fn has_cookie(&self) -> bool {
        !self.cookie.trim().is_empty()
    }

    /// Referer header value
    pub fn referer(&self) -> &str {
        &self.referer
    }

    /// Accept-Language header value
    pub fn accept_language(&self) -> &str {
        &self.accept_language
    }

    /// Origin header value
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// A new identity with a different User-Agent
    pub fn with_user_agent(&self, user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ..self.clone()
        }
    }

    /// A new identity without the cookie
    pub fn without_cookie(&self) -> Self {
        Self {
            cookie: String::new(),
            ..self.clone()
        }
    }
}

/// Builder for [`RequestIdentity`]
///
/// Empty or whitespace-only values count as unset.
#[derive(Debug)]
pub struct RequestIdentityBuilder<'a> {
    defaults: &'a IdentityDefaults,
    user_agent: Option<String>,
    cookie: Option<String>,
    referer: Option<String>,
    accept_language: Option<String>,
}

impl RequestIdentityBuilder<'_> {
    /// Override the User-Agent
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.user_agent = non_empty(value.into());
        self
    }

    /// Override the cookie
    pub fn cookie(mut self, value: impl Into<String>) -> Self {
        self.cookie = non_empty(value.into());
        self
    }

    /// Override the Referer
    pub fn referer(mut self, value: impl Into<String>) -> Self {
        self.referer = non_empty(value.into());
        self
    }

    /// Override the Accept-Language
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = non_empty(value.into());
        self
    }

    /// Resolve every field
    pub fn build(self) -> RequestIdentity {
        let defaults = self.defaults;
        RequestIdentity {
            user_agent: self
                .user_agent
                .unwrap_or_else(|| defaults.user_agent.clone()),
            cookie: self.cookie.unwrap_or_else(|| defaults.cookie.clone()),
            referer: self.referer.unwrap_or_else(|| defaults.referer.clone()),
            accept_language: self
                .accept_language
                .unwrap_or_else(|| defaults.accept_language.clone()),
            origin: defaults.origin.clone(),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}
