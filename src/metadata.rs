//! Upstream metadata lookups
//!
//! Two endpoints are used: the page info endpoint, which yields the
//! {tier → URL} map that drives the fallback, and the illustration info
//! endpoint, which yields the creator name for diagnostics only.

use crate::config::UpstreamConfig;
use crate::identity::RequestIdentity;
use crate::log_manager::TaskLogger;
use crate::types::{IllustrationId, ImagePageInfo, SizeTier};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, REFERER, USER_AGENT};
use serde::Deserialize;

/// Response of `GET /ajax/illust/{id}/pages`
#[derive(Debug, Deserialize)]
struct PagesResponse {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    body: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    urls: PageUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PageUrls {
    thumb_mini: Option<String>,
    small: Option<String>,
    regular: Option<String>,
    original: Option<String>,
}

impl PageUrls {
    fn into_tiers(self) -> impl Iterator<Item = (SizeTier, String)> {
        [
            (SizeTier::ThumbMini, self.thumb_mini),
            (SizeTier::Small, self.small),
            (SizeTier::Regular, self.regular),
            (SizeTier::Original, self.original),
        ]
        .into_iter()
        .filter_map(|(tier, url)| url.map(|url| (tier, url)))
    }
}

/// Response of `GET /ajax/illust/{id}`
#[derive(Debug, Deserialize)]
struct IllustInfoResponse {
    #[serde(default)]
    error: serde_json::Value,
    #[serde(default)]
    body: Option<IllustInfoBody>,
}

#[derive(Debug, Deserialize)]
struct IllustInfoBody {
    #[serde(rename = "userName", default)]
    user_name: Option<String>,
}

/// Client for the upstream metadata API
#[derive(Clone, Debug)]
pub struct MetadataFetcher {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl MetadataFetcher {
    /// Create a fetcher sharing `client`
    pub fn new(client: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.metadata_base_url.trim_end_matches('/')
    }

    fn get(&self, url: &str, identity: &RequestIdentity) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .timeout(self.config.metadata_timeout)
            .header(USER_AGENT, identity.user_agent())
            .header(COOKIE, identity.cookie())
            .header(REFERER, identity.referer())
            .header(ACCEPT_LANGUAGE, identity.accept_language())
            .header(ACCEPT, "application/json")
    }

    /// Look up the tier map of an illustration
    ///
    /// Returns `None` (after logging the reason) on transport failure, non-2xx
    /// status, an unparseable body, an `error: true` body or an empty tier map.
    /// No retries are made.
    pub async fn get_image_page_info(
        &self,
        id: &IllustrationId,
        identity: &RequestIdentity,
        log: &TaskLogger,
    ) -> Option<ImagePageInfo> {
        let url = format!(
            "{}/ajax/illust/{}/pages?lang={}",
            self.base_url(),
            id,
            urlencoding::encode(&self.config.metadata_lang)
        );
        log.info(format!("fetching page info for illustration {}", id));

        let response = match self.get(&url, identity).send().await {
            Ok(response) => response,
            Err(e) => {
                log.error(format!("page info request for {} failed: {}", id, e));
                return None;
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log.error(format!(
                    "reading page info body for {} failed (HTTP {}): {}",
                    id,
                    status.as_u16(),
                    e
                ));
                return None;
            }
        };

        if !status.is_success() {
            log.error(format!(
                "page info for {} failed: HTTP {}, body: {}",
                id,
                status.as_u16(),
                snippet(&body, self.config.body_snippet_len)
            ));
            return None;
        }

        let parsed: PagesResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                log.error(format!(
                    "page info for {} is not valid JSON ({}): {}",
                    id,
                    e,
                    snippet(&body, self.config.body_snippet_len)
                ));
                return None;
            }
        };

        if parsed.error {
            log.warning(format!(
                "page info for {} reported an error: {}",
                id,
                parsed.message.as_deref().unwrap_or("no message")
            ));
            return None;
        }

        let page_count = parsed.body.len();
        let Some(first) = parsed.body.into_iter().next() else {
            log.warning(format!("page info for {} has no pages", id));
            return None;
        };

        let info = ImagePageInfo::new(first.urls.into_tiers(), page_count);
        if info.is_empty() {
            log.warning(format!("page info for {} has no image URLs", id));
            return None;
        }

        log.info(format!(
            "page info for {}: {} page(s), available tiers:",
            id, page_count
        ));
        for (tier, url) in info.tiers() {
            log.info(format!("  {}: {}", tier, url));
        }

        Some(info)
    }

    /// Look up the creator name of an illustration, for diagnostics
    ///
    /// Failures are logged and yield `None`; they never abort the pipeline.
    pub async fn get_artist_name(
        &self,
        id: &IllustrationId,
        identity: &RequestIdentity,
        log: &TaskLogger,
    ) -> Option<String> {
        let url = format!("{}/ajax/illust/{}", self.base_url(), id);

        let response = match self.get(&url, identity).send().await {
            Ok(response) => response,
            Err(e) => {
                log.error(format!("illustration info request for {} failed: {}", id, e));
                return None;
            }
        };

        if !response.status().is_success() {
            log.error(format!(
                "illustration info for {} failed: HTTP {}",
                id,
                response.status().as_u16()
            ));
            return None;
        }

        let parsed: IllustInfoResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                log.error(format!("illustration info for {} is not valid JSON: {}", id, e));
                return None;
            }
        };

        // the upstream uses both `false` and `""` for "no error"
        let failed = match &parsed.error {
            serde_json::Value::Bool(flag) => *flag,
            serde_json::Value::String(text) => !text.is_empty(),
            _ => false,
        };

        match parsed.body.and_then(|body| body.user_name) {
            Some(name) if !failed && !name.is_empty() => {
                log.info(format!("artist of {}: {}", id, name));
                Some(name)
            }
            _ => {
                log.warning(format!("no artist name found for illustration {}", id));
                None
            }
        }
    }
}

/// First `max_chars` characters of an upstream body, for log lines
pub(crate) fn snippet(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &trimmed[..end]),
        None => trimmed.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentityDefaults;
    use crate::log_manager::MemoryLogSink;
    use crate::types::LogLevel;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(server: &MockServer) -> MetadataFetcher {
        MetadataFetcher::new(
            reqwest::Client::new(),
            UpstreamConfig {
                metadata_base_url: server.uri(),
                ..Default::default()
            },
        )
    }

    fn identity() -> RequestIdentity {
        let defaults = IdentityDefaults {
            cookie: "PHPSESSID=test".into(),
            ..Default::default()
        };
        RequestIdentity::builder(&defaults).build()
    }

    fn logger() -> (Arc<MemoryLogSink>, TaskLogger) {
        let sink = Arc::new(MemoryLogSink::new());
        (sink.clone(), TaskLogger::new(sink, "meta"))
    }

    fn id() -> IllustrationId {
        "12345".parse().unwrap()
    }

    #[tokio::test]
    async fn test_page_info_success_sends_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/12345/pages"))
            .and(query_param("lang", "zh"))
            .and(header("cookie", "PHPSESSID=test"))
            .and(header("referer", "https://www.pixiv.net/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": false,
                "message": "",
                "body": [
                    { "urls": {
                        "thumb_mini": "https://i.pximg.net/t.jpg",
                        "small": "https://i.pximg.net/s.jpg",
                        "regular": null,
                        "original": "https://i.pximg.net/o.png"
                    } },
                    { "urls": { "small": "https://i.pximg.net/p1.jpg" } }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (sink, log) = logger();
        let info = fetcher(&server)
            .get_image_page_info(&id(), &identity(), &log)
            .await
            .unwrap();

        assert_eq!(info.page_count, 2);
        assert_eq!(info.url(SizeTier::Small), Some("https://i.pximg.net/s.jpg"));
        assert_eq!(info.url(SizeTier::Regular), None);
        assert_eq!(info.tiers().count(), 3);
        assert!(
            sink.messages("meta", LogLevel::Info)
                .iter()
                .any(|m| m.contains("original: https://i.pximg.net/o.png"))
        );
    }

    #[tokio::test]
    async fn test_page_info_http_error_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/12345/pages"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let (sink, log) = logger();
        assert!(
            fetcher(&server)
                .get_image_page_info(&id(), &identity(), &log)
                .await
                .is_none()
        );
        let errors = sink.messages("meta", LogLevel::Error);
        assert!(errors[0].contains("HTTP 403"));
        assert!(errors[0].contains("forbidden"));
    }

    #[tokio::test]
    async fn test_page_info_error_flag_and_empty_body_are_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/1/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": true, "message": "deleted", "body": []
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/2/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": false, "body": [ { "urls": {} } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/3/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let (_sink, log) = logger();
        let fetcher = fetcher(&server);
        for raw in ["1", "2", "3"] {
            let id: IllustrationId = raw.parse().unwrap();
            assert!(
                fetcher
                    .get_image_page_info(&id, &identity(), &log)
                    .await
                    .is_none(),
                "id {} should not resolve",
                raw
            );
        }
    }

    #[tokio::test]
    async fn test_artist_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/12345"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": false, "body": { "userName": "artist-a", "title": "t" }
            })))
            .mount(&server)
            .await;

        let (_sink, log) = logger();
        assert_eq!(
            fetcher(&server)
                .get_artist_name(&id(), &identity(), &log)
                .await
                .as_deref(),
            Some("artist-a")
        );
    }

    #[tokio::test]
    async fn test_artist_name_failure_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/illust/12345"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (_sink, log) = logger();
        assert!(
            fetcher(&server)
                .get_artist_name(&id(), &identity(), &log)
                .await
                .is_none()
        );
    }

    #[test]
    fn test_snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("  short  ", 10), "short");
        assert_eq!(snippet("日本語テキスト", 3), "日本語…");
    }
}
