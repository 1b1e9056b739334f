//! Test configuration helpers: a stub upstream and proxies wired to it

use illust_proxy::{
    CachePolicy, Config, HeaderVariant, ImageProxy, MemoryLogSink, StrategyConfig, UrlTransform,
};
use std::sync::Arc;
use wiremock::MockServer;

/// Cookie every test proxy is configured with
pub const TEST_COOKIE: &str = "PHPSESSID=integration";

/// Strategy list shaped like the defaults, with every bypass reachable on `server`
///
/// `domain-rewrite` is modeled as a relay because a host rewrite cannot
/// target the stub server.
pub fn stub_strategies(server: &MockServer) -> Vec<StrategyConfig> {
    vec![
        StrategyConfig {
            name: "direct".into(),
            url: UrlTransform::Unchanged,
            headers: HeaderVariant::Authenticated,
            cache: CachePolicy::MaxAge { secs: 3600 },
        },
        StrategyConfig {
            name: "domain-rewrite".into(),
            url: UrlTransform::Relay {
                template: format!("{}/mirror?url={{url}}", server.uri()),
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
                template: format!("{}/relay?url={{url}}", server.uri()),
            },
            headers: HeaderVariant::Anonymous,
            cache: CachePolicy::Default,
        },
    ]
}

/// Configuration pointing every upstream call at `server`
pub fn stub_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.identity.cookie = TEST_COOKIE.to_string();
    config.upstream.metadata_base_url = server.uri();
    config.strategies = stub_strategies(server);
    config
}

/// Build a proxy over `config` that records into an in-memory sink
pub fn create_test_proxy(config: Config) -> (Arc<ImageProxy>, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    let proxy = ImageProxy::new(config, sink.clone()).expect("test config should be valid");
    (Arc::new(proxy), sink)
}
