//! Upstream response fixtures and stub mounting helpers

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Illustration id used throughout the integration tests
pub const TEST_ID: &str = "12345";

/// A body shaped like a bot-detection interstitial
pub const CHALLENGE_PAGE: &str = r#"<!DOCTYPE html>
<html><head><title>Just a moment...</title></head>
<body><script src="/cdn-cgi/challenge-platform/h/b/orchestrate/jsch/v1"></script></body>
</html>"#;

/// Image body served by the stub for the tier named in the path
pub fn image_bytes(tier: &str) -> Vec<u8> {
    format!("image:{}", tier).into_bytes()
}

/// Page info body listing `urls` for the first page
pub fn pages_body(urls: Value) -> Value {
    json!({
        "error": false,
        "message": "",
        "body": [
            { "urls": urls, "width": 1200, "height": 1600 },
            { "urls": {}, "width": 1200, "height": 1600 }
        ]
    })
}

/// Stub URL of one tier's image on `server`
pub fn tier_url(server: &MockServer, tier: &str) -> String {
    format!("{}/img-master/img/2024/01/01/{}_p0_{}.jpg", server.uri(), TEST_ID, tier)
}

/// Path component of [`tier_url`]
pub fn tier_path(tier: &str) -> String {
    format!("/img-master/img/2024/01/01/{}_p0_{}.jpg", TEST_ID, tier)
}

/// Serve the page info endpoint with URLs for `tiers`
pub async fn mount_page_info(server: &MockServer, tiers: &[&str]) {
    let urls: serde_json::Map<String, Value> = tiers
        .iter()
        .map(|tier| (tier.to_string(), Value::String(tier_url(server, tier))))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/ajax/illust/{}/pages", TEST_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pages_body(Value::Object(urls))))
        .mount(server)
        .await;
}

/// Serve the illustration info endpoint with a creator name
pub async fn mount_artist(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ajax/illust/{}", TEST_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": false,
            "message": "",
            "body": { "illustId": TEST_ID, "userName": name }
        })))
        .mount(server)
        .await;
}

/// Answer direct requests for one tier with `status`
pub async fn mount_tier(server: &MockServer, tier: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_bytes(image_bytes(tier))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path(tier_path(tier)))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Answer every request to a relay path with `response`
pub async fn mount_relay(server: &MockServer, relay_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(relay_path))
        .respond_with(response)
        .mount(server)
        .await;
}
