use super::*;
use crate::config::{CachePolicy, HeaderVariant, StrategyConfig, UrlTransform};
use crate::log_manager::MemoryLogSink;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;


/// Config whose metadata API and relay strategy both point at `server`
fn test_config(server: &MockServer, cookie: &str) -> Config {
    let mut config = Config::default();
    config.identity.cookie = cookie.to_string();
    config.upstream.metadata_base_url = server.uri();
    config.strategies = vec![
        StrategyConfig {
            name: "direct".into(),
            url: UrlTransform::Unchanged,
            headers: HeaderVariant::Authenticated,
            cache: CachePolicy::MaxAge { secs: 3600 },
        },
        StrategyConfig {
            name: "relay".into(),
            url: UrlTransform::Relay {
                template: format!("{}/relay?url={{url}}", server.uri()),
            },
            headers: HeaderVariant::Anonymous,
            cache: CachePolicy::Default,
        },
    ];
    config
}

/// Helper to create a router over a proxy that logs into a [`MemoryLogSink`]
fn create_test_app(config: Config) -> (Router, Arc<MemoryLogSink>) {
    let sink = Arc::new(MemoryLogSink::new());
    let proxy = Arc::new(ImageProxy::new(config.clone(), sink.clone()).unwrap());
    (create_router(proxy, Arc::new(config)), sink)
}

async fn send(app: Router, request: Request<Body>) -> axum::response::Response {
    app.oneshot(request).await.unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown() {
    let server = MockServer::start().await;
    let mut config = test_config(&server, "PHPSESSID=abc");
    config.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let proxy = Arc::new(ImageProxy::new(config.clone(), Arc::new(MemoryLogSink::new())).unwrap());

    let shutdown = CancellationToken::new();
    let api_handle = tokio::spawn(start_api_server(
        proxy,
        Arc::new(config),
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_headers_on_regular_requests() {
    let server = MockServer::start().await;
    let (app, _sink) = create_test_app(test_config(&server, ""));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_options_preflight_short_circuits() {
    let server = MockServer::start().await;
    let (app, _sink) = create_test_app(test_config(&server, "PHPSESSID=abc"));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/proxy/12345")
        .header("Origin", "https://gallery.example")
        .header("Access-Control-Request-Method", "GET")
        .header("Access-Control-Request-Headers", "x-upstream-cookie")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(headers.get("access-control-max-age").unwrap(), "86400");
    assert!(headers.contains_key("access-control-allow-methods"));
    // the preflight never reaches the upstream
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bare_options_request_is_ok() {
    let server = MockServer::start().await;
    let (app, _sink) = create_test_app(test_config(&server, ""));

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/anything")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_disabled() {
    let server = MockServer::start().await;
    let mut config = test_config(&server, "");
    config.api.cors_enabled = false;
    let (app, _sink) = create_test_app(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origins() {
    let server = MockServer::start().await;
    let mut config = test_config(&server, "");
    config.api.cors_origins = vec!["https://gallery.example".to_string()];
    let (app, _sink) = create_test_app(config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "https://gallery.example")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "https://gallery.example"
    );
}

async fn panicking_handler() -> &'static str {
    panic!("boom")
}

#[tokio::test]
async fn test_panicking_handler_becomes_500_envelope() {
    let app: Router = Router::new()
        .route("/boom", axum::routing::get(panicking_handler))
        .layer(CatchPanicLayer::custom(error_response::panic_response));

    let response = send(app, get_request("/boom")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "internal server error");
}
