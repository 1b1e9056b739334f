//! System handlers: health, service description, OpenAPI, redirects.

use crate::api::AppState;
use crate::error::ApiError;
use crate::identity::{ACCEPT_LANGUAGE_HEADER, COOKIE_HEADER, REFERER_HEADER, USER_AGENT_HEADER};
use crate::types::SizeTier;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri, header::LOCATION},
    response::IntoResponse,
};
use serde_json::json;

const SERVICE_NAME: &str = env!("CARGO_PKG_NAME");

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": SERVICE_NAME,
        },
        "message": format!("{} is running", SERVICE_NAME)
    }))
}

/// GET /api/info - Describe the endpoints, parameters and headers
#[utoipa::path(
    get,
    path = "/api/info",
    tag = "system",
    responses(
        (status = 200, description = "Static service description")
    )
)]
pub async fn api_info(State(state): State<AppState>) -> impl IntoResponse {
    let tiers: Vec<&str> = SizeTier::ALL.iter().map(|t| t.as_str()).collect();
    // describe the pipeline actually serving requests, not the server settings
    let pipeline = state.proxy.config();
    let strategies: Vec<&str> = pipeline
        .strategies
        .iter()
        .map(|s| s.name.as_str())
        .collect();

    Json(json!({
        "success": true,
        "data": {
            "name": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "endpoints": {
                "GET /proxy/{id}": {
                    "description": "Fetch an illustration image, falling back across size tiers and transport strategies",
                    "parameters": {
                        "id": "numeric illustration id",
                        "size": format!("preferred size tier (optional): {}", tiers.join(", ")),
                        "taskId": "log correlation id (optional)"
                    },
                    "headers": {
                        COOKIE_HEADER: "upstream session cookie (required unless PIXIV_COOKIE is configured)",
                        USER_AGENT_HEADER: "User-Agent override (optional)",
                        REFERER_HEADER: "Referer override (optional)",
                        ACCEPT_LANGUAGE_HEADER: "Accept-Language override (optional)"
                    }
                },
                "GET /health": { "description": "health check" },
                "GET /api/info": { "description": "this document" },
                "GET /openapi.json": { "description": "OpenAPI specification" }
            },
            "strategies": strategies,
            "degrade_to_any_tier": pipeline.fallback.degrade_to_any_tier
        },
        "message": "API information"
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}

/// GET / - Redirect to the service description
pub async fn root_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(LOCATION, "/api/info")])
}

/// Fallback for unknown routes
pub async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::route_not_found(uri.path())),
    )
}
