//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the illust-proxy HTTP API
//! using utoipa for compile-time spec generation.

use crate::identity::COOKIE_HEADER;
use utoipa::OpenApi;

/// OpenAPI documentation for the illust-proxy HTTP API
///
/// Served at `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "illust-proxy API",
        version = "0.1.0",
        description = "Image retrieval proxy with size-tier and transport-strategy fallback",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8787", description = "Local development server")
    ),
    paths(
        crate::api::routes::proxy_image,
        crate::api::routes::health_check,
        crate::api::routes::api_info,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::SizeTier,
        crate::error::ApiError,
    )),
    tags(
        (name = "proxy", description = "Image proxying through metadata lookup and fallback attempts"),
        (name = "system", description = "System endpoints - Health checks, service description, OpenAPI spec"),
    ),
    modifiers(&UpstreamCookieAddon)
)]
pub struct ApiDoc;

/// Documents the upstream cookie override header as a security scheme
struct UpstreamCookieAddon;

impl utoipa::Modify for UpstreamCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "upstream_cookie",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(COOKIE_HEADER),
                    ),
                ),
            );
        }
    }
}
