//! Image proxy handler.

use super::ProxyQuery;
use crate::api::AppState;
use crate::error::Error;
use crate::log_manager::TaskLogger;
use crate::types::{IllustrationId, SizeTier};
use axum::{
    extract::{Path, Query, State},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};

/// Header naming the tier that was served
pub const TIER_HEADER: &str = "x-proxy-tier";
/// Header naming the transport strategy that succeeded
pub const STRATEGY_HEADER: &str = "x-proxy-strategy";

/// GET /proxy/:id - Fetch an illustration image through the fallback pipeline
#[utoipa::path(
    get,
    path = "/proxy/{id}",
    tag = "proxy",
    params(
        ("id" = String, Path, description = "Numeric illustration id"),
        ProxyQuery,
        ("X-Upstream-Cookie" = Option<String>, Header, description = "Upstream session cookie (overrides PIXIV_COOKIE)"),
        ("X-Upstream-User-Agent" = Option<String>, Header, description = "User-Agent override"),
        ("X-Upstream-Referer" = Option<String>, Header, description = "Referer override"),
        ("X-Upstream-Accept-Language" = Option<String>, Header, description = "Accept-Language override")
    ),
    responses(
        (status = 200, description = "Image bytes", content_type = "image/*"),
        (status = 400, description = "Illustration id is not numeric", body = ApiError),
        (status = 401, description = "No upstream cookie available", body = ApiError),
        (status = 404, description = "Metadata not found or every attempt failed", body = ApiError),
        (status = 500, description = "Unexpected error", body = ApiError),
        (status = 503, description = "Request cancelled", body = ApiError)
    )
)]
pub async fn proxy_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let id: IllustrationId = id.parse()?;

    let task_id = query
        .task_id
        .filter(|task_id| !task_id.trim().is_empty())
        .unwrap_or_else(|| format!("proxy_{}", chrono::Utc::now().timestamp_millis()));

    let requested = match query.size.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<SizeTier>() {
            Ok(tier) => Some(tier),
            Err(e) => {
                TaskLogger::new(state.proxy.log_sink().clone(), task_id.as_str())
                    .warning(format!("{}, serving any available tier", e));
                None
            }
        },
    };

    let identity = state.proxy.identity_from_headers(&headers);
    let cancel = state.shutdown.child_token();

    let image = state
        .proxy
        .proxy_image(&id, requested, &identity, &task_id, &cancel)
        .await
        .inspect_err(|e| {
            tracing::warn!(task_id = %task_id, illust_id = %id, error = %e, "proxy request failed");
        })?;

    tracing::info!(
        task_id = %task_id,
        illust_id = %id,
        tier = %image.tier,
        strategy = %image.strategy,
        bytes = image.bytes.len(),
        "proxy request served"
    );

    let max_age = state.config.api.image_max_age_secs;
    let mut response = image.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(image.content_type));
    insert_header(headers, CACHE_CONTROL, &format!("public, max-age={}", max_age));
    insert_header(
        headers,
        HeaderName::from_static(TIER_HEADER),
        image.tier.as_str(),
    );
    insert_header(
        headers,
        HeaderName::from_static(STRATEGY_HEADER),
        &image.strategy,
    );

    Ok(response)
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "skipping header with invalid value"),
    }
}
