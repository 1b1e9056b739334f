//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`proxy`] - Image proxying
//! - [`system`] - Health, service description, OpenAPI, redirects

use serde::{Deserialize, Serialize};

mod proxy;
mod system;

pub use proxy::*;
pub use system::*;

/// Query parameters for GET /proxy/:id
#[derive(Debug, Default, Deserialize, Serialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProxyQuery {
    /// Preferred size tier: thumb_mini, small, regular or original.
    /// Unknown values are ignored and any tier may be served.
    pub size: Option<String>,

    /// Correlation id attached to every diagnostic log line of this request
    /// (default: `proxy_<unix-millis>`)
    #[serde(rename = "taskId")]
    pub task_id: Option<String>,
}
