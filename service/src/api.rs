//! Default `/_api` sub-router.
//!
//! The application mounts whatever `Router` it is given under `/_api`; this
//! one is used when nothing else is supplied. Handlers see paths with the
//! `/_api` prefix already stripped.

use axum::{
    extract::Extension,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Serialize, Serializer};

use crate::build_info::BuildInfo;

/// Serialize a `StatusCode` as its `u16` representation.
#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires `&T` signature
fn serialize_status_code<S: Serializer>(status: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(status.as_u16())
}

/// RFC 7807 Problem Details error response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    #[serde(serialize_with = "serialize_status_code")]
    pub status: StatusCode,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    #[must_use]
    pub fn not_found(instance: &str) -> Self {
        Self {
            problem_type: "about:blank".to_string(),
            title: "Not Found".to_string(),
            status: StatusCode::NOT_FOUND,
            detail: "No API route matches this path".to_string(),
            instance: Some(instance.to_string()),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

/// Build the default API router.
pub fn router(build_info: BuildInfo) -> Router {
    Router::new()
        .route("/build-info", get(get_build_info))
        .fallback(not_found)
        .layer(Extension(build_info))
}

#[allow(clippy::unused_async)] // Required for Axum handler signature
async fn get_build_info(Extension(build_info): Extension<BuildInfo>) -> Json<BuildInfo> {
    Json(build_info)
}

#[allow(clippy::unused_async)]
async fn not_found(uri: Uri) -> ProblemDetails {
    tracing::debug!(path = %uri.path(), "no api route matched");
    ProblemDetails::not_found(uri.path())
}
