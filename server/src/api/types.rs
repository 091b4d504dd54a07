use metrics_core::error::StoreError;
use metrics_core::model::MetricType;
use serde::{Deserialize, Serialize};

/// Path-form update: `POST /update/:type/:id/:value`.
#[derive(Debug, Deserialize)]
pub struct UpdatePath {
    pub mtype: String,
    pub id: String,
    pub value: String,
}

/// Path-form read: `GET /value/:type/:id`.
#[derive(Debug, Deserialize)]
pub struct ValuePath {
    pub mtype: String,
    pub id: String,
}

/// Body of `POST /value/`. `mtype` is decoded as a plain string, not
/// `MetricType`, so an unknown type reaches the handler instead of
/// failing the `Json` extractor outright.
#[derive(Debug, Deserialize)]
pub struct ValueQuery {
    pub id: String,
    #[serde(rename = "type")]
    pub mtype: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Errors surfaced by handlers, translated to HTTP status below.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("metric not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Used by update paths: an unknown metric type is a client validation
/// error (400).
pub fn parse_metric_type(s: &str) -> Result<MetricType, ApiError> {
    s.parse().map_err(|_| ApiError::Validation(format!("unknown metric type: {s}")))
}

/// Used by get/value paths: an unknown metric type means there is
/// nothing to find under that type (404), not a malformed request.
pub fn parse_metric_type_for_read(s: &str) -> Result<MetricType, ApiError> {
    s.parse().map_err(|_| ApiError::NotFound)
}
