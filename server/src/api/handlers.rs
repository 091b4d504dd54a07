use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use metrics_core::error::StoreError;
use metrics_core::model::{Metric, MetricKind, MetricType};
use metrics_core::store::Store;

use super::types::{parse_metric_type, parse_metric_type_for_read, ApiError, MessageResponse, UpdatePath, ValuePath, ValueQuery};

pub type SharedStore = Arc<dyn Store>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Storage(StoreError::NotFound) => StatusCode::NOT_FOUND,
            ApiError::Storage(StoreError::UnsupportedKind) => StatusCode::BAD_REQUEST,
            ApiError::Storage(StoreError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// `POST /update/` — single metric, JSON body.
pub async fn update_json(State(store): State<SharedStore>, Json(metric): Json<Metric>) -> Result<Json<Metric>, ApiError> {
    let updated = store.update(metric).await?;
    Ok(Json(updated))
}

/// `POST /updates/` — batch, JSON body.
pub async fn update_batch_json(
    State(store): State<SharedStore>,
    Json(metrics): Json<Vec<Metric>>,
) -> Result<Json<Vec<Metric>>, ApiError> {
    let updated = store.update_batch(metrics).await?;
    Ok(Json(updated))
}

/// `POST /value/` — `{id,type}` body, returns the filled-in metric.
pub async fn value_json(State(store): State<SharedStore>, Json(query): Json<ValueQuery>) -> Result<Json<Metric>, ApiError> {
    let kind = parse_metric_type_for_read(&query.mtype)?;
    let metric = store.read(&query.id, kind).await?;
    Ok(Json(metric))
}

/// `POST /update/:type/:id/:value` — legacy path-form update.
pub async fn update_path(
    State(store): State<SharedStore>,
    Path(path): Path<UpdatePath>,
) -> Result<Json<MessageResponse>, ApiError> {
    let kind = parse_metric_type(&path.mtype)?;
    let metric = match kind {
        MetricType::Counter => {
            let delta: i64 = path
                .value
                .parse()
                .map_err(|_| ApiError::Validation(format!("invalid counter value: {}", path.value)))?;
            Metric::counter(path.id, delta)
        }
        MetricType::Gauge => {
            let value: f64 = path
                .value
                .parse()
                .map_err(|_| ApiError::Validation(format!("invalid gauge value: {}", path.value)))?;
            Metric::gauge(path.id, value)
        }
    };
    store.update(metric).await?;
    Ok(Json(MessageResponse { message: "OK" }))
}

/// `GET /value/:type/:id` — plain-text value, `%d` for counters, `%g` for gauges.
pub async fn value_path(State(store): State<SharedStore>, Path(path): Path<ValuePath>) -> Result<String, ApiError> {
    let kind = parse_metric_type_for_read(&path.mtype)?;
    let metric = store.read(&path.id, kind).await?;
    let text = match metric.kind {
        MetricKind::Counter(delta) => delta.to_string(),
        MetricKind::Gauge(value) => format_gauge(value),
    };
    Ok(text)
}

/// Shortest decimal representation that round-trips, matching `%g` output.
fn format_gauge(value: f64) -> String {
    format!("{value}")
}

/// `GET /` — HTML listing of every stored counter and gauge.
pub async fn list_html(State(store): State<SharedStore>) -> Result<Html<String>, ApiError> {
    let counters = store.get_counters().await?;
    let gauges = store.get_gauges().await?;

    let mut body = String::from("<html><head><title>Metrics</title></head><body><ul>");
    let mut counter_ids: Vec<_> = counters.keys().cloned().collect();
    counter_ids.sort();
    for id in counter_ids {
        body.push_str(&format!("<li>{id}: {}</li>", counters[&id]));
    }
    let mut gauge_ids: Vec<_> = gauges.keys().cloned().collect();
    gauge_ids.sort();
    for id in gauge_ids {
        body.push_str(&format!("<li>{id}: {}</li>", gauges[&id]));
    }
    body.push_str("</ul></body></html>");
    Ok(Html(body))
}

/// `GET /ping` — 200 iff the store reports healthy, 500 otherwise.
pub async fn ping(State(store): State<SharedStore>) -> StatusCode {
    if store.ping().await {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
