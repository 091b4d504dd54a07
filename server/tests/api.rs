use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use metrics_core::hash::HashService;
use metrics_server::api::build_router;
use metrics_server::middleware::TrustedSubnet;
use metrics_server::storage::memory::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;

fn plain_router() -> axum::Router {
    let store: Arc<dyn metrics_core::Store> = Arc::new(MemoryStore::new(None));
    build_router(store, None, None, None)
}

async fn send(router: axum::Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn counter_accumulates_across_requests() {
    let router = plain_router();

    let (status, _) = send(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/update/")
            .header("content-type", "application/json")
            .body(Body::from(json!({"id":"c0","type":"counter","delta":3}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/update/")
            .header("content-type", "application/json")
            .body(Body::from(json!({"id":"c0","type":"counter","delta":4}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        router,
        Request::builder().uri("/value/counter/c0").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "7");
}

#[tokio::test]
async fn gauge_replaces_rather_than_accumulates() {
    let router = plain_router();

    for value in [1.5, 9.0] {
        let (status, _) = send(
            router.clone(),
            Request::builder()
                .method("POST")
                .uri("/update/")
                .header("content-type", "application/json")
                .body(Body::from(json!({"id":"g0","type":"gauge","value":value}).to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        router,
        Request::builder().uri("/value/gauge/g0").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "9");
}

#[tokio::test]
async fn batch_update_echoes_applied_values() {
    let router = plain_router();

    let payload = json!([
        {"id":"c1","type":"counter","delta":2},
        {"id":"c1","type":"counter","delta":5},
        {"id":"g1","type":"gauge","value":3.25},
    ]);
    let (status, body) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/updates/")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let echoed: Value = serde_json::from_slice(&body).unwrap();
    let deltas: Vec<_> = echoed.as_array().unwrap().iter().map(|m| m["delta"].clone()).collect();
    assert_eq!(deltas, vec![json!(2), json!(7)]);
}

#[tokio::test]
async fn hmac_mismatch_is_rejected_and_match_is_accepted() {
    let store: Arc<dyn metrics_core::Store> = Arc::new(MemoryStore::new(None));
    let hash_service = HashService::new("secret");
    let router = build_router(store, Some(hash_service.clone()), None, None);

    let body = json!({"id":"c0","type":"counter","delta":1}).to_string();
    let digest = hash_service.sha256sum(body.as_bytes());

    let (status, _) = send(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/update/")
            .header("content-type", "application/json")
            .header("HashSHA256", digest.clone())
            .body(Body::from(body.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/update/")
            .header("content-type", "application/json")
            .header("HashSHA256", "0".repeat(digest.len()))
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cidr_admission_accepts_in_subnet_and_rejects_outside() {
    let store: Arc<dyn metrics_core::Store> = Arc::new(MemoryStore::new(None));
    let subnet: TrustedSubnet = "192.168.2.0/24".parse().unwrap();
    let router = build_router(store, None, None, Some(subnet));

    let body = json!({"id":"c0","type":"counter","delta":1}).to_string();

    let (status, _) = send(
        router.clone(),
        Request::builder()
            .method("POST")
            .uri("/update/")
            .header("content-type", "application/json")
            .header("X-Real-IP", "192.168.2.42")
            .body(Body::from(body.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/update/")
            .header("content-type", "application/json")
            .header("X-Real-IP", "10.0.0.5")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn ping_reports_backend_health() {
    let router = plain_router();
    let (status, _) = send(router, Request::builder().uri("/ping").body(Body::empty()).unwrap()).await;
    // The in-memory backend has no external dependency to probe, so it
    // always reports unhealthy.
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_metric_type_on_path_update_is_rejected() {
    let router = plain_router();
    let (status, _) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/update/histogram/h0/1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_metric_type_on_value_path_is_not_found() {
    let router = plain_router();
    let (status, _) = send(
        router,
        Request::builder().uri("/value/histogram/h0").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_metric_type_on_value_json_is_not_found() {
    let router = plain_router();
    let (status, _) = send(
        router,
        Request::builder()
            .method("POST")
            .uri("/value/")
            .header("content-type", "application/json")
            .body(Body::from(json!({"id":"h0","type":"histogram"}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
