use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics_core::hash::HashService;
use metrics_core::model::HASH_SHA256_HEADER;

const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Second stage: if `HashSHA256` is present, verify it against the body
/// (constant-time), then echo the header back on the response.
pub async fn verify_hash(State(hash): State<HashService>, request: Request, next: Next) -> Result<Response, StatusCode> {
    let header = request
        .headers()
        .get(HASH_SHA256_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(expected) = header else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| StatusCode::BAD_REQUEST)?;

    if !hash.matches(&bytes, &expected) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(HASH_SHA256_HEADER, expected.parse().map_err(|_| StatusCode::BAD_REQUEST)?);
    Ok(response)
}
