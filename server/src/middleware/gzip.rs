use std::io::Read;

use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use flate2::read::GzDecoder;

const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Fourth and final stage: if `Content-Encoding: gzip`, decompress the
/// body before it reaches the handler.
pub async fn gunzip(request: Request, next: Next) -> Result<Response, StatusCode> {
    let is_gzip = request
        .headers()
        .get(axum::http::header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("gzip"))
        .unwrap_or(false);

    if !is_gzip {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| StatusCode::BAD_REQUEST)?;

    let mut decoder = GzDecoder::new(&bytes[..]);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).map_err(|_| StatusCode::BAD_REQUEST)?;

    let request = Request::from_parts(parts, Body::from(decoded));
    Ok(next.run(request).await)
}
