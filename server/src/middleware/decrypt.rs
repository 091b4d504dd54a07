use std::path::PathBuf;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use metrics_core::crypto;
use tracing::error;

const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct PrivateKeyPath(pub PathBuf);

/// Third stage: if non-empty, RSA-PKCS#1v1.5 decrypt the body under the
/// configured private key. Empty bodies pass through unchanged.
pub async fn decrypt(State(key_path): State<PrivateKeyPath>, request: Request, next: Next) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| StatusCode::BAD_REQUEST)?;

    if bytes.is_empty() {
        let request = Request::from_parts(parts, Body::from(bytes));
        return Ok(next.run(request).await);
    }

    let plaintext = crypto::decrypt(&bytes, &key_path.0).map_err(|e| {
        error!(error = %e, "failed to decrypt request payload");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let request = Request::from_parts(parts, Body::from(plaintext));
    Ok(next.run(request).await)
}
