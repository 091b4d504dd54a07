use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use metrics_core::hash::HashService;
use tower_http::cors::CorsLayer;

use super::handlers::{self, SharedStore};
use crate::middleware::{decrypt, gzip, hash, ip, PrivateKeyPath, TrustedSubnet};

/// Builds the full router, wiring the protection chain in the mandated
/// order (CIDR -> HMAC -> RSA decrypt -> gzip) ahead of the handlers.
///
/// Layers execute outermost-first, so they are attached in the reverse
/// of that order: gzip closest to the handlers, CIDR admission last.
pub fn build_router(
    store: SharedStore,
    hash_service: Option<HashService>,
    private_key_path: Option<PrivateKeyPath>,
    trusted_subnet: Option<TrustedSubnet>,
) -> Router {
    let mut router = Router::new()
        .route("/update/", post(handlers::update_json))
        .route("/updates/", post(handlers::update_batch_json))
        .route("/value/", post(handlers::value_json))
        .route("/update/:type/:id/:value", post(handlers::update_path))
        .route("/value/:type/:id", get(handlers::value_path))
        .route("/", get(handlers::list_html))
        .route("/ping", get(handlers::ping))
        .with_state(store.clone())
        .layer(from_fn(gzip::gunzip));

    if let Some(key_path) = private_key_path {
        router = router.layer(from_fn_with_state(key_path, decrypt::decrypt));
    }
    if let Some(hash_service) = hash_service {
        router = router.layer(from_fn_with_state(hash_service, hash::verify_hash));
    }
    if let Some(subnet) = trusted_subnet {
        router = router.layer(from_fn_with_state(subnet, ip::check_ip));
    }
    router.layer(CorsLayer::permissive())
}
