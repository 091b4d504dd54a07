//! Shared wire model, storage contract, and crypto services used by both
//! the `agent` and `server` crates.

pub mod crypto;
pub mod error;
pub mod hash;
pub mod model;
pub mod proto_convert;
pub mod store;

/// Generated gRPC bindings for the `Metrics` service.
pub mod proto {
    tonic::include_proto!("metrics");
}

pub use model::{Metric, MetricKind, MetricType, HASH_SHA256_HEADER, X_REAL_IP_HEADER};
pub use store::Store;

/// Default gRPC listen port.
pub const GRPC_PORT: u16 = 3200;
