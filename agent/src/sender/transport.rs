use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use metrics_core::hash::HashService;
use metrics_core::model::{Metric, HASH_SHA256_HEADER};
use metrics_core::proto::metrics_client::MetricsClient;
use metrics_core::proto::UpdateMetricsRequest;
use tonic::transport::Channel;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to compress batch: {0}")]
    Compress(#[from] std::io::Error),
    #[error("failed to encrypt batch: {0}")]
    Encrypt(#[from] metrics_core::error::CryptoError),
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("grpc error: {0}")]
    Grpc(#[from] tonic::Status),
    #[error("grpc transport error: {0}")]
    GrpcTransport(#[from] tonic::transport::Error),
    #[error("proto conversion error: {0}")]
    ProtoConvert(#[from] metrics_core::proto_convert::ProtoConvertError),
}

/// One outbound channel to the server. HTTP applies the full
/// gzip/encrypt/HMAC pipeline; gRPC sends the batch as a typed message
/// with none of those stages.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, batch: &[Metric]) -> Result<(), TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    hash_service: Option<HashService>,
    crypto_key_path: Option<PathBuf>,
}

impl HttpTransport {
    pub fn new(base_url: String, hash_service: Option<HashService>, crypto_key_path: Option<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builds with default TLS config");
        Self { client, base_url, hash_service, crypto_key_path }
    }

    fn encode(&self, batch: &[Metric]) -> Result<Vec<u8>, TransportError> {
        let json = serde_json::to_vec(batch)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&json)?;
        let mut body = encoder.finish()?;

        if let Some(key_path) = &self.crypto_key_path {
            body = metrics_core::crypto::encrypt(&body, key_path)?;
        }

        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: &[Metric]) -> Result<(), TransportError> {
        let body = self.encode(batch)?;

        let mut request = self
            .client
            .post(format!("{}/updates/", self.base_url.trim_end_matches('/')))
            .header("Content-Encoding", "gzip")
            .body(body.clone());

        if let Some(hash_service) = &self.hash_service {
            request = request.header(HASH_SHA256_HEADER, hash_service.sha256sum(&body));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(TransportError::BadStatus(response.status()));
        }
        Ok(())
    }
}

pub struct GrpcTransport {
    client: MetricsClient<Channel>,
}

impl GrpcTransport {
    pub async fn connect(endpoint: String) -> Result<Self, TransportError> {
        let client = MetricsClient::connect(endpoint).await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn send(&self, batch: &[Metric]) -> Result<(), TransportError> {
        let metrics = batch.iter().cloned().map(Into::into).collect();
        let mut client = self.client.clone();
        client
            .update_metrics(UpdateMetricsRequest { metrics })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_transport_gzips_then_hmacs_over_the_compressed_bytes() {
        let transport = HttpTransport::new("http://localhost:8080".into(), Some(HashService::new("secret")), None);
        let batch = vec![Metric::counter("c0", 3)];
        let body = transport.encode(&batch).unwrap();
        assert!(!body.is_empty());
        // gzip magic bytes
        assert_eq!(&body[0..2], &[0x1f, 0x8b]);
    }
}
