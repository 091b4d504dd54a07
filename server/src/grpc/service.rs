use std::sync::Arc;

use metrics_core::model::Metric;
use metrics_core::proto::metrics_server::Metrics;
use metrics_core::proto::{UpdateMetricsRequest, UpdateMetricsResponse};
use metrics_core::store::Store;
use tonic::{Request, Response, Status};
use tracing::info;

/// `Metrics` gRPC service: converts the incoming batch and forwards it
/// to `Store::update_batch`.
pub struct MetricsService {
    store: Arc<dyn Store>,
}

impl MetricsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[tonic::async_trait]
impl Metrics for MetricsService {
    async fn update_metrics(
        &self,
        request: Request<UpdateMetricsRequest>,
    ) -> Result<Response<UpdateMetricsResponse>, Status> {
        let proto_metrics = request.into_inner().metrics;

        let mut batch = Vec::with_capacity(proto_metrics.len());
        for m in &proto_metrics {
            let metric = Metric::try_from(m.clone())
                .map_err(|e| Status::invalid_argument(e.to_string()))?;
            batch.push(metric);
        }

        self.store
            .update_batch(batch)
            .await
            .map_err(|e| Status::internal(e.to_string()))?;

        info!("successfully saved metrics");

        Ok(Response::new(UpdateMetricsResponse { metrics: proto_metrics }))
    }
}
