//! Conversions between the wire `Metric` and its protobuf counterpart,
//! used by the gRPC `UpdateMetrics` RPC.

use crate::model::{Metric, MetricKind};
use crate::proto;

impl From<Metric> for proto::Metric {
    fn from(m: Metric) -> Self {
        match m.kind {
            MetricKind::Counter(delta) => proto::Metric {
                id: m.id,
                mtype: proto::metric::MType::MTypeCounter as i32,
                delta: Some(delta),
                value: None,
            },
            MetricKind::Gauge(value) => proto::Metric {
                id: m.id,
                mtype: proto::metric::MType::MTypeGauge as i32,
                delta: None,
                value: Some(value),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtoConvertError {
    #[error("metric {0} has unspecified type")]
    UnspecifiedType(String),
    #[error("metric {0} is missing its delta field")]
    MissingDelta(String),
    #[error("metric {0} is missing its value field")]
    MissingValue(String),
}

impl TryFrom<proto::Metric> for Metric {
    type Error = ProtoConvertError;

    fn try_from(m: proto::Metric) -> Result<Self, Self::Error> {
        match proto::metric::MType::try_from(m.mtype).unwrap_or(proto::metric::MType::MTypeUnspecified) {
            proto::metric::MType::MTypeCounter => {
                let delta = m.delta.ok_or_else(|| ProtoConvertError::MissingDelta(m.id.clone()))?;
                Ok(Metric::counter(m.id, delta))
            }
            proto::metric::MType::MTypeGauge => {
                let value = m.value.ok_or_else(|| ProtoConvertError::MissingValue(m.id.clone()))?;
                Ok(Metric::gauge(m.id, value))
            }
            proto::metric::MType::MTypeUnspecified => Err(ProtoConvertError::UnspecifiedType(m.id)),
        }
    }
}
