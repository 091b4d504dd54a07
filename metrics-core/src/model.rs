use std::fmt;

use serde::{de::Error as DeError, ser::SerializeStruct, Deserialize, Deserializer, Serialize, Serializer};

/// Header carrying the hex HMAC-SHA-256 of the request body.
pub const HASH_SHA256_HEADER: &str = "HashSHA256";
/// Header carrying the declared client IP, checked against the trusted subnet.
pub const X_REAL_IP_HEADER: &str = "X-Real-IP";

/// A single metric reading. `Counter` carries an additive delta, `Gauge` an
/// absolute value; the two never overlap, unlike the wire representation
/// which optionally carries either field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricKind {
    Counter(i64),
    Gauge(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub id: String,
    pub kind: MetricKind,
}

impl Metric {
    pub fn counter(id: impl Into<String>, delta: i64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Counter(delta),
        }
    }

    pub fn gauge(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            kind: MetricKind::Gauge(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            MetricKind::Counter(_) => "counter",
            MetricKind::Gauge(_) => "gauge",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MetricKind::Counter(delta) => write!(f, "counter: {} = {}", self.id, delta),
            MetricKind::Gauge(value) => write!(f, "gauge: {} = {:.6}", self.id, value),
        }
    }
}

// Custom (de)serialization producing exactly:
//   {"id":"<string>","type":"counter","delta":<int64>}
//   {"id":"<string>","type":"gauge","value":<float64>}
// with the unused field entirely absent.
impl Serialize for Metric {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.kind {
            MetricKind::Counter(delta) => {
                let mut s = serializer.serialize_struct("Metric", 3)?;
                s.serialize_field("id", &self.id)?;
                s.serialize_field("type", "counter")?;
                s.serialize_field("delta", &delta)?;
                s.end()
            }
            MetricKind::Gauge(value) => {
                let mut s = serializer.serialize_struct("Metric", 3)?;
                s.serialize_field("id", &self.id)?;
                s.serialize_field("type", "gauge")?;
                s.serialize_field("value", &value)?;
                s.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawMetric {
    id: String,
    #[serde(rename = "type")]
    mtype: String,
    delta: Option<i64>,
    value: Option<f64>,
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawMetric::deserialize(deserializer)?;
        let kind = match raw.mtype.as_str() {
            "counter" => {
                let delta = raw
                    .delta
                    .ok_or_else(|| DeError::custom("missing delta for counter metric"))?;
                MetricKind::Counter(delta)
            }
            "gauge" => {
                let value = raw
                    .value
                    .ok_or_else(|| DeError::custom("missing value for gauge metric"))?;
                MetricKind::Gauge(value)
            }
            other => return Err(DeError::custom(format!("unknown metric type: {other}"))),
        };
        Ok(Metric { id: raw.id, kind })
    }
}

/// The declared type of a metric lookup, used by `/value/` queries where the
/// value itself is not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Counter,
    Gauge,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Counter => write!(f, "counter"),
            MetricType::Gauge => write!(f, "gauge"),
        }
    }
}

impl std::str::FromStr for MetricType {
    type Err = crate::error::StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            _ => Err(crate::error::StoreError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_round_trips() {
        let m = Metric::counter("c0", 64);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"id":"c0","type":"counter","delta":64}"#);
        let back: Metric = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn gauge_round_trips() {
        let m = Metric::gauge("g0", 2.5);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"id":"g0","type":"gauge","value":2.5}"#);
        let back: Metric = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn display_matches_reference_format() {
        assert_eq!(Metric::counter("c0", 64).to_string(), "counter: c0 = 64");
        assert_eq!(Metric::gauge("g0", 64.0).to_string(), "gauge: g0 = 64.000000");
    }

    #[test]
    fn rejects_unknown_type() {
        let err = serde_json::from_str::<Metric>(r#"{"id":"x","type":"histogram"}"#);
        assert!(err.is_err());
    }
}
