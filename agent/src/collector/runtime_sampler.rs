use std::collections::HashMap;

use rand::rngs::OsRng;
use rand::RngCore;

use super::process_stats::{ProcessSampler, ProcessStats};

/// The fixed set of runtime gauge names this agent reports. Rust has no
/// garbage collector, so most of these have no real analogue; each is
/// mapped to a named accessor below, and an unmapped name fails startup
/// validation rather than silently reporting zero.
pub const RUNTIME_METRICS: &[&str] = &[
    "Alloc", "BuckHashSys", "Frees", "GCCPUFraction", "GCSys", "HeapAlloc", "HeapIdle", "HeapInuse", "HeapObjects",
    "HeapReleased", "HeapSys", "LastGC", "Lookups", "MCacheInuse", "MCacheSys", "MSpanInuse", "MSpanSys", "Mallocs",
    "NextGC", "NumForcedGC", "NumGC", "OtherSys", "PauseTotalNs", "StackInuse", "StackSys", "Sys", "TotalAlloc",
];

type Accessor = fn(&ProcessStats) -> f64;

fn accessor_table() -> HashMap<&'static str, Accessor> {
    let mut table: HashMap<&'static str, Accessor> = HashMap::new();
    table.insert("Alloc", |s| s.resident_bytes as f64);
    table.insert("TotalAlloc", |s| s.virtual_bytes as f64);
    table.insert("Sys", |s| s.virtual_bytes as f64);
    table.insert("HeapAlloc", |s| s.resident_bytes as f64);
    table.insert("HeapSys", |s| s.virtual_bytes as f64);
    table.insert("HeapIdle", |s| s.virtual_bytes.saturating_sub(s.resident_bytes) as f64);
    table.insert("HeapInuse", |s| s.resident_bytes as f64);
    // No per-allocation call counts are available from process-level OS
    // stats, unlike a GC-less runtime's own allocator; these stay zero.
    for name in [
        "HeapReleased",
        "HeapObjects",
        "Mallocs",
        "Frees",
        "BuckHashSys",
        "GCCPUFraction",
        "GCSys",
        "LastGC",
        "Lookups",
        "MCacheInuse",
        "MCacheSys",
        "MSpanInuse",
        "MSpanSys",
        "NextGC",
        "NumForcedGC",
        "NumGC",
        "OtherSys",
        "PauseTotalNs",
        "StackInuse",
        "StackSys",
    ] {
        table.insert(name, |_| 0.0);
    }
    table
}

#[derive(Debug, thiserror::Error)]
#[error("runtime metric '{0}' has no registered accessor")]
pub struct UnknownMetric(String);

/// Samples the runtime whitelist plus `RandomValue` into gauges, and
/// returns the `PollCount` increment (always 1 per poll).
pub struct RuntimeSampler {
    accessors: HashMap<&'static str, Accessor>,
    process: ProcessSampler,
}

impl RuntimeSampler {
    pub fn new() -> Result<Self, UnknownMetric> {
        let accessors = accessor_table();
        for name in RUNTIME_METRICS {
            if !accessors.contains_key(name) {
                return Err(UnknownMetric(name.to_string()));
            }
        }
        Ok(Self { accessors, process: ProcessSampler::new() })
    }

    /// One poll: whitelisted runtime gauges plus a fresh `RandomValue`
    /// drawn from a cryptographic RNG.
    pub fn sample(&mut self) -> HashMap<String, f64> {
        let stats = self.process.snapshot();
        let mut gauges: HashMap<String, f64> = RUNTIME_METRICS
            .iter()
            .map(|name| {
                let accessor = self.accessors[name];
                (name.to_string(), accessor(&stats))
            })
            .collect();
        gauges.insert("RandomValue".to_string(), random_value());
        gauges
    }
}

fn random_value() -> f64 {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    f64::from_bits(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_is_fully_covered() {
        RuntimeSampler::new().expect("every whitelisted metric must have an accessor");
    }

    #[test]
    fn sample_contains_every_whitelisted_name_and_random_value() {
        let mut sampler = RuntimeSampler::new().unwrap();
        let gauges = sampler.sample();
        for name in RUNTIME_METRICS {
            assert!(gauges.contains_key(*name), "missing gauge {name}");
        }
        assert!(gauges.contains_key("RandomValue"));
    }
}
