use std::collections::HashMap;

use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Host-level memory and per-core CPU gauges.
pub struct HostSampler {
    system: System,
}

impl HostSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::everything().with_cpu(CpuRefreshKind::everything()),
        );
        Self { system }
    }

    /// `TotalMemory`, `FreeMemory`, and one `CPUutilization<i>` gauge per
    /// logical CPU.
    pub fn sample(&mut self) -> HashMap<String, f64> {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();

        let mut gauges = HashMap::new();
        gauges.insert("TotalMemory".to_string(), self.system.total_memory() as f64);
        gauges.insert("FreeMemory".to_string(), self.system.free_memory() as f64);
        for (i, cpu) in self.system.cpus().iter().enumerate() {
            gauges.insert(format!("CPUutilization{i}"), cpu.cpu_usage() as f64);
        }
        gauges
    }
}

impl Default for HostSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_includes_memory_and_at_least_one_cpu() {
        let mut sampler = HostSampler::new();
        let gauges = sampler.sample();
        assert!(gauges.contains_key("TotalMemory"));
        assert!(gauges.contains_key("FreeMemory"));
        assert!(gauges.contains_key("CPUutilization0"));
    }
}
