use sysinfo::{Pid, System};

/// Per-process memory figures sampled from the OS, standing in for the
/// allocator/GC counters a garbage-collected runtime would expose natively.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStats {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

/// Re-reads this process's own memory figures on each `snapshot()`.
pub struct ProcessSampler {
    system: System,
    pid: Pid,
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().expect("current process must have a pid");
        let mut system = System::new();
        system.refresh_process(pid);
        Self { system, pid }
    }

    pub fn snapshot(&mut self) -> ProcessStats {
        self.system.refresh_process(self.pid);
        match self.system.process(self.pid) {
            Some(process) => ProcessStats {
                resident_bytes: process.memory(),
                virtual_bytes: process.virtual_memory(),
            },
            None => ProcessStats::default(),
        }
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}
