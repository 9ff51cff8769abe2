//! Host sampler: reads CPU and memory counters through sysinfo and builds a
//! [`Snapshot`] from a single refresh pass.

use std::panic::{catch_unwind, AssertUnwindSafe};

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::SamplingError;
use crate::types::Snapshot;

/// Produces a snapshot of the current host state.
pub trait Sampler {
    fn sample(&mut self) -> Result<Snapshot, SamplingError>;
}

/// One processor's reading: frequency (MHz) and usage (%).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreReading {
    pub frequency: f64,
    pub usage: f64,
}

/// Sum per-core frequency into total and per-core usage into used.
pub fn cpu_amount<I>(cores: I) -> (f64, f64)
where
    I: IntoIterator<Item = CoreReading>,
{
    cores.into_iter().fold((0.0, 0.0), |(total, used), c| {
        (total + c.frequency, used + c.usage)
    })
}

/// Current unix time in whole seconds.
pub fn unix_now() -> Result<u64, SamplingError> {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).map_err(|_| SamplingError::Clock)
}

pub struct SysinfoSampler {
    sys: System,
}

impl SysinfoSampler {
    /// Build the sysinfo handle and take a baseline CPU reading, so the
    /// first sample carries real usage numbers instead of zeros.
    ///
    /// Blocks the calling thread for `sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`;
    /// call it before starting an async runtime, not from inside one.
    pub fn new() -> Result<Self, SamplingError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SamplingError::Unsupported);
        }
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());
        let sys = guarded(|| System::new_with_specifics(refresh_kind))?;
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        Ok(Self { sys })
    }
}

impl Sampler for SysinfoSampler {
    fn sample(&mut self) -> Result<Snapshot, SamplingError> {
        let sys = &mut self.sys;
        guarded(|| {
            sys.refresh_cpu_specifics(CpuRefreshKind::everything());
            sys.refresh_memory();
        })?;

        let cpus = self.sys.cpus();
        if cpus.is_empty() {
            return Err(SamplingError::NoProcessors);
        }
        let total_memory = self.sys.total_memory();
        if total_memory == 0 {
            return Err(SamplingError::NoMemory);
        }

        let (total_cpu, used_cpu) = cpu_amount(cpus.iter().map(|c| CoreReading {
            frequency: c.frequency() as f64,
            usage: f64::from(c.cpu_usage()),
        }));
        let snapshot = Snapshot {
            total_cpu,
            used_cpu,
            used_memory: self.sys.used_memory(),
            total_memory,
            timestamp: unix_now()?,
        };
        debug!(cores = cpus.len(), ?snapshot, "sampled host");
        Ok(snapshot)
    }
}

// sysinfo can panic on odd /proc or sysctl contents; surface that as an error.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, SamplingError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|e| {
        let msg = e
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| e.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".into());
        SamplingError::Refresh(msg)
    })
}
