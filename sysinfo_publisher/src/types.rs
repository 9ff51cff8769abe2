//! Data types published to the broker.
//! Keep this module minimal and stable: it defines the wire format.

use serde::{Deserialize, Serialize};

/// One sampled measurement of host CPU and memory state.
///
/// Field order here is the field order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    // sum of per-core frequencies (MHz), a capacity measure
    pub total_cpu: f64,
    // sum of per-core usage percentages
    pub used_cpu: f64,
    pub used_memory: u64,
    pub total_memory: u64,
    // unix epoch seconds
    pub timestamp: u64,
}
