// metrics.rs
//
// Derived performance counters: IPC, stalls, squashes, peak speculative
// count. Read-only snapshots of the engine's running counters — kept
// separate from the engine so the query surface (§6) and the HTTP
// report shape (§1) can share one type.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub cycles: u64,
    pub committed: usize,
    pub stalls: u64,
    pub squashed: usize,
    pub current_speculative: usize,
    pub peak_speculative: usize,
}

impl Metrics {
    pub fn ipc(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            self.committed as f64 / self.cycles as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} committed={} ipc={:.3} stalls={} squashed={} speculative={} (peak {})",
            self.cycles,
            self.committed,
            self.ipc(),
            self.stalls,
            self.squashed,
            self.current_speculative,
            self.peak_speculative,
        )
    }
}
