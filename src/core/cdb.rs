// cdb.rs
//
// The Common Data Bus: a transient per-cycle (producer ROB index,
// value) pair. Never persisted across cycles — `step()` clears it
// before Write-Result runs and fills it in at most once per cycle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CommonDataBus {
    pub payload: Option<(usize, i64)>,
}

impl CommonDataBus {
    pub fn new() -> Self {
        Self { payload: None }
    }

    pub fn broadcast(&mut self, producer_rob: usize, value: i64) {
        self.payload = Some((producer_rob, value));
    }

    pub fn clear(&mut self) {
        self.payload = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(CommonDataBus::new().payload, None);
    }

    #[test]
    fn broadcast_then_clear() {
        let mut cdb = CommonDataBus::new();
        cdb.broadcast(4, 99);
        assert_eq!(cdb.payload, Some((4, 99)));
        cdb.clear();
        assert_eq!(cdb.payload, None);
    }
}
