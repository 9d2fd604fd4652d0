// memory.rs
//
// A flat, sparse address space backing LOAD/STORE. No alignment checks,
// no byte/word distinction — programs in this domain touch a handful of
// scattered addresses, not a dense image, so a hash map suits the access
// pattern better than the teacher's fixed-size byte array.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Memory {
    cells: BTreeMap<i64, i64>,
}

impl Memory {
    pub fn new() -> Self {
        Self { cells: BTreeMap::new() }
    }

    /// Unmapped addresses read as 0 (§7 semantic quirk, not an error).
    pub fn read(&self, address: i64) -> i64 {
        self.cells.get(&address).copied().unwrap_or(0)
    }

    /// Auto-vivifies the entry.
    pub fn write(&mut self, address: i64, value: i64) {
        self.cells.insert(address, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.cells.iter().map(|(&a, &v)| (a, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_address_reads_as_zero() {
        let mem = Memory::new();
        assert_eq!(mem.read(12), 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut mem = Memory::new();
        mem.write(100, -7);
        assert_eq!(mem.read(100), -7);
        assert_eq!(mem.read(104), 0);
    }

    #[test]
    fn write_auto_vivifies_and_overwrites() {
        let mut mem = Memory::new();
        mem.write(8, 1);
        mem.write(8, 2);
        assert_eq!(mem.read(8), 2);
        assert_eq!(mem.iter().count(), 1);
    }
}
