// registers.rs
//
// The architectural register file plus its Register Alias Table: each
// register holds a current value and, while some in-flight instruction
// is due to produce its next value, the ROB index of that producer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A register's current status: its architectural value, and the ROB
/// entry (if any) that will next write it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegisterStatus {
    pub value: i64,
    pub producer: Option<usize>,
}

impl RegisterStatus {
    fn fresh() -> Self {
        Self { value: 0, producer: None }
    }
}

/// Architectural register values plus the per-register producer tag
/// (§3, §4.2). Auto-vivifies unknown register names on first write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFile {
    registers: BTreeMap<String, RegisterStatus>,
}

impl RegisterFile {
    /// Seeds a contiguous `R0..R{count-1}` prefix, all zero and
    /// unrenamed, matching §3's default register set.
    pub fn new(count: usize) -> Self {
        let mut registers = BTreeMap::new();
        for i in 0..count {
            registers.insert(format!("R{}", i), RegisterStatus::fresh());
        }
        Self { registers }
    }

    pub fn status(&self, reg: &str) -> RegisterStatus {
        self.registers.get(reg).copied().unwrap_or_else(RegisterStatus::fresh)
    }

    pub fn value(&self, reg: &str) -> i64 {
        self.status(reg).value
    }

    pub fn producer(&self, reg: &str) -> Option<usize> {
        self.status(reg).producer
    }

    /// Writes the architectural value, leaving the producer tag as-is.
    /// Used at commit, where clearing the tag is a separate, conditional
    /// step (the stale-producer rule lives with the caller, per §4.2).
    pub fn write_value(&mut self, reg: &str, value: i64) {
        self.registers.entry(reg.to_string()).or_insert_with(RegisterStatus::fresh).value = value;
    }

    /// Sets the producer tag for `reg` to `producer`, unconditionally.
    /// Called from Issue when a new RS/ROB slot is renaming this register.
    pub fn set_producer(&mut self, reg: &str, producer: usize) {
        self.registers.entry(reg.to_string()).or_insert_with(RegisterStatus::fresh).producer =
            Some(producer);
    }

    /// Clears the producer tag for `reg`, but only if it still matches
    /// `producer` — the stale-producer rule from §3/§4.1: a later
    /// instruction may already have claimed the register.
    pub fn clear_producer_if_matches(&mut self, reg: &str, producer: usize) {
        if let Some(status) = self.registers.get_mut(reg) {
            if status.producer == Some(producer) {
                status.producer = None;
            }
        }
    }

    /// Iterates registers in name order for the engine's query surface.
    pub fn iter(&self) -> impl Iterator<Item = (&str, RegisterStatus)> {
        self.registers.iter().map(|(name, status)| (name.as_str(), *status))
    }
}
