// config.rs
//
// Engine construction parameters: reservation-station pool sizes,
// per-class latencies, ROB size, and the register-file width. Mirrors
// the builder-with-validation shape of the ancestor pipeline/cache
// configs this simulator's config layer grew from.

use crate::errors::SimulatorError;
use crate::core::instruction::FunctionalUnitClass;
use std::collections::HashMap;

/// Default per-class latencies and pool sizes match §8's scenario
/// defaults: ADD/SUB = 2, MUL/DIV = 3, LOAD/STORE = 6, BRANCH = 4, one
/// RS per class.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rs_counts: HashMap<FunctionalUnitClass, usize>,
    pub latencies: HashMap<FunctionalUnitClass, u64>,
    pub rob_size: usize,
    pub register_count: usize,
    pub safety_cycle_cap: u64,
}

impl EngineConfig {
    pub fn new() -> Self {
        let mut rs_counts = HashMap::new();
        let mut latencies = HashMap::new();
        for class in FunctionalUnitClass::ALL {
            rs_counts.insert(class, 1);
        }
        latencies.insert(FunctionalUnitClass::AddSub, 2);
        latencies.insert(FunctionalUnitClass::MulDiv, 3);
        latencies.insert(FunctionalUnitClass::LoadStore, 6);
        latencies.insert(FunctionalUnitClass::Branch, 4);

        Self { rs_counts, latencies, rob_size: 16, register_count: 32, safety_cycle_cap: 100_000 }
    }

    pub fn with_rs_count(mut self, class: FunctionalUnitClass, count: usize) -> Self {
        self.rs_counts.insert(class, count);
        self
    }

    pub fn with_latency(mut self, class: FunctionalUnitClass, cycles: u64) -> Self {
        self.latencies.insert(class, cycles);
        self
    }

    pub fn with_rob_size(mut self, size: usize) -> Self {
        self.rob_size = size;
        self
    }

    pub fn with_register_count(mut self, count: usize) -> Self {
        self.register_count = count;
        self
    }

    pub fn with_safety_cycle_cap(mut self, cap: u64) -> Self {
        self.safety_cycle_cap = cap;
        self
    }

    pub fn rs_count(&self, class: FunctionalUnitClass) -> usize {
        self.rs_counts.get(&class).copied().unwrap_or(1)
    }

    pub fn latency(&self, class: FunctionalUnitClass) -> u64 {
        self.latencies.get(&class).copied().unwrap_or(1)
    }

    /// §6: "All values are positive integers." Checked explicitly rather
    /// than left to panic on underflow deep inside the engine.
    pub fn validate(&self) -> Result<(), SimulatorError> {
        for class in FunctionalUnitClass::ALL {
            if self.rs_count(class) == 0 {
                return Err(SimulatorError::InvalidConfig(format!(
                    "reservation-station pool for {} must have at least 1 slot",
                    class
                )));
            }
            if self.latency(class) == 0 {
                return Err(SimulatorError::InvalidConfig(format!(
                    "latency for {} must be positive",
                    class
                )));
            }
        }
        if self.rob_size == 0 {
            return Err(SimulatorError::InvalidConfig("ROB size must be positive".to_string()));
        }
        if self.register_count == 0 {
            return Err(SimulatorError::InvalidConfig("register count must be positive".to_string()));
        }
        Ok(())
    }
}


impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
