// snapshot.rs
//
// Deep-copied engine state plus the LIFO stack that backs step_back().
// Every cross-reference inside `EngineState` (an RS's instruction_id, a
// ROB entry's instruction_id, a register's producer tag) is a plain
// index into one of this same struct's owned Vecs, so cloning it is a
// structural, alias-free copy — no pointer chasing, per §9's design note.

use super::cdb::CommonDataBus;
use super::instruction::{FunctionalUnitClass, Instruction};
use super::memory::Memory;
use super::metrics::Metrics;
use super::registers::RegisterFile;
use super::report::CycleSnapshot;
use super::reservation_station::ReservationStation;
use super::rob::ReorderBuffer;

#[derive(Debug, Clone)]
pub struct EngineState {
    pub clock: u64,
    pub pc: usize,
    pub instructions: Vec<Instruction>,
    pub add_sub: Vec<ReservationStation>,
    pub mul_div: Vec<ReservationStation>,
    pub load_store: Vec<ReservationStation>,
    pub branch: Vec<ReservationStation>,
    pub rob: ReorderBuffer,
    pub registers: RegisterFile,
    pub memory: Memory,
    pub cdb: CommonDataBus,
    pub metrics: Metrics,
    pub last_commit_warning: Option<String>,
    /// One entry per completed `step()`, consumed by `to_json_report`.
    /// Part of `EngineState` (rather than a separate field on `Engine`)
    /// so it rolls back correctly under `step_back`.
    pub cycle_log: Vec<CycleSnapshot>,
}

impl EngineState {
    pub fn stations(&self, class: FunctionalUnitClass) -> &Vec<ReservationStation> {
        match class {
            FunctionalUnitClass::AddSub => &self.add_sub,
            FunctionalUnitClass::MulDiv => &self.mul_div,
            FunctionalUnitClass::LoadStore => &self.load_store,
            FunctionalUnitClass::Branch => &self.branch,
        }
    }

    pub fn stations_mut(&mut self, class: FunctionalUnitClass) -> &mut Vec<ReservationStation> {
        match class {
            FunctionalUnitClass::AddSub => &mut self.add_sub,
            FunctionalUnitClass::MulDiv => &mut self.mul_div,
            FunctionalUnitClass::LoadStore => &mut self.load_store,
            FunctionalUnitClass::Branch => &mut self.branch,
        }
    }
}

/// Last-in-first-out stack of deep engine-state copies (§4.5). Pushed
/// at the top of every `step()`; popped and restored by `step_back()`.
#[derive(Debug, Default)]
pub struct SnapshotStack {
    history: Vec<EngineState>,
}

impl SnapshotStack {
    pub fn new() -> Self {
        Self { history: Vec::new() }
    }

    pub fn push(&mut self, state: &EngineState) {
        self.history.push(state.clone());
    }

    pub fn pop(&mut self) -> Option<EngineState> {
        self.history.pop()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_state(clock: u64) -> EngineState {
        EngineState {
            clock,
            pc: 0,
            instructions: Vec::new(),
            add_sub: Vec::new(),
            mul_div: Vec::new(),
            load_store: Vec::new(),
            branch: Vec::new(),
            rob: ReorderBuffer::new(16),
            registers: RegisterFile::new(32),
            memory: Memory::new(),
            cdb: CommonDataBus::new(),
            metrics: Metrics::default(),
            last_commit_warning: None,
            cycle_log: Vec::new(),
        }
    }

    #[test]
    fn stations_and_stations_mut_route_to_the_right_pool() {
        let mut state = bare_state(0);
        state.mul_div.push(ReservationStation::new(0));
        assert_eq!(state.stations(FunctionalUnitClass::MulDiv).len(), 1);
        assert!(state.stations(FunctionalUnitClass::AddSub).is_empty());
        state.stations_mut(FunctionalUnitClass::Branch).push(ReservationStation::new(0));
        assert_eq!(state.stations(FunctionalUnitClass::Branch).len(), 1);
    }

    #[test]
    fn push_then_pop_round_trips_a_clone() {
        let mut stack = SnapshotStack::new();
        assert!(stack.is_empty());
        let state = bare_state(7);
        stack.push(&state);
        assert_eq!(stack.len(), 1);
        assert!(!stack.is_empty());
        let popped = stack.pop().unwrap();
        assert_eq!(popped.clock, 7);
        assert!(stack.is_empty());
    }

    #[test]
    fn stack_is_lifo_across_several_pushes() {
        let mut stack = SnapshotStack::new();
        stack.push(&bare_state(1));
        stack.push(&bare_state(2));
        stack.push(&bare_state(3));
        assert_eq!(stack.pop().unwrap().clock, 3);
        assert_eq!(stack.pop().unwrap().clock, 2);
        assert_eq!(stack.pop().unwrap().clock, 1);
        assert!(stack.pop().is_none());
    }

    #[test]
    fn pop_on_empty_stack_returns_none() {
        let mut stack = SnapshotStack::new();
        assert!(stack.pop().is_none());
    }

    #[test]
    fn push_clones_so_later_mutation_does_not_affect_the_snapshot() {
        let mut stack = SnapshotStack::new();
        let mut state = bare_state(0);
        stack.push(&state);
        state.clock = 42;
        assert_eq!(stack.pop().unwrap().clock, 0);
    }
}
