// engine.rs
//
// The cycle engine: orchestrates Commit, Write-Result, Execute and
// Issue in that fixed order every `step()`, and owns every other piece
// of simulator state (§4.1). This is the one component every boundary
// shell (parser, CLI, JSON report) is built around.

use super::cdb::CommonDataBus;
use super::config::EngineConfig;
use super::instruction::{FunctionalUnitClass, Instruction, OpKind, Operand};
use super::memory::Memory;
use super::metrics::Metrics;
use super::registers::RegisterFile;
use super::report::{CycleSnapshot, SimulationReport};
use super::reservation_station::{ReservationStation, StationState};
use super::rob::ReorderBuffer;
use super::snapshot::{EngineState, SnapshotStack};
use std::collections::BTreeMap;

/// Outcome of `run_to_end` (§6): lets a caller distinguish a clean
/// finish from a safety-cap bailout without promoting the latter to an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    CycleCapReached,
}

pub struct Engine {
    config: EngineConfig,
    state: EngineState,
    history: SnapshotStack,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut add_sub = Vec::new();
        let mut mul_div = Vec::new();
        let mut load_store = Vec::new();
        let mut branch = Vec::new();
        for i in 0..config.rs_count(FunctionalUnitClass::AddSub) {
            add_sub.push(ReservationStation::new(i));
        }
        for i in 0..config.rs_count(FunctionalUnitClass::MulDiv) {
            mul_div.push(ReservationStation::new(i));
        }
        for i in 0..config.rs_count(FunctionalUnitClass::LoadStore) {
            load_store.push(ReservationStation::new(i));
        }
        for i in 0..config.rs_count(FunctionalUnitClass::Branch) {
            branch.push(ReservationStation::new(i));
        }

        let state = EngineState {
            clock: 0,
            pc: 0,
            instructions: Vec::new(),
            add_sub,
            mul_div,
            load_store,
            branch,
            rob: ReorderBuffer::new(config.rob_size),
            registers: RegisterFile::new(config.register_count),
            memory: Memory::new(),
            cdb: CommonDataBus::new(),
            metrics: Metrics::default(),
            last_commit_warning: None,
            cycle_log: Vec::new(),
        };

        Self { config, state, history: SnapshotStack::new() }
    }

    /// Loads a fresh ordered program, discarding any prior run. Register
    /// and memory contents persist across loads intentionally — callers
    /// that want a clean architectural state construct a fresh `Engine`.
    pub fn load_program(&mut self, instructions: Vec<Instruction>) {
        self.state.instructions = instructions;
        self.state.pc = 0;
        self.state.clock = 0;
        self.history = SnapshotStack::new();
        log::info!("loaded program of {} instructions", self.state.instructions.len());
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- query surface (§6) ----------------------------------------

    pub fn clock(&self) -> u64 {
        self.state.clock
    }

    pub fn pc(&self) -> usize {
        self.state.pc
    }

    pub fn stall_count(&self) -> u64 {
        self.state.metrics.stalls
    }

    pub fn squash_count(&self) -> usize {
        self.state.metrics.squashed
    }

    pub fn speculative_count(&self) -> usize {
        self.state.instructions.iter().filter(|i| i.speculative && !i.is_retired()).count()
    }

    pub fn metrics(&self) -> Metrics {
        let mut m = self.state.metrics;
        m.cycles = self.state.clock;
        m.current_speculative = self.speculative_count();
        m
    }

    pub fn stations(&self, class: FunctionalUnitClass) -> &[ReservationStation] {
        self.state.stations(class)
    }

    pub fn rob(&self) -> &ReorderBuffer {
        &self.state.rob
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.state.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.state.memory
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.state.instructions
    }

    pub fn last_commit_warning(&self) -> Option<&str> {
        self.state.last_commit_warning.as_deref()
    }

    pub fn ipc(&self) -> f64 {
        self.metrics().ipc()
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// §4.1: done when every instruction has retired and both the ROB
    /// and every RS pool are empty.
    pub fn is_complete(&self) -> bool {
        let all_retired = self.state.instructions.iter().all(|i| i.is_retired());
        let rob_empty = self.state.rob.is_empty();
        let rs_free = FunctionalUnitClass::ALL
            .iter()
            .all(|&c| self.state.stations(c).iter().all(|rs| !rs.busy()));
        all_retired && rob_empty && rs_free
    }

    // ---- stepping ----------------------------------------------------

    /// Advances the clock by exactly one cycle, running Commit,
    /// Write-Result, Execute and Issue in that order (§4.1). A snapshot
    /// of the pre-step state is pushed first so `step_back` can undo it.
    pub fn step(&mut self) {
        self.history.push(&self.state);
        self.state.clock += 1;
        self.state.last_commit_warning = None;
        log::trace!("cycle {} begin", self.state.clock);

        // A station that Write-Result makes ready *this* cycle may not
        // start executing until the next one — only stations already
        // ready before this cycle's Commit/Write-Result ran are eligible.
        // Without this, CDB forwarding and functional-unit dispatch would
        // collapse onto the same cycle, one cycle faster than real
        // Tomasulo hardware allows.
        let ready_before: Vec<(FunctionalUnitClass, usize)> = FunctionalUnitClass::ALL
            .iter()
            .flat_map(|&class| {
                self.state
                    .stations(class)
                    .iter()
                    .enumerate()
                    .filter(|(_, rs)| rs.state == StationState::Ready)
                    .map(move |(slot, _)| (class, slot))
                    .collect::<Vec<_>>()
            })
            .collect();

        self.commit_stage();
        self.write_result_stage();
        self.execute_stage(&ready_before);
        self.issue_stage();

        let current = self.speculative_count();
        self.state.metrics.current_speculative = current;
        if current > self.state.metrics.peak_speculative {
            self.state.metrics.peak_speculative = current;
        }

        let snapshot = self.build_cycle_snapshot();
        self.state.cycle_log.push(snapshot);
    }

    fn build_cycle_snapshot(&self) -> CycleSnapshot {
        let mut stations = BTreeMap::new();
        for class in FunctionalUnitClass::ALL {
            stations.insert(class.to_string(), self.state.stations(class).to_vec());
        }
        let registers = self
            .state
            .registers
            .iter()
            .map(|(name, status)| (name.to_string(), status.value, status.producer))
            .collect();

        CycleSnapshot {
            clock: self.state.clock,
            instructions: self.state.instructions.clone(),
            stations,
            registers,
            speculative_count: self.speculative_count(),
            squashed_count: self.state.metrics.squashed,
            committed_count: self.state.metrics.committed,
            stall_count: self.state.metrics.stalls,
            ipc: self.ipc(),
        }
    }

    /// §6: serializes the accumulated per-cycle log plus final metrics
    /// into the shape an HTTP front-end shell expects — this crate
    /// never serves it, only produces the document.
    pub fn to_json_report(&self) -> SimulationReport {
        SimulationReport { cycles: self.state.cycle_log.clone(), metrics: self.metrics() }
    }

    /// Restores the most recently pushed snapshot, undoing the last
    /// `step()`. No-op if there is no history.
    pub fn step_back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.state = previous;
                true
            }
            None => false,
        }
    }

    /// Steps until `is_complete` or `max_cycles` (falling back to the
    /// configured safety cap) is reached.
    pub fn run_to_end(&mut self, max_cycles: Option<u64>) -> RunOutcome {
        let cap = max_cycles.unwrap_or(self.config.safety_cycle_cap);
        while !self.is_complete() {
            if self.state.clock >= cap {
                log::warn!("run_to_end hit the safety cap at cycle {}", self.state.clock);
                return RunOutcome::CycleCapReached;
            }
            self.step();
        }
        RunOutcome::Completed
    }

    // ---- Commit --------------------------------------------------------

    fn commit_stage(&mut self) {
        let head = match self.state.rob.head_index() {
            Some(h) => h,
            None => return,
        };
        let entry = self.state.rob.entry(head).clone();
        if !entry.ready {
            return;
        }
        let instr_id = match entry.instruction_id {
            Some(id) => id,
            None => return,
        };

        match entry.op {
            Some(OpKind::Store) => {
                if let (Some(addr), Some(val)) = (entry.store_address, entry.value) {
                    self.state.memory.write(addr, val);
                }
            }
            Some(OpKind::Beq) | Some(OpKind::Bne) => {
                self.resolve_branch_commit(head, instr_id);
            }
            _ => {
                if let Some(dest) = &entry.dest {
                    let value = entry.value.unwrap_or(0);
                    self.state.registers.write_value(dest, value);
                    self.state.registers.clear_producer_if_matches(dest, head);
                }
            }
        }

        self.state.instructions[instr_id].commit_cycle = Some(self.state.clock);
        self.state.metrics.committed += 1;
        self.state.rob.retire_head();
        log::debug!("commit instr {} rob {} at cycle {}", instr_id, head, self.state.clock);
    }

    /// §4.1 Commit / §7 failure mode 5: resolves a branch's speculation.
    /// A valid target squashes every instruction issued after the
    /// branch and still in flight, and resumes fetch at the target. An
    /// out-of-range target leaves the branch committed (architectural
    /// state for a branch is just "it happened") but performs no squash
    /// and no PC redirection, recording a warning instead.
    fn resolve_branch_commit(&mut self, rob_index: usize, instr_id: usize) {
        let target = self.state.instructions[instr_id].branch_target;
        let target_id = match target {
            Some(t) if t < self.state.instructions.len() => t,
            _ => {
                let warning = format!(
                    "branch instr {} has out-of-range target {:?}; commit proceeds without squash",
                    instr_id, target
                );
                log::warn!("{}", warning);
                self.state.last_commit_warning = Some(warning);
                return;
            }
        };

        let freed = self.state.rob.squash_after(rob_index);
        for (freed_rob_index, freed_instr_id, dest) in &freed {
            self.state.instructions[*freed_instr_id].squashed = true;
            self.free_rs_bound_to_instruction(*freed_instr_id);
            if let Some(d) = dest {
                self.state.registers.clear_producer_if_matches(d, *freed_rob_index);
            }
        }
        self.state.metrics.squashed += freed.len();

        for instr in self.state.instructions.iter_mut() {
            if instr.speculative_branch_id == Some(instr_id) {
                instr.clear_speculative();
            }
        }

        self.state.pc = target_id;
        log::info!(
            "branch instr {} taken: squashed {} instruction(s), resuming at {}",
            instr_id,
            freed.len(),
            target_id
        );
    }

    fn free_rs_bound_to_instruction(&mut self, instr_id: usize) {
        for class in FunctionalUnitClass::ALL {
            for rs in self.state.stations_mut(class) {
                if rs.instruction_id == Some(instr_id) {
                    rs.free();
                }
            }
        }
    }

    // ---- Write-Result ----------------------------------------------

    fn write_result_stage(&mut self) {
        self.state.cdb.clear();
        loop {
            let candidate = self.first_done_station();
            let (class, slot) = match candidate {
                Some(pos) => pos,
                None => break,
            };

            let instr_id = self.state.stations(class)[slot].instruction_id.unwrap();
            if self.state.instructions[instr_id].squashed {
                self.state.stations_mut(class)[slot].free();
                continue;
            }

            let rs = self.state.stations(class)[slot].clone();
            let rob_index = rs.rob_entry.unwrap();
            let value = rs.result.unwrap_or(0);

            self.state.cdb.broadcast(rob_index, value);
            self.state.instructions[instr_id].write_result_cycle = Some(self.state.clock);

            for other_class in FunctionalUnitClass::ALL {
                for other in self.state.stations_mut(other_class) {
                    if other.qj == Some(rob_index) {
                        other.set_vj(value);
                    }
                    if other.qk == Some(rob_index) {
                        other.set_vk(value);
                    }
                }
            }

            {
                let entry = self.state.rob.entry_mut(rob_index);
                entry.value = Some(value);
                entry.store_address = rs.effective_address.or(entry.store_address);
                entry.ready = true;
                if let Some(dest) = entry.dest.clone() {
                    self.state.registers.clear_producer_if_matches(&dest, rob_index);
                }
            }

            self.state.stations_mut(class)[slot].free();
            log::debug!(
                "write-result instr {} rob {} value {} at cycle {}",
                instr_id,
                rob_index,
                value,
                self.state.clock
            );
            break;
        }
    }

    /// First RS (in deterministic class/slot order) whose execution has
    /// finished and not yet been drained — including squashed ones,
    /// which the caller frees without counting as the cycle's writer.
    fn first_done_station(&self) -> Option<(FunctionalUnitClass, usize)> {
        for class in FunctionalUnitClass::ALL {
            for (slot, rs) in self.state.stations(class).iter().enumerate() {
                if rs.state == StationState::Done {
                    return Some((class, slot));
                }
            }
        }
        None
    }

    // ---- Execute -----------------------------------------------------

    fn execute_stage(&mut self, ready_before: &[(FunctionalUnitClass, usize)]) {
        for class in FunctionalUnitClass::ALL {
            let len = self.state.stations(class).len();
            for slot in 0..len {
                let eligible = ready_before.contains(&(class, slot));
                self.execute_one(class, slot, eligible);
            }
        }
    }

    fn execute_one(&mut self, class: FunctionalUnitClass, slot: usize, eligible_to_start: bool) {
        let state = self.state.stations(class)[slot].state;
        match state {
            StationState::Ready if eligible_to_start => {
                let instr_id = self.state.stations(class)[slot].instruction_id.unwrap();
                self.state.stations_mut(class)[slot].start_execution();
                self.state.instructions[instr_id].exec_start_cycle = Some(self.state.clock);
                log::trace!("exec-start instr {} at cycle {}", instr_id, self.state.clock);
                self.tick_residual_latency(class, slot);
            }
            StationState::Executing => {
                self.tick_residual_latency(class, slot);
            }
            _ => {}
        }
    }

    fn tick_residual_latency(&mut self, class: FunctionalUnitClass, slot: usize) {
        let instr_id = self.state.stations(class)[slot].instruction_id.unwrap();
        let instr = &mut self.state.instructions[instr_id];
        if instr.residual_latency == 0 {
            return;
        }
        instr.residual_latency -= 1;
        if instr.residual_latency > 0 {
            return;
        }
        instr.exec_end_cycle = Some(self.state.clock);
        let (op, src1, src2, offset) = (instr.op, instr.src1.clone(), instr.src2.clone(), instr.offset);

        let rs = self.state.stations(class)[slot].clone();
        let vj = rs.vj.unwrap_or(0);
        let vk = rs.vk.unwrap_or(0);

        let (result, effective_address) = match op {
            OpKind::Add => (vj.wrapping_add(vk), None),
            OpKind::Sub => (vj.wrapping_sub(vk), None),
            OpKind::Mul => (vj.wrapping_mul(vk), None),
            OpKind::Div => {
                if vk == 0 {
                    (0, None)
                } else {
                    (vj.wrapping_div(vk), None)
                }
            }
            OpKind::Load => {
                let address = vj + offset;
                (self.state.memory.read(address), Some(address))
            }
            OpKind::Store => {
                let address = vj + offset;
                (vk, Some(address))
            }
            OpKind::Beq | OpKind::Bne => (1, None),
        };
        let _ = (src1, src2);

        if op.is_branch() {
            let instr = &mut self.state.instructions[instr_id];
            instr.branch_taken = true;
            instr.branch_resolved = true;
        }

        self.state.stations_mut(class)[slot].finish_execution(result, effective_address);
        log::trace!("exec-end instr {} at cycle {}", instr_id, self.state.clock);
    }

    // ---- Issue ---------------------------------------------------------

    fn issue_stage(&mut self) {
        if self.state.pc >= self.state.instructions.len() {
            return;
        }
        let id = self.state.pc;
        if self.state.instructions[id].squashed || self.state.instructions[id].is_issued() {
            self.state.pc += 1;
            return;
        }

        let op = self.state.instructions[id].op;
        let class = op.fu_class();

        if self.state.rob.is_full() {
            self.state.metrics.stalls += 1;
            log::trace!("stall at cycle {}: ROB full", self.state.clock);
            return;
        }

        let rs_slot = self.state.stations(class).iter().position(|rs| !rs.busy());
        let rs_slot = match rs_slot {
            Some(s) => s,
            None => {
                self.state.metrics.stalls += 1;
                log::trace!("stall at cycle {}: no free {} station", self.state.clock, class);
                return;
            }
        };

        let src1 = self.state.instructions[id].src1.clone();
        let src2 = self.state.instructions[id].src2.clone();
        let (vj, qj) = self.resolve_operand(&src1);
        let (vk, qk) = self.resolve_operand(&src2);

        let enclosing_branch = self.enclosing_unresolved_branch(id);
        let dest = if op.is_store() { None } else { self.state.instructions[id].dest.clone() };

        let rob_index = self.state.rob.allocate(id, op, dest.clone(), enclosing_branch.is_some());
        self.state.stations_mut(class)[rs_slot].assign(id, vj, qj, vk, qk, Some(rob_index));

        if let Some(d) = &dest {
            self.state.registers.set_producer(d, rob_index);
        }

        let latency = self.config.latency(class);
        let instr = &mut self.state.instructions[id];
        instr.original_latency = latency;
        instr.residual_latency = latency;
        instr.issue_cycle = Some(self.state.clock);
        if let Some(branch_id) = enclosing_branch {
            instr.set_speculative(branch_id);
        }

        log::debug!("issue instr {} ({}) into rob {} at cycle {}", id, op, rob_index, self.state.clock);
        self.state.pc += 1;
    }

    fn resolve_operand(&self, operand: &Operand) -> (Option<i64>, Option<usize>) {
        match operand {
            Operand::Imm(v) => (Some(*v), None),
            Operand::None => (Some(0), None),
            Operand::Reg(name) => match self.state.registers.producer(name) {
                Some(producer) => (None, Some(producer)),
                None => (Some(self.state.registers.value(name)), None),
            },
        }
    }

    /// §4.1: "speculative iff the engine is currently in a speculative
    /// window". Scans backward from the instruction about to issue for
    /// the nearest preceding branch that hasn't yet committed or been
    /// squashed — matching the ancestor engine's scan rather than
    /// maintaining a separate window stack, since nested unresolved
    /// branches are just nested preceding scan hits.
    fn enclosing_unresolved_branch(&self, before_id: usize) -> Option<usize> {
        self.state.instructions[..before_id].iter().rev().find_map(|prior| {
            if prior.op.is_branch() && !prior.is_committed() && !prior.squashed {
                Some(prior.id)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instruction::Operand;

    fn add(id: usize, dest: &str, a: &str, b: &str) -> Instruction {
        Instruction::new(id, OpKind::Add, Some(dest.into()), Operand::Reg(a.into()), Operand::Reg(b.into()), 0, None)
    }

    fn div(id: usize, dest: &str, a: &str, b: &str) -> Instruction {
        Instruction::new(id, OpKind::Div, Some(dest.into()), Operand::Reg(a.into()), Operand::Reg(b.into()), 0, None)
    }

    #[test]
    fn empty_program_is_complete_immediately_with_zero_ipc() {
        let mut engine = Engine::new(EngineConfig::new());
        engine.load_program(Vec::new());
        assert!(engine.is_complete());
        assert_eq!(engine.ipc(), 0.0);
    }

    #[test]
    fn structural_hazard_stalls_issue_without_corrupting_state() {
        // Only one ADD_SUB station: the second ADD cannot issue until the
        // first vacates it, so Issue stalls (§8 "exhaustion of an RS class").
        let config = EngineConfig::new().with_rs_count(FunctionalUnitClass::AddSub, 1);
        let mut engine = Engine::new(config);
        engine.load_program(vec![add(0, "R1", "R2", "R3"), add(1, "R4", "R5", "R6")]);
        engine.run_to_end(Some(1_000));
        assert!(engine.stall_count() >= 1);
        let first = engine.instructions()[0].commit_cycle.unwrap();
        let second = engine.instructions()[1].commit_cycle.unwrap();
        assert!(first < second);
    }

    #[test]
    fn division_by_zero_yields_zero_instead_of_panicking() {
        let config = EngineConfig::new().with_rs_count(FunctionalUnitClass::MulDiv, 1);
        let mut engine = Engine::new(config);
        engine.load_program(vec![div(0, "R1", "R2", "R3")]);
        engine.run_to_end(Some(1_000));
        assert_eq!(engine.registers().value("R1"), 0);
    }

    #[test]
    fn step_back_undoes_exactly_one_step() {
        let mut engine = Engine::new(EngineConfig::new());
        engine.load_program(vec![add(0, "R1", "R2", "R3")]);
        engine.step();
        engine.step();
        let clock_before = engine.clock();
        let pc_before = engine.pc();
        assert!(engine.step_back());
        assert_eq!(engine.clock(), clock_before - 1);
        engine.step();
        assert_eq!(engine.clock(), clock_before);
        assert_eq!(engine.pc(), pc_before);
    }

    #[test]
    fn step_back_with_empty_history_is_a_no_op() {
        let mut engine = Engine::new(EngineConfig::new());
        engine.load_program(vec![add(0, "R1", "R2", "R3")]);
        assert!(!engine.step_back());
    }

    #[test]
    fn out_of_range_branch_target_commits_without_squashing() {
        let config = EngineConfig::new().with_rs_count(FunctionalUnitClass::Branch, 1);
        let mut engine = Engine::new(config);
        let beq = Instruction::new(0, OpKind::Beq, None, Operand::Reg("R0".into()), Operand::Reg("R0".into()), 0, Some(99));
        engine.load_program(vec![beq]);
        let outcome = engine.run_to_end(Some(1_000));
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(engine.squash_count(), 0);
        assert!(engine.last_commit_warning().is_some());
    }

    #[test]
    fn run_to_end_reports_cycle_cap_reached_without_corrupting_state() {
        let mut engine = Engine::new(EngineConfig::new().with_rs_count(FunctionalUnitClass::AddSub, 1));
        engine.load_program(vec![add(0, "R1", "R2", "R3"), add(1, "R4", "R5", "R6")]);
        let outcome = engine.run_to_end(Some(2));
        assert_eq!(outcome, RunOutcome::CycleCapReached);
        assert_eq!(engine.clock(), 2);
        assert!(!engine.is_complete());
    }
}
