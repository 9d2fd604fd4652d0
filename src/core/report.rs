// report.rs
//
// JSON serialization shape for an HTTP/front-end shell (§6): one
// `CycleSnapshot` per `step()`, rolled up into a `SimulationReport`. The
// core only emits these through `Engine::to_json_report`; it serves no
// HTTP itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::instruction::Instruction;
use super::metrics::Metrics;
use super::reservation_station::ReservationStation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub clock: u64,
    pub instructions: Vec<Instruction>,
    pub stations: BTreeMap<String, Vec<ReservationStation>>,
    pub registers: Vec<(String, i64, Option<usize>)>,
    pub speculative_count: usize,
    pub squashed_count: usize,
    pub committed_count: usize,
    pub stall_count: u64,
    pub ipc: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub cycles: Vec<CycleSnapshot>,
    pub metrics: Metrics,
}
