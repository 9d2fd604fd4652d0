// Core engine: the part of this crate that has no idea a parser, a CLI,
// or JSON serialization exist. See module docs on `engine` for the
// cycle-by-cycle contract.

pub mod cdb;
pub mod config;
pub mod engine;
pub mod instruction;
pub mod memory;
pub mod metrics;
pub mod registers;
pub mod report;
pub mod reservation_station;
pub mod rob;
pub mod snapshot;

pub use cdb::CommonDataBus;
pub use config::EngineConfig;
pub use engine::{Engine, RunOutcome};
pub use instruction::{FunctionalUnitClass, Instruction, OpKind, Operand};
pub use memory::Memory;
pub use metrics::Metrics;
pub use registers::{RegisterFile, RegisterStatus};
pub use report::{CycleSnapshot, SimulationReport};
pub use reservation_station::{ReservationStation, StationState};
pub use rob::{ReorderBuffer, RobEntry};
pub use snapshot::EngineState;
