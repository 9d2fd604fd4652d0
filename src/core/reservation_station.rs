// reservation_station.rs
//
// One slot of a functional-unit queue. Tracks bound instruction,
// operand values/tags, and residual latency; never talks to another RS
// directly — all transitions are driven by the cycle engine (§4.3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationState {
    Free,
    Waiting,   // at least one of Qj/Qk still pending
    Ready,     // both operands resolved, not yet dispatched to execute
    Executing, // residual latency draining
    Done,      // exec_end stamped, waiting for Write-Result to drain it
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationStation {
    pub pool_index: usize,
    pub state: StationState,
    pub instruction_id: Option<usize>,
    pub vj: Option<i64>,
    pub qj: Option<usize>,
    pub vk: Option<i64>,
    pub qk: Option<usize>,
    pub rob_entry: Option<usize>,
    pub result: Option<i64>,
    pub effective_address: Option<i64>,
}

impl ReservationStation {
    pub fn new(pool_index: usize) -> Self {
        Self {
            pool_index,
            state: StationState::Free,
            instruction_id: None,
            vj: None,
            qj: None,
            vk: None,
            qk: None,
            rob_entry: None,
            result: None,
            effective_address: None,
        }
    }

    pub fn busy(&self) -> bool {
        self.state != StationState::Free
    }

    /// True iff both in-use operand slots carry a value and no Q is
    /// still pending (§3's RS "ready to execute" invariant).
    pub fn ready_to_execute(&self) -> bool {
        self.busy() && self.qj.is_none() && self.qk.is_none()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn assign(
        &mut self,
        instruction_id: usize,
        vj: Option<i64>,
        qj: Option<usize>,
        vk: Option<i64>,
        qk: Option<usize>,
        rob_entry: Option<usize>,
    ) {
        self.instruction_id = Some(instruction_id);
        self.vj = vj;
        self.qj = qj;
        self.vk = vk;
        self.qk = qk;
        self.rob_entry = rob_entry;
        self.result = None;
        self.effective_address = None;
        self.state = if qj.is_none() && qk.is_none() {
            StationState::Ready
        } else {
            StationState::Waiting
        };
    }

    pub fn set_vj(&mut self, value: i64) {
        self.vj = Some(value);
        self.qj = None;
        if self.busy() && self.ready_to_execute() && self.state == StationState::Waiting {
            self.state = StationState::Ready;
        }
    }

    pub fn set_vk(&mut self, value: i64) {
        self.vk = Some(value);
        self.qk = None;
        if self.busy() && self.ready_to_execute() && self.state == StationState::Waiting {
            self.state = StationState::Ready;
        }
    }

    pub fn start_execution(&mut self) {
        if self.state == StationState::Ready {
            self.state = StationState::Executing;
        }
    }

    pub fn finish_execution(&mut self, result: i64, effective_address: Option<i64>) {
        self.result = Some(result);
        self.effective_address = effective_address;
        self.state = StationState::Done;
    }

    /// Idempotent reset back to Free — safe to call on an already-free
    /// station.
    pub fn free(&mut self) {
        *self = ReservationStation::new(self.pool_index);
    }
}
