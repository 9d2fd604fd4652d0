// instruction.rs
//
// The decoded instruction record: an immutable op plus the mutable
// per-stage timestamps and speculation bookkeeping the cycle engine
// stamps onto it as it moves through Issue, Execute, Write-Result and
// Commit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The eight operations this machine understands. Immediate forms of
/// ADD/SUB are the same variant as the register forms — the second
/// operand just happens to be an `Operand::Imm` rather than `Operand::Reg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Div,
    Load,
    Store,
    Beq,
    Bne,
}

impl OpKind {
    pub fn is_branch(self) -> bool {
        matches!(self, OpKind::Beq | OpKind::Bne)
    }

    pub fn is_store(self) -> bool {
        matches!(self, OpKind::Store)
    }

    /// The functional-unit class that owns this op's reservation-station
    /// pool. LOAD and STORE share one pool (`LoadStore`) per §6.
    pub fn fu_class(self) -> FunctionalUnitClass {
        match self {
            OpKind::Add | OpKind::Sub => FunctionalUnitClass::AddSub,
            OpKind::Mul | OpKind::Div => FunctionalUnitClass::MulDiv,
            OpKind::Load | OpKind::Store => FunctionalUnitClass::LoadStore,
            OpKind::Beq | OpKind::Bne => FunctionalUnitClass::Branch,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpKind::Add => "ADD",
            OpKind::Sub => "SUB",
            OpKind::Mul => "MUL",
            OpKind::Div => "DIV",
            OpKind::Load => "LOAD",
            OpKind::Store => "STORE",
            OpKind::Beq => "BEQ",
            OpKind::Bne => "BNE",
        };
        write!(f, "{}", s)
    }
}

/// Four independent reservation-station pools, sized at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionalUnitClass {
    AddSub,
    MulDiv,
    LoadStore,
    Branch,
}

impl FunctionalUnitClass {
    pub const ALL: [FunctionalUnitClass; 4] = [
        FunctionalUnitClass::AddSub,
        FunctionalUnitClass::MulDiv,
        FunctionalUnitClass::LoadStore,
        FunctionalUnitClass::Branch,
    ];
}

impl fmt::Display for FunctionalUnitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctionalUnitClass::AddSub => "ADD_SUB",
            FunctionalUnitClass::MulDiv => "MUL_DIV",
            FunctionalUnitClass::LoadStore => "LOAD_STORE",
            FunctionalUnitClass::Branch => "BRANCH",
        };
        write!(f, "{}", s)
    }
}

/// A source operand as written in the program text: a register name, an
/// immediate literal, or (for LOAD's single-register form) nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Reg(String),
    Imm(i64),
    None,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Imm(v) => write!(f, "{}", v),
            Operand::None => write!(f, "-"),
        }
    }
}

/// The decoded, immutable part of an instruction plus the mutable
/// per-stage timestamps and flags the engine stamps onto it.
///
/// For ADD/SUB/MUL/DIV, `src1`/`src2` are the two arithmetic operands.
/// For LOAD, `src1` is the base register and `offset` the literal
/// displacement (`src2` unused — a single-operand op, per §3). For
/// STORE, `src1` is the base register, `src2` the register holding the
/// value to store, and `offset` again the literal displacement; `dest`
/// stays `None` since STORE writes no architectural register (§9 open
/// question (a)). For BEQ/BNE, `src1`/`src2` are the compared registers
/// and `branch_target` is the target instruction's program-order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: usize,
    pub op: OpKind,
    pub dest: Option<String>,
    pub src1: Operand,
    pub src2: Operand,
    pub offset: i64,
    pub branch_target: Option<usize>,

    pub original_latency: u64,
    pub residual_latency: u64,

    pub issue_cycle: Option<u64>,
    pub exec_start_cycle: Option<u64>,
    pub exec_end_cycle: Option<u64>,
    pub write_result_cycle: Option<u64>,
    pub commit_cycle: Option<u64>,

    pub branch_taken: bool,
    pub branch_resolved: bool,
    pub squashed: bool,

    pub speculative: bool,
    pub speculative_branch_id: Option<usize>,
}

impl Instruction {
    pub fn new(
        id: usize,
        op: OpKind,
        dest: Option<String>,
        src1: Operand,
        src2: Operand,
        offset: i64,
        branch_target: Option<usize>,
    ) -> Self {
        Self {
            id,
            op,
            dest,
            src1,
            src2,
            offset,
            branch_target,
            original_latency: 0,
            residual_latency: 0,
            issue_cycle: None,
            exec_start_cycle: None,
            exec_end_cycle: None,
            write_result_cycle: None,
            commit_cycle: None,
            branch_taken: false,
            branch_resolved: false,
            squashed: false,
            speculative: false,
            speculative_branch_id: None,
        }
    }

    pub fn is_issued(&self) -> bool {
        self.issue_cycle.is_some()
    }

    pub fn is_committed(&self) -> bool {
        self.commit_cycle.is_some()
    }

    /// Either committed or squashed — the instruction will never change
    /// state again.
    pub fn is_retired(&self) -> bool {
        self.squashed || self.is_committed()
    }

    pub fn set_speculative(&mut self, branch_id: usize) {
        self.speculative = true;
        self.speculative_branch_id = Some(branch_id);
    }

    pub fn clear_speculative(&mut self) {
        self.speculative = false;
        self.speculative_branch_id = None;
    }

    pub fn reset_for_reload(&mut self) {
        self.residual_latency = self.original_latency;
        self.issue_cycle = None;
        self.exec_start_cycle = None;
        self.exec_end_cycle = None;
        self.write_result_cycle = None;
        self.commit_cycle = None;
        self.branch_taken = false;
        self.branch_resolved = false;
        self.squashed = false;
        self.clear_speculative();
    }
}


impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_cycle = |c: Option<u64>| c.map_or("-".to_string(), |v| v.to_string());
        write!(
            f,
            "#{} {} {} {} {} | issue={} exec=[{},{}] write={} commit={}",
            self.id,
            self.op,
            self.dest.as_deref().unwrap_or("-"),
            self.src1,
            self.src2,
            fmt_cycle(self.issue_cycle),
            fmt_cycle(self.exec_start_cycle),
            fmt_cycle(self.exec_end_cycle),
            fmt_cycle(self.write_result_cycle),
            fmt_cycle(self.commit_cycle),
        )?;
        if self.squashed {
            write!(f, " (squashed)")?;
        } else if self.speculative && !self.is_committed() {
            write!(f, " (speculative, depends on branch {:?})", self.speculative_branch_id)?;
        }
        Ok(())
    }
}
