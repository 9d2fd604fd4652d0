// rob.rs
//
// The reorder buffer: a fixed-size circular queue enforcing in-order
// commit despite out-of-order execution (§4.4). Implemented as a plain
// `Vec` with explicit head/tail indices rather than a `VecDeque`, so a
// squash can free an interior entry without disturbing entries ahead of
// it in program order (per §9's design note on index-based
// back-pointers and the ROB variant's precise-interrupt semantics).

use super::instruction::OpKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobEntry {
    pub busy: bool,
    pub instruction_id: Option<usize>,
    pub op: Option<OpKind>,
    pub dest: Option<String>,
    pub store_address: Option<i64>,
    pub value: Option<i64>,
    pub ready: bool,
    pub speculative: bool,
    pub producer_rs: Option<usize>,
}

impl RobEntry {
    fn empty() -> Self {
        Self {
            busy: false,
            instruction_id: None,
            op: None,
            dest: None,
            store_address: None,
            value: None,
            ready: false,
            speculative: false,
            producer_rs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderBuffer {
    entries: Vec<RobEntry>,
    pub head: usize,
    pub tail: usize,
    pub count: usize,
}

impl ReorderBuffer {
    pub fn new(size: usize) -> Self {
        Self { entries: vec![RobEntry::empty(); size], head: 0, tail: 0, count: 0 }
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn entry(&self, index: usize) -> &RobEntry {
        &self.entries[index]
    }

    pub fn entry_mut(&mut self, index: usize) -> &mut RobEntry {
        &mut self.entries[index]
    }

    pub fn head_index(&self) -> Option<usize> {
        if self.is_empty() {
            None
        } else {
            Some(self.head)
        }
    }

    /// Allocates the slot at `tail`, advances `tail`, returns its index.
    /// Caller must have checked `!is_full()`.
    pub fn allocate(
        &mut self,
        instruction_id: usize,
        op: OpKind,
        dest: Option<String>,
        speculative: bool,
    ) -> usize {
        let index = self.tail;
        self.entries[index] = RobEntry {
            busy: true,
            instruction_id: Some(instruction_id),
            op: Some(op),
            dest,
            store_address: None,
            value: None,
            ready: false,
            speculative,
            producer_rs: None,
        };
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        index
    }

    /// Frees the head slot and advances `head`. Caller must have
    /// checked the head is actually busy.
    pub fn retire_head(&mut self) {
        self.entries[self.head] = RobEntry::empty();
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
    }

    /// Frees an arbitrary entry out of program order — only legal
    /// during a squash, where in-flight entries between the branch and
    /// its target are discarded without retiring the ROB head.
    pub fn free_entry(&mut self, index: usize) {
        if self.entries[index].busy {
            self.entries[index] = RobEntry::empty();
            self.count -= 1;
        }
    }

    /// Indices of every currently busy entry, oldest (head) first.
    pub fn busy_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.count);
        let mut i = self.head;
        for _ in 0..self.count {
            out.push(i);
            i = (i + 1) % self.entries.len();
        }
        out
    }

    /// Discards every entry allocated after `rob_index` up to the
    /// current tail, and rewinds the tail to right after `rob_index`.
    ///
    /// Issue only ever allocates the next sequential program-order
    /// instruction, so by the time a branch at `rob_index` reaches
    /// Commit, every entry allocated after it is necessarily one of the
    /// not-yet-resolved speculative instructions following that branch
    /// — freeing the whole run preserves the "entries between head and
    /// tail are exactly the busy ones" invariant without needing to
    /// locate the branch target's own ROB slot (which may not exist yet
    /// if the target hasn't been issued). Returns, for each freed entry,
    /// its own ROB index, the instruction id it held, and its
    /// destination register (if any) — the caller needs the ROB index
    /// to clear a stale producer tag without racing a later instruction
    /// that reuses the same slot.
    pub fn squash_after(&mut self, rob_index: usize) -> Vec<(usize, usize, Option<String>)> {
        let size = self.entries.len();
        let mut freed = Vec::new();
        let mut idx = (rob_index + 1) % size;
        while idx != self.tail {
            if self.entries[idx].busy {
                if let Some(id) = self.entries[idx].instruction_id {
                    freed.push((idx, id, self.entries[idx].dest.clone()));
                }
                self.entries[idx] = RobEntry::empty();
                self.count -= 1;
            }
            idx = (idx + 1) % size;
        }
        self.tail = (rob_index + 1) % size;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_retire_wraps_the_circular_queue() {
        let mut rob = ReorderBuffer::new(2);
        let a = rob.allocate(0, OpKind::Add, Some("R1".into()), false);
        let b = rob.allocate(1, OpKind::Add, Some("R2".into()), false);
        assert_eq!((a, b), (0, 1));
        assert!(rob.is_full());

        rob.retire_head();
        assert!(!rob.is_full());
        assert_eq!(rob.head_index(), Some(1));

        // Tail wraps back to slot 0, which retire_head just freed.
        let c = rob.allocate(2, OpKind::Add, Some("R3".into()), false);
        assert_eq!(c, 0);
    }

    #[test]
    fn fresh_allocation_is_busy_and_not_ready() {
        let mut rob = ReorderBuffer::new(4);
        let idx = rob.allocate(0, OpKind::Add, Some("R1".into()), true);
        let entry = rob.entry(idx);
        assert!(entry.busy);
        assert!(!entry.ready);
        assert!(entry.speculative);
    }

    #[test]
    fn squash_after_frees_every_entry_between_branch_and_tail() {
        let mut rob = ReorderBuffer::new(8);
        let branch = rob.allocate(0, OpKind::Beq, None, false);
        let i1 = rob.allocate(1, OpKind::Add, Some("R1".into()), true);
        let i2 = rob.allocate(2, OpKind::Add, Some("R2".into()), true);
        assert_eq!((i1, i2), (1, 2));

        let freed = rob.squash_after(branch);
        assert_eq!(freed.len(), 2);
        assert_eq!(freed[0].1, 1);
        assert_eq!(freed[1].1, 2);
        assert!(!rob.entry(i1).busy);
        assert!(!rob.entry(i2).busy);
        // Only the branch itself remains busy.
        assert_eq!(rob.busy_indices(), vec![branch]);
    }

    #[test]
    fn busy_indices_are_returned_oldest_first() {
        let mut rob = ReorderBuffer::new(4);
        rob.allocate(0, OpKind::Add, Some("R1".into()), false);
        rob.allocate(1, OpKind::Add, Some("R2".into()), false);
        rob.retire_head();
        rob.allocate(2, OpKind::Add, Some("R3".into()), false);
        // Head is now index 1, tail has wrapped to index 2 (after alloc).
        assert_eq!(rob.busy_indices(), vec![1, 2]);
    }
}
