use std::collections::VecDeque;

/// Bounded undo/redo log.
///
/// Holds at most `capacity` undoable entries; pushing past that evicts the
/// oldest. Pushing a new entry discards everything that could be redone.
#[derive(Clone, Debug)]
pub struct EditHistory<C> {
    undo: VecDeque<C>,
    redo: Vec<C>,
    capacity: usize,
}

impl<C> EditHistory<C> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            undo: VecDeque::with_capacity(capacity.min(256)),
            redo: Vec::new(),
            capacity,
        }
    }

    pub fn push(&mut self, command: C) {
        self.redo.clear();
        while self.undo.len() >= self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(command);
    }

    /// Take the most recent entry to reverse it. The caller hands it back
    /// through `push_redo` once reversed.
    pub fn pop_undo(&mut self) -> Option<C> {
        self.undo.pop_back()
    }

    pub fn push_redo(&mut self, command: C) {
        self.redo.push(command);
    }

    /// Take the most recently undone entry to re-apply it. The caller hands
    /// it back through `push_reapplied` once re-applied.
    pub fn pop_redo(&mut self) -> Option<C> {
        self.redo.pop()
    }

    /// Re-record an entry after redo without clearing the redo stack.
    pub fn push_reapplied(&mut self, command: C) {
        while self.undo.len() >= self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(command);
    }

    /// Put an entry back after a failed undo.
    pub fn restore_undo(&mut self, command: C) {
        self.undo.push_back(command);
    }

    /// Put an entry back after a failed redo.
    pub fn restore_redo(&mut self, command: C) {
        self.redo.push(command);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn len(&self) -> usize {
        self.undo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
