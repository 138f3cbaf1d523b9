use crate::ir::Snapshot;

/// Linear undo/redo history over graph snapshots.
///
/// The manager never inspects the live graph itself: callers hand it the
/// pre-mutation snapshot on `checkpoint` and the current snapshot on
/// `undo`/`redo`, and apply whatever snapshot comes back.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_depth: Option<usize>,
}

impl HistoryManager {
    /// `None` keeps every checkpoint.
    pub fn new(max_depth: Option<usize>) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.map(|depth| depth.max(1)),
        }
    }

    /// Records the state as it was before a user mutation. Clears redo.
    pub fn checkpoint(&mut self, before: Snapshot) {
        self.undo_stack.push(before);
        self.redo_stack.clear();
        if let Some(max_depth) = self.max_depth {
            let excess = self.undo_stack.len().saturating_sub(max_depth);
            self.undo_stack.drain(0..excess);
        }
    }

    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(None)
    }
}
