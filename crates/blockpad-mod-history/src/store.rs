/// Bounded linear snapshot history with a position cursor.
///
/// Pushing after undos discards the redo branch; exceeding the
/// configured bound drops the oldest entries.
use serde::Serialize;

use crate::block::Block;

/// Logical caret location: block index and char offset within the
/// block's rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CaretPosition {
    /// 0-indexed block holding the caret.
    pub block: usize,
    /// Char offset from the start of the block's text.
    pub offset: usize,
}

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    content: Vec<Block>,
    caret: Option<CaretPosition>,
}

impl Snapshot {
    /// Builds a snapshot owning a structural copy of `content`.
    pub fn new(content: &[Block], caret: Option<CaretPosition>) -> Self {
        Self {
            content: content.to_vec(),
            caret,
        }
    }

    /// The recorded blocks.
    pub fn content(&self) -> &[Block] {
        &self.content
    }

    /// The caret recorded at capture time, if it was known.
    pub fn caret(&self) -> Option<CaretPosition> {
        self.caret
    }
}

/// Public projection of the history cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryState {
    /// Index of the current snapshot, `None` while history is empty.
    pub position: Option<usize>,
    /// Number of stored snapshots.
    pub count: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Ordered snapshots plus the index of the current one.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Oldest first.
    entries: Vec<Snapshot>,
    position: Option<usize>,
    max_history: usize,
}

impl SnapshotStore {
    /// Creates an empty store retaining at most `max_history` entries.
    ///
    /// A bound of zero is treated as one.
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: Vec::new(),
            position: None,
            max_history: max_history.max(1),
        }
    }

    /// Replaces all history with a single uncaretted snapshot.
    pub fn reset(&mut self, content: &[Block]) {
        self.entries.clear();
        self.entries.push(Snapshot::new(content, None));
        self.position = Some(0);
    }

    /// Appends a snapshot and makes it current.
    ///
    /// Entries after the current position are discarded first. When the
    /// bound is exceeded the oldest entries are evicted.
    pub fn push(&mut self, content: &[Block], caret: Option<CaretPosition>) {
        match self.position {
            Some(pos) => self.entries.truncate(pos + 1),
            None => self.entries.clear(),
        }
        self.entries.push(Snapshot::new(content, caret));

        if self.entries.len() > self.max_history {
            let excess = self.entries.len() - self.max_history;
            self.entries.drain(..excess);
        }
        self.position = Some(self.entries.len() - 1);
    }

    /// Moves the cursor. Callers check `can_undo`/`can_redo` first.
    pub fn move_to(&mut self, position: usize) {
        debug_assert!(position < self.entries.len());
        self.position = Some(position);
    }

    /// The snapshot at the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.position.and_then(|pos| self.entries.get(pos))
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.position, Some(pos) if pos > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.position, Some(pos) if pos + 1 < self.entries.len())
    }

    /// Whether `candidate` differs from the current snapshot's content.
    ///
    /// Always true when history is empty.
    pub fn has_changed(&self, candidate: &[Block]) -> bool {
        self.current()
            .is_none_or(|snapshot| snapshot.content() != candidate)
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            position: self.position,
            count: self.entries.len(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }
}
