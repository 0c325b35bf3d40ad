/// Snapshot-based undo/redo history for block editors.
///
/// Provides an `UndoEngine` that captures debounced snapshots of the
/// host editor's block content, keeps them in a bounded linear history,
/// and restores content and caret position on undo/redo.
pub mod block;
pub mod caret;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod host;
pub mod memory;
pub mod shortcut;
pub mod store;

pub use block::{Block, InitialContent};
pub use config::{HistoryConfig, ShortcutConfig};
pub use engine::{UndoEngine, UpdateObserver};
pub use host::{EditorHost, FocusEdge, Selection, TextPoint};
pub use memory::MemoryHost;
pub use shortcut::{KeyEvent, Shortcut, ShortcutAction, ShortcutBindings, ShortcutDef, ShortcutSet};
pub use store::{CaretPosition, HistoryState, Snapshot, SnapshotStore};
