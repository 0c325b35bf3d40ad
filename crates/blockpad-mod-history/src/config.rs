/// Configuration for the history engine: load, sanitize, and resolve.
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shortcut::{default_redo, default_undo, ShortcutBindings, ShortcutDef, ShortcutSet};

/// Quiet period in milliseconds before a burst of edits is captured
/// as one snapshot.
const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Maximum number of snapshots retained. Oldest snapshots are evicted
/// when this limit is exceeded.
const DEFAULT_MAX_HISTORY: usize = 100;

/// Configured undo/redo key combinations. Empty lists fall back to the
/// built-in defaults when resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcutConfig {
    pub undo: Vec<ShortcutDef>,
    pub redo: Vec<ShortcutDef>,
}

/// Configuration for the history engine.
///
/// Resolved once at engine construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Capture coalescing window in milliseconds.
    pub debounce_ms: u64,
    /// Max snapshots kept (at least 1).
    pub max_history: usize,
    pub shortcuts: ShortcutConfig,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_history: DEFAULT_MAX_HISTORY,
            shortcuts: ShortcutConfig::default(),
        }
    }
}

impl HistoryConfig {
    /// Loads config from a JSON file.
    /// Returns sanitized defaults on any error (missing file, parse error, etc.).
    pub fn load(path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HistoryConfig>(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse history config at {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read history config at {}: {e}", path.display());
                Self::default()
            }
        };
        config.sanitize();
        config
    }

    /// Clamps values to valid ranges.
    pub fn sanitize(&mut self) {
        self.max_history = self.max_history.max(1);
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parses the configured shortcuts, falling back to defaults per action.
    pub fn resolved_shortcuts(&self) -> ShortcutBindings {
        ShortcutBindings {
            undo: ShortcutSet::resolve(&self.shortcuts.undo, &default_undo()),
            redo: ShortcutSet::resolve(&self.shortcuts.redo, &default_redo()),
        }
    }
}
