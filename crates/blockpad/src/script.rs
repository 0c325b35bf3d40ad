//! Scripted editing sessions for `blockpad replay`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use blockpad_mod_history::{InitialContent, TextPoint};

/// A replayable session: seed content plus ordered steps.
#[derive(Debug, Deserialize)]
#[serde(from = "RawScript")]
pub struct Script {
    pub initial: InitialContent,
    pub steps: Vec<Step>,
}

/// Scripts are either a bare step list or an object with seed content.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScript {
    Steps(Vec<Step>),
    Session {
        #[serde(default)]
        initial: Option<InitialContent>,
        steps: Vec<Step>,
    },
}

impl From<RawScript> for Script {
    fn from(raw: RawScript) -> Self {
        let (initial, steps) = match raw {
            RawScript::Steps(steps) => (None, steps),
            RawScript::Session { initial, steps } => (initial, steps),
        };
        Self {
            initial: initial.unwrap_or_else(|| InitialContent::Blocks(Vec::new())),
            steps,
        }
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse script: {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Step {
    /// The user changed the content (and possibly moved the caret).
    Edit {
        blocks: InitialContent,
        #[serde(default)]
        caret: Option<ScriptCaret>,
    },
    Undo,
    Redo,
}

/// Caret placement for an edit step. `node` selects the text node inside
/// the block and defaults to the first one.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptCaret {
    pub block: usize,
    #[serde(default)]
    pub node: usize,
    pub offset: usize,
}

impl ScriptCaret {
    pub fn point(&self) -> TextPoint {
        TextPoint {
            node: self.node,
            offset: self.offset,
        }
    }
}
