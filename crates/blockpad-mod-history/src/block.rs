/// Block content model exchanged with the host editor.
use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One block record of editor content.
///
/// `Clone` is a full structural copy: a stored snapshot never shares
/// data with the live editor content or with another snapshot.
/// Equality is structural. Keys inside `data` and `tunes` compare
/// regardless of insertion order; block order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Host-assigned block identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Block tool name (e.g. `"paragraph"`, `"header"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Tool-specific payload.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Block tune settings.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub tunes: Map<String, Value>,
}

impl Block {
    /// Creates a block of the given tool type with empty data.
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            kind: kind.into(),
            data: Map::new(),
            tunes: Map::new(),
        }
    }

    /// Creates a paragraph block holding `text`.
    pub fn paragraph(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, "paragraph").with_data("text", Value::String(text.into()))
    }

    /// Sets one field of the block payload.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// The `text` field of the payload, if the block has one.
    pub fn text(&self) -> Option<&str> {
        self.data.get("text").and_then(Value::as_str)
    }
}

/// Content accepted by `initialize`: either a raw block list or the
/// host's saved-document wrapper carrying a `blocks` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InitialContent {
    Blocks(Vec<Block>),
    Document { blocks: Vec<Block> },
}

impl InitialContent {
    /// Unwraps into the block list.
    pub fn into_blocks(self) -> Vec<Block> {
        match self {
            Self::Blocks(blocks) | Self::Document { blocks } => blocks,
        }
    }
}

impl From<Vec<Block>> for InitialContent {
    fn from(blocks: Vec<Block>) -> Self {
        Self::Blocks(blocks)
    }
}

/// Checks host output before it enters history.
///
/// Every block needs a tool type, and ids that are present must be
/// unique within the content.
///
/// # Errors
///
/// Returns an error naming the first offending block.
pub fn validate_blocks(blocks: &[Block]) -> Result<()> {
    let mut seen = HashSet::new();
    for (index, block) in blocks.iter().enumerate() {
        if block.kind.trim().is_empty() {
            bail!("Block {index} has an empty type");
        }
        if let Some(id) = &block.id {
            if !seen.insert(id.as_str()) {
                bail!("Block {index} reuses id '{id}'");
            }
        }
    }
    Ok(())
}
