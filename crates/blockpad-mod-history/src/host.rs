/// Boundary between the history engine and the host editor.
use anyhow::Result;
use async_trait::async_trait;

use crate::block::Block;

/// Which end of a block to focus when anchoring the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEdge {
    Start,
    End,
}

/// A point inside a block's rendered content: a text node (in document
/// order under the block's content element) and a char offset into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPoint {
    pub node: usize,
    pub offset: usize,
}

/// The host's active text selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Block whose content element contains the selection end.
    pub block: usize,
    /// Selection end (the focus point when collapsed).
    pub end: TextPoint,
}

/// Operations the engine needs from the host editor.
///
/// `save_content` and `render_content` may suspend for arbitrary time.
/// The remaining methods read or write the rendered view synchronously
/// and are allowed to fail; the engine degrades to "no caret" when they do.
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Serializes the current editor content.
    async fn save_content(&self) -> Result<Vec<Block>>;

    /// Replaces the displayed content with `blocks`.
    async fn render_content(&self, blocks: &[Block]) -> Result<()>;

    /// Index of the block holding the caret, if any.
    fn current_block_index(&self) -> Option<usize>;

    /// Text nodes of the block's rendered content element, in document
    /// order. `None` when no such block is rendered.
    fn block_text_nodes(&self, index: usize) -> Option<Vec<String>>;

    /// The active selection, `Ok(None)` when nothing is selected.
    fn selection(&self) -> Result<Option<Selection>>;

    /// Focuses the block and scrolls it into view.
    fn focus_block(&self, index: usize, edge: FocusEdge) -> Result<()>;

    /// Places a collapsed selection at `point` inside the block.
    fn apply_selection(&self, block: usize, point: TextPoint) -> Result<()>;
}
