/// In-memory `EditorHost` for headless use and tests.
///
/// Holds the "live" block list and a simulated rendered view. A block's
/// rendered text nodes are its `data.text` split at inline markup tags,
/// so `"Hello <b>bold</b> world"` renders as `["Hello ", "bold", " world"]`.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;

use crate::block::Block;
use crate::host::{EditorHost, FocusEdge, Selection, TextPoint};

static INLINE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("inline tag pattern is valid"));

/// Splits block markup into its text nodes. Empty text yields no nodes.
pub fn text_nodes(markup: &str) -> Vec<String> {
    INLINE_TAG
        .split(markup)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default)]
struct ViewState {
    blocks: Vec<Block>,
    current_block: Option<usize>,
    selection: Option<Selection>,
    focused: Option<(usize, FocusEdge)>,
}

/// Editor host backed by plain memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    view: Mutex<ViewState>,
    saves: AtomicUsize,
    renders: AtomicUsize,
}

impl MemoryHost {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            view: Mutex::new(ViewState {
                blocks,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Replaces the live content, as a user edit would.
    pub fn set_blocks(&self, blocks: Vec<Block>) {
        self.view.lock().blocks = blocks;
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.view.lock().blocks.clone()
    }

    /// Places the caret inside `block` at a char offset within one of its
    /// text nodes, the way a click would.
    pub fn place_caret(&self, block: usize, end: TextPoint) {
        let mut view = self.view.lock();
        view.current_block = Some(block);
        view.selection = Some(Selection { block, end });
    }

    /// Drops the caret entirely (editor blurred).
    pub fn clear_caret(&self) {
        let mut view = self.view.lock();
        view.current_block = None;
        view.selection = None;
    }

    pub fn selection_now(&self) -> Option<Selection> {
        self.view.lock().selection
    }

    pub fn focused(&self) -> Option<(usize, FocusEdge)> {
        self.view.lock().focused
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EditorHost for MemoryHost {
    async fn save_content(&self) -> Result<Vec<Block>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(self.view.lock().blocks.clone())
    }

    async fn render_content(&self, blocks: &[Block]) -> Result<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let mut view = self.view.lock();
        view.blocks = blocks.to_vec();
        view.selection = None;
        view.current_block = None;
        view.focused = None;
        Ok(())
    }

    fn current_block_index(&self) -> Option<usize> {
        self.view.lock().current_block
    }

    fn block_text_nodes(&self, index: usize) -> Option<Vec<String>> {
        let view = self.view.lock();
        let block = view.blocks.get(index)?;
        Some(block.text().map(text_nodes).unwrap_or_default())
    }

    fn selection(&self) -> Result<Option<Selection>> {
        Ok(self.view.lock().selection)
    }

    fn focus_block(&self, index: usize, edge: FocusEdge) -> Result<()> {
        let mut view = self.view.lock();
        if index >= view.blocks.len() {
            bail!("No block at index {index}");
        }
        view.current_block = Some(index);
        view.focused = Some((index, edge));
        Ok(())
    }

    fn apply_selection(&self, block: usize, point: TextPoint) -> Result<()> {
        let mut view = self.view.lock();
        if block >= view.blocks.len() {
            bail!("No block at index {block}");
        }
        view.selection = Some(Selection { block, end: point });
        Ok(())
    }
}
