//! Caret capture and restore.
//!
//! A caret is recorded as (block index, char offset from the start of the
//! block's rendered text). Neither direction ever fails the surrounding
//! operation: capture degrades to "no caret" with a warning, restore
//! silently gives up when the block or the selection API is unavailable.

use anyhow::{bail, Context, Result};

use crate::host::{EditorHost, FocusEdge, TextPoint};
use crate::store::CaretPosition;

/// Reads the host's current caret position.
///
/// Returns `None` when the host has no current block or no selection,
/// or when reading the rendered view fails.
pub fn capture(host: &dyn EditorHost) -> Option<CaretPosition> {
    match try_capture(host) {
        Ok(caret) => caret,
        Err(e) => {
            tracing::warn!("Failed to capture caret position: {e:#}");
            None
        }
    }
}

fn try_capture(host: &dyn EditorHost) -> Result<Option<CaretPosition>> {
    let Some(block) = host.current_block_index() else {
        return Ok(None);
    };
    let Some(selection) = host.selection().context("Failed to read selection")? else {
        return Ok(None);
    };
    if selection.block != block {
        bail!(
            "Selection is in block {} but the current block is {block}",
            selection.block
        );
    }
    let nodes = host
        .block_text_nodes(block)
        .with_context(|| format!("Block {block} has no rendered content"))?;
    let offset = offset_of(&nodes, selection.end)?;
    Ok(Some(CaretPosition { block, offset }))
}

/// Reapplies a recorded caret after content has been rendered.
///
/// No-op when `caret` is absent. The offset is clamped to the block's
/// current text length.
pub fn restore(host: &dyn EditorHost, caret: Option<CaretPosition>) {
    let Some(caret) = caret else {
        return;
    };
    if let Err(e) = try_restore(host, caret) {
        tracing::debug!("Caret not restored: {e:#}");
    }
}

fn try_restore(host: &dyn EditorHost, caret: CaretPosition) -> Result<()> {
    let nodes = host
        .block_text_nodes(caret.block)
        .with_context(|| format!("Block {} is not rendered", caret.block))?;
    let offset = caret.offset.min(text_len(&nodes));
    let point = point_at(&nodes, offset);

    host.focus_block(caret.block, FocusEdge::End)
        .context("Failed to focus block")?;
    host.apply_selection(caret.block, point)
        .context("Failed to apply selection")?;
    Ok(())
}

/// Total char length of a block's text nodes.
pub fn text_len(nodes: &[String]) -> usize {
    nodes.iter().map(|n| n.chars().count()).sum()
}

/// Char offset from block start to `point`.
///
/// An offset past the end of its node is clamped to the node length.
fn offset_of(nodes: &[String], point: TextPoint) -> Result<usize> {
    if nodes.is_empty() && point.node == 0 {
        return Ok(0);
    }
    let Some(node) = nodes.get(point.node) else {
        bail!(
            "Selection node {} is outside the block ({} text nodes)",
            point.node,
            nodes.len()
        );
    };
    let before = text_len(&nodes[..point.node]);
    Ok(before + point.offset.min(node.chars().count()))
}

/// Maps a block-level char offset back onto a text node.
///
/// At a node boundary the end of the earlier node wins.
fn point_at(nodes: &[String], offset: usize) -> TextPoint {
    let mut remaining = offset;
    for (index, node) in nodes.iter().enumerate() {
        let len = node.chars().count();
        if remaining <= len {
            return TextPoint {
                node: index,
                offset: remaining,
            };
        }
        remaining -= len;
    }
    match nodes.len() {
        0 => TextPoint::default(),
        n => TextPoint {
            node: n - 1,
            offset: nodes[n - 1].chars().count(),
        },
    }
}
