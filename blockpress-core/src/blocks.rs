//! The ordered block sequence of a document and the operations that mutate it.
//!
//! Every operation is total: an id that is not in the sequence makes the
//! operation a silent no-op, never an error. Such misses are ordinary races
//! between UI state and fast input. The sequence is never empty; deleting
//! the last remaining block resets it to an empty paragraph instead.
//!
//! Operations report whether they changed anything so callers can decide
//! whether to notify listeners.

use blockpress_types::BlockId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{Block, BlockAttrs, BlockKind};
use crate::content::ContentNode;

/// Where a moved block lands relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    After,
}

/// One-slot move direction used by the context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Non-empty ordered sequence of blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Block>", into = "Vec<Block>")]
pub struct BlockList {
    blocks: Vec<Block>,
}

impl Default for BlockList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Block>> for BlockList {
    fn from(blocks: Vec<Block>) -> Self {
        Self::new(blocks)
    }
}

impl From<BlockList> for Vec<Block> {
    fn from(list: BlockList) -> Self {
        list.blocks
    }
}

impl BlockList {
    /// Wrap `blocks`, seeding an empty paragraph when there are none.
    pub fn new(mut blocks: Vec<Block>) -> Self {
        if blocks.is_empty() {
            blocks.push(Block::new(BlockKind::Paragraph));
        }
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: the list keeps at least one block.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn as_slice(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn to_vec(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    pub fn ids(&self) -> Vec<BlockId> {
        self.blocks.iter().map(|b| b.id.clone()).collect()
    }

    pub fn first(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    fn get_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    /// Id of the block right before `id`, if any.
    pub fn previous(&self, id: &BlockId) -> Option<&BlockId> {
        let ix = self.index_of(id)?;
        ix.checked_sub(1).map(|prev| &self.blocks[prev].id)
    }

    /// Id of the block right after `id`, if any.
    pub fn next(&self, id: &BlockId) -> Option<&BlockId> {
        let ix = self.index_of(id)?;
        self.blocks.get(ix + 1).map(|b| &b.id)
    }

    fn insert_after(&mut self, after: Option<&BlockId>, block: Block) {
        match after.and_then(|id| self.index_of(id)) {
            Some(ix) => self.blocks.insert(ix + 1, block),
            None => self.blocks.push(block),
        }
    }

    // -------------------------------------------------------------------------
    // Structure operations
    // -------------------------------------------------------------------------

    /// Create an empty block of `kind` right after `insert_after`.
    ///
    /// Appends when `insert_after` is `None` or not in the sequence.
    pub fn create_block(&mut self, kind: BlockKind, insert_after: Option<&BlockId>) -> BlockId {
        let block = Block::new(kind);
        let id = block.id.clone();
        self.insert_after(insert_after, block);
        id
    }

    /// Insert a ready-made block right after `insert_after` (appends when absent).
    pub fn insert_block(&mut self, block: Block, insert_after: Option<&BlockId>) -> BlockId {
        let id = block.id.clone();
        self.insert_after(insert_after, block);
        id
    }

    /// Remove a block. The last remaining block is reset instead of removed.
    pub fn delete_block(&mut self, id: &BlockId) -> bool {
        let Some(ix) = self.index_of(id) else {
            debug!(%id, "delete of unknown block ignored");
            return false;
        };
        if self.blocks.len() == 1 {
            self.blocks[ix].clear();
        } else {
            self.blocks.remove(ix);
        }
        true
    }

    /// Split block `id` at `offset`, moving the tail into a new block.
    ///
    /// The new block is inserted right after the original and its id is
    /// returned. Headings continue as paragraphs; lists and todos continue
    /// as themselves (unchecked).
    pub fn split_block(&mut self, id: &BlockId, offset: usize) -> Option<BlockId> {
        let Some(ix) = self.index_of(id) else {
            debug!(%id, "split of unknown block ignored");
            return None;
        };

        let source = &self.blocks[ix];
        let (head, tail) = source.content.split_at(offset);
        let kind = source.kind.continuation();
        let attrs = if kind == source.kind {
            BlockAttrs {
                checked: None,
                ..source.attrs.clone()
            }
        } else {
            BlockAttrs {
                alignment: source.attrs.alignment,
                ..BlockAttrs::default()
            }
        };

        let mut block = Block::new(kind).with_attrs(attrs);
        block.content = tail;
        let new_id = block.id.clone();

        self.blocks[ix].content = head;
        self.blocks.insert(ix + 1, block);
        Some(new_id)
    }

    /// Append `current`'s content to `target`, then drop `current` unless it
    /// is the first block.
    pub fn merge_blocks(&mut self, current: &BlockId, target: &BlockId) -> bool {
        if current == target {
            return false;
        }
        let (Some(current_ix), Some(target_ix)) = (self.index_of(current), self.index_of(target))
        else {
            debug!(%current, %target, "merge with unknown block ignored");
            return false;
        };

        let incoming = self.blocks[current_ix].content.clone();
        self.blocks[target_ix].content.append(incoming);

        if current_ix > 0 {
            self.blocks.remove(current_ix);
        }
        true
    }

    /// Change a block's kind and shallow-merge `attrs_patch` into its attrs.
    ///
    /// Content is left as is; renderers reinterpret it for the new kind.
    pub fn convert_block_type(
        &mut self,
        id: &BlockId,
        kind: BlockKind,
        attrs_patch: &BlockAttrs,
    ) -> bool {
        let Some(block) = self.get_mut(id) else {
            debug!(%id, "convert of unknown block ignored");
            return false;
        };
        let before = (block.kind, block.attrs.clone());
        block.kind = kind;
        block.attrs.merge(attrs_patch);
        before != (block.kind, block.attrs.clone())
    }

    /// Clone a block under a fresh id, right after the source.
    pub fn duplicate_block(&mut self, id: &BlockId) -> Option<BlockId> {
        let ix = self.index_of(id)?;
        let mut copy = self.blocks[ix].clone();
        copy.id = BlockId::generate();
        let new_id = copy.id.clone();
        self.blocks.insert(ix + 1, copy);
        Some(new_id)
    }

    /// Move `source` to just before or after `target`.
    pub fn reorder_block(
        &mut self,
        source: &BlockId,
        target: &BlockId,
        position: DropPosition,
    ) -> bool {
        if source == target {
            return false;
        }
        let (Some(source_ix), Some(target_ix)) = (self.index_of(source), self.index_of(target))
        else {
            debug!(%source, %target, "reorder with unknown block ignored");
            return false;
        };

        let moved = self.blocks.remove(source_ix);
        let mut insert_at = target_ix;
        if position == DropPosition::After {
            insert_at += 1;
        }
        // Removing the source shifted everything after it down by one.
        if source_ix < target_ix {
            insert_at -= 1;
        }
        let changed = insert_at != source_ix;
        self.blocks.insert(insert_at, moved);
        changed
    }

    /// Swap a block with its neighbour above or below.
    pub fn move_block(&mut self, id: &BlockId, direction: MoveDirection) -> bool {
        let Some(ix) = self.index_of(id) else {
            return false;
        };
        let other = match direction {
            MoveDirection::Up => ix.checked_sub(1),
            MoveDirection::Down => Some(ix + 1).filter(|&n| n < self.blocks.len()),
        };
        match other {
            Some(other) => {
                self.blocks.swap(ix, other);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Content operations
    // -------------------------------------------------------------------------

    /// Replace a block's content wholesale (the block editor reporting an edit).
    pub fn update_content(&mut self, id: &BlockId, content: ContentNode) -> bool {
        match self.get_mut(id) {
            Some(block) if block.content != content => {
                block.content = content;
                true
            }
            _ => false,
        }
    }

    /// Insert plain text into a block at a cursor offset.
    pub fn insert_text(&mut self, id: &BlockId, offset: usize, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        match self.get_mut(id) {
            Some(block) => {
                block.content.insert_text(offset, text);
                true
            }
            None => false,
        }
    }

    pub fn set_checked(&mut self, id: &BlockId, checked: bool) -> bool {
        match self.get_mut(id) {
            Some(block) if block.attrs.checked != Some(checked) => {
                block.attrs.checked = Some(checked);
                true
            }
            _ => false,
        }
    }
}
