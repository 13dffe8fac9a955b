//! The block editor: block sequence, selection, interaction mode and change
//! listeners in one owned value.
//!
//! Every mutation goes through [`Editor`] so that the read-only flag and the
//! change listeners apply uniformly. Listeners fire synchronously after each
//! mutation that changed something and never on [`Editor::load`].

use std::fmt;

use blockpress_types::BlockId;
use tracing::debug;

use crate::block::{Block, BlockAttrs, BlockKind};
use crate::blocks::{BlockList, DropPosition, MoveDirection};
use crate::content::ContentNode;
use crate::interaction::{
    ContextCommand, DropTarget, EditorEvent, EventResult, Key, Mode, Modifiers, Selection,
};
use crate::slash::SlashMenu;

/// Callback receiving the full block sequence after a change
pub type BlocksListener = Box<dyn FnMut(&[Block]) + Send>;

pub struct Editor {
    blocks: BlockList,
    selection: Option<Selection>,
    mode: Mode,
    read_only: bool,
    listeners: Vec<BlocksListener>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("blocks", &self.blocks.len())
            .field("selection", &self.selection)
            .field("mode", &self.mode)
            .field("read_only", &self.read_only)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Editor {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: BlockList::new(blocks),
            selection: None,
            mode: Mode::Idle,
            read_only: false,
            listeners: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn block_list(&self) -> &BlockList {
        &self.blocks
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        if read_only && self.mode.has_overlay() {
            self.close_overlay();
        }
    }

    /// Register a listener fired after every successful mutation.
    pub fn on_blocks_change<F>(&mut self, listener: F)
    where
        F: FnMut(&[Block]) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Replace the whole sequence without notifying listeners.
    ///
    /// Used when a document is opened; selection and mode are reset.
    pub fn load(&mut self, blocks: Vec<Block>) {
        self.blocks = BlockList::new(blocks);
        self.selection = None;
        self.mode = Mode::Idle;
    }

    fn notify(&mut self) {
        let blocks = self.blocks.as_slice();
        for listener in self.listeners.iter_mut() {
            listener(blocks);
        }
    }

    fn commit(&mut self, changed: bool) -> bool {
        if changed {
            self.notify();
        }
        changed
    }

    /// Select `id` with the cursor at `offset`.
    pub fn select(&mut self, id: &BlockId, offset: usize) {
        if self.blocks.get(id).is_none() {
            return;
        }
        self.selection = Some(Selection::caret(id.clone(), offset));
        self.mode = Mode::Selected(id.clone());
    }

    /// Mode to fall back to when a drag or overlay ends.
    fn resting_mode(&self) -> Mode {
        match &self.selection {
            Some(sel) if self.blocks.get(&sel.block_id).is_some() => {
                Mode::Selected(sel.block_id.clone())
            }
            _ => Mode::Idle,
        }
    }

    fn close_overlay(&mut self) {
        self.mode = match self.mode.block_id() {
            Some(id) if self.blocks.get(id).is_some() => Mode::Selected(id.clone()),
            _ => self.resting_mode(),
        };
    }

    // -------------------------------------------------------------------------
    // Guarded mutations
    // -------------------------------------------------------------------------

    pub fn create_block(&mut self, kind: BlockKind, insert_after: Option<&BlockId>) -> Option<BlockId> {
        if self.read_only {
            return None;
        }
        let id = self.blocks.create_block(kind, insert_after);
        self.notify();
        Some(id)
    }

    pub fn delete_block(&mut self, id: &BlockId) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.blocks.delete_block(id);
        self.commit(changed)
    }

    pub fn split_block(&mut self, id: &BlockId, offset: usize) -> Option<BlockId> {
        if self.read_only {
            return None;
        }
        let new_id = self.blocks.split_block(id, offset);
        self.commit(new_id.is_some());
        new_id
    }

    pub fn merge_blocks(&mut self, current: &BlockId, target: &BlockId) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.blocks.merge_blocks(current, target);
        self.commit(changed)
    }

    pub fn convert_block_type(&mut self, id: &BlockId, kind: BlockKind, attrs: &BlockAttrs) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.blocks.convert_block_type(id, kind, attrs);
        self.commit(changed)
    }

    pub fn duplicate_block(&mut self, id: &BlockId) -> Option<BlockId> {
        if self.read_only {
            return None;
        }
        let new_id = self.blocks.duplicate_block(id);
        self.commit(new_id.is_some());
        new_id
    }

    pub fn reorder_block(&mut self, source: &BlockId, target: &BlockId, position: DropPosition) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.blocks.reorder_block(source, target, position);
        self.commit(changed)
    }

    pub fn move_block(&mut self, id: &BlockId, direction: MoveDirection) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.blocks.move_block(id, direction);
        self.commit(changed)
    }

    pub fn update_content(&mut self, id: &BlockId, content: ContentNode) -> bool {
        if self.read_only {
            return false;
        }
        let changed = self.blocks.update_content(id, content);
        self.commit(changed)
    }

    pub fn toggle_checked(&mut self, id: &BlockId) -> bool {
        if self.read_only {
            return false;
        }
        let Some(checked) = self.blocks.get(id).map(Block::is_checked) else {
            return false;
        };
        let changed = self.blocks.set_checked(id, !checked);
        self.commit(changed)
    }

    /// Distribute pasted plain text over blocks.
    ///
    /// Blank lines are dropped. The first line goes into the selected block
    /// at the cursor; each following line becomes a new paragraph placed
    /// right after the previous one. The cursor ends at the end of the last
    /// inserted text.
    pub fn paste(&mut self, text: &str) -> bool {
        if self.read_only {
            return false;
        }
        let Some(sel) = self.selection.clone() else {
            debug!("paste without selection ignored");
            return false;
        };
        if self.blocks.get(&sel.block_id).is_none() {
            return false;
        }

        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .collect();
        let Some((first, rest)) = lines.split_first() else {
            return false;
        };

        let offset = sel.cursor().min(self.blocks.get(&sel.block_id).map_or(0, Block::text_len));
        self.blocks.insert_text(&sel.block_id, offset, first);
        let mut last = sel.block_id.clone();
        let mut end = offset + first.chars().count();

        for line in rest {
            let block = Block::paragraph(line);
            end = block.text_len();
            last = self.blocks.insert_block(block, Some(&last));
        }

        self.selection = Some(Selection::caret(last.clone(), end));
        self.mode = Mode::Selected(last);
        self.notify();
        true
    }

    // -------------------------------------------------------------------------
    // Event dispatch
    // -------------------------------------------------------------------------

    pub fn handle(&mut self, event: EditorEvent) -> EventResult {
        match event {
            EditorEvent::Click(id) => {
                if self.blocks.get(&id).is_none() {
                    return EventResult::Ignored;
                }
                let keeps_cursor = self.selection.as_ref().is_some_and(|s| s.block_id == id);
                if !keeps_cursor {
                    let end = self.blocks.get(&id).map_or(0, Block::text_len);
                    self.selection = Some(Selection::caret(id.clone(), end));
                }
                self.mode = Mode::Selected(id);
                EventResult::Handled
            }
            EditorEvent::SelectionChange(selection) => {
                if self.blocks.get(&selection.block_id).is_none() {
                    return EventResult::Ignored;
                }
                if matches!(self.mode, Mode::Idle | Mode::Selected(_)) {
                    self.mode = Mode::Selected(selection.block_id.clone());
                }
                self.selection = Some(selection);
                EventResult::Handled
            }
            EditorEvent::Key { key, modifiers } => self.handle_key(key, modifiers),
            EditorEvent::ContentChanged { block_id, content } => {
                if self.read_only {
                    return EventResult::Ignored;
                }
                if self.update_content(&block_id, content) {
                    EventResult::Mutated
                } else {
                    EventResult::Handled
                }
            }
            EditorEvent::OpenContextMenu { block_id, position } => {
                if self.read_only || self.blocks.get(&block_id).is_none() {
                    return EventResult::Ignored;
                }
                self.mode = Mode::ContextMenu { block_id, position };
                EventResult::Handled
            }
            EditorEvent::ContextCommand(command) => self.run_context_command(command),
            EditorEvent::DragStart(source) => {
                if self.read_only || self.blocks.get(&source).is_none() {
                    return EventResult::Ignored;
                }
                self.mode = Mode::Dragging {
                    source,
                    hover: None,
                };
                EventResult::Handled
            }
            EditorEvent::DragOver {
                target,
                bounds,
                pointer_y,
            } => {
                let Mode::Dragging { source, hover } = &mut self.mode else {
                    return EventResult::Ignored;
                };
                *hover = (*source != target).then(|| DropTarget {
                    block_id: target,
                    position: bounds.drop_position(pointer_y),
                });
                EventResult::Handled
            }
            EditorEvent::Drop {
                target,
                bounds,
                pointer_y,
            } => {
                let Mode::Dragging { source, .. } = &self.mode else {
                    return EventResult::Ignored;
                };
                let source = source.clone();
                let changed =
                    self.reorder_block(&source, &target, bounds.drop_position(pointer_y));
                self.mode = self.resting_mode();
                if changed {
                    EventResult::Mutated
                } else {
                    EventResult::Handled
                }
            }
            EditorEvent::DragEnd => {
                if !matches!(self.mode, Mode::Dragging { .. }) {
                    return EventResult::Ignored;
                }
                self.mode = self.resting_mode();
                EventResult::Handled
            }
            EditorEvent::ClickOutside => {
                if !self.mode.has_overlay() {
                    return EventResult::Ignored;
                }
                self.close_overlay();
                EventResult::Handled
            }
            EditorEvent::Paste(text) => {
                if self.paste(&text) {
                    EventResult::Mutated
                } else {
                    EventResult::Ignored
                }
            }
            EditorEvent::ToggleTodo(id) => {
                if self.toggle_checked(&id) {
                    EventResult::Mutated
                } else {
                    EventResult::Ignored
                }
            }
        }
    }

    fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> EventResult {
        if modifiers.command() && matches!(key, Key::Char('s') | Key::Char('S')) {
            return EventResult::SaveRequested;
        }

        match self.mode {
            Mode::SlashMenu(_) => return self.handle_slash_key(key, modifiers),
            Mode::ContextMenu { .. } if key == Key::Escape => {
                self.close_overlay();
                return EventResult::Handled;
            }
            Mode::Dragging { .. } if key == Key::Escape => {
                self.mode = self.resting_mode();
                return EventResult::Handled;
            }
            Mode::ContextMenu { .. } | Mode::Dragging { .. } => return EventResult::Ignored,
            Mode::Idle | Mode::Selected(_) => {}
        }

        if self.read_only || !modifiers.is_none() {
            return EventResult::Ignored;
        }
        let Some(sel) = self.selection.clone() else {
            return EventResult::Ignored;
        };
        if self.blocks.get(&sel.block_id).is_none() {
            return EventResult::Ignored;
        }
        let at_start = sel.is_collapsed() && sel.cursor() == 0;

        match key {
            Key::Enter => {
                let Some(new_id) = self.split_block(&sel.block_id, sel.cursor()) else {
                    return EventResult::Ignored;
                };
                self.select(&new_id, 0);
                EventResult::Mutated
            }
            Key::Backspace if at_start => {
                let Some(previous) = self.blocks.previous(&sel.block_id).cloned() else {
                    return EventResult::Ignored;
                };
                let join_at = self.blocks.get(&previous).map_or(0, Block::text_len);
                if !self.merge_blocks(&sel.block_id, &previous) {
                    return EventResult::Ignored;
                }
                self.select(&previous, join_at);
                EventResult::Mutated
            }
            Key::Char('/') if at_start => {
                self.mode = Mode::SlashMenu(SlashMenu::open(sel.block_id));
                EventResult::Handled
            }
            _ => EventResult::Ignored,
        }
    }

    fn handle_slash_key(&mut self, key: Key, modifiers: Modifiers) -> EventResult {
        let Mode::SlashMenu(menu) = &mut self.mode else {
            return EventResult::Ignored;
        };
        match key {
            Key::Char(c) if !modifiers.command() && !c.is_control() => {
                menu.push(c);
                EventResult::Handled
            }
            Key::Backspace => {
                if !menu.pop() {
                    self.close_overlay();
                }
                EventResult::Handled
            }
            Key::ArrowUp => {
                menu.move_up();
                EventResult::Handled
            }
            Key::ArrowDown => {
                menu.move_down();
                EventResult::Handled
            }
            Key::Escape => {
                self.close_overlay();
                EventResult::Handled
            }
            Key::Enter => {
                let block_id = menu.block_id.clone();
                let command = menu.selected();
                self.close_overlay();
                match command {
                    Some(cmd) if self.convert_block_type(&block_id, cmd.kind, &cmd.attrs()) => {
                        EventResult::Mutated
                    }
                    _ => EventResult::Handled,
                }
            }
            Key::Char(_) => EventResult::Ignored,
        }
    }

    fn run_context_command(&mut self, command: ContextCommand) -> EventResult {
        let Mode::ContextMenu { block_id, .. } = &self.mode else {
            return EventResult::Ignored;
        };
        let id = block_id.clone();

        let (changed, select) = match command {
            ContextCommand::Convert { kind, attrs } => {
                (self.convert_block_type(&id, kind, &attrs), id)
            }
            ContextCommand::Delete => {
                let neighbour = self.blocks.previous(&id).cloned();
                let changed = self.delete_block(&id);
                let select = match neighbour {
                    Some(prev) => prev,
                    None => self.blocks.first().id.clone(),
                };
                (changed, select)
            }
            ContextCommand::Duplicate => (self.duplicate_block(&id).is_some(), id),
            ContextCommand::MoveUp => (self.move_block(&id, MoveDirection::Up), id),
            ContextCommand::MoveDown => (self.move_block(&id, MoveDirection::Down), id),
        };

        let end = self.blocks.get(&select).map_or(0, Block::text_len);
        self.select(&select, end);
        if changed {
            EventResult::Mutated
        } else {
            EventResult::Handled
        }
    }
}
