//! Input events, selection and the editor's interaction mode.

use blockpress_types::BlockId;
use serde::{Deserialize, Serialize};

use crate::block::{BlockAttrs, BlockKind};
use crate::blocks::DropPosition;
use crate::content::ContentNode;
use crate::slash::SlashMenu;

/// Cursor/selection inside one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub block_id: BlockId,
    pub anchor_offset: usize,
    pub focus_offset: usize,
}

impl Selection {
    /// Collapsed cursor at `offset`.
    pub fn caret(block_id: BlockId, offset: usize) -> Self {
        Self {
            block_id,
            anchor_offset: offset,
            focus_offset: offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_offset == self.focus_offset
    }

    /// Where typed or pasted text goes.
    pub fn cursor(&self) -> usize {
        self.focus_offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Vertical extent of a rendered block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f64,
    pub height: f64,
}

impl Bounds {
    /// Before when the pointer is above the vertical midpoint.
    pub fn drop_position(&self, pointer_y: f64) -> DropPosition {
        if pointer_y < self.top + self.height / 2.0 {
            DropPosition::Before
        } else {
            DropPosition::After
        }
    }
}

/// Current drop target while dragging
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub block_id: BlockId,
    pub position: DropPosition,
}

/// Interaction mode. A single enum so at most one overlay is open.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Selected(BlockId),
    SlashMenu(SlashMenu),
    ContextMenu { block_id: BlockId, position: Point },
    Dragging {
        source: BlockId,
        hover: Option<DropTarget>,
    },
}

impl Mode {
    /// Block the mode is anchored at, if any.
    pub fn block_id(&self) -> Option<&BlockId> {
        match self {
            Mode::Idle => None,
            Mode::Selected(id) => Some(id),
            Mode::SlashMenu(menu) => Some(&menu.block_id),
            Mode::ContextMenu { block_id, .. } => Some(block_id),
            Mode::Dragging { source, .. } => Some(source),
        }
    }

    pub fn has_overlay(&self) -> bool {
        matches!(self, Mode::SlashMenu(_) | Mode::ContextMenu { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        meta: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Escape,
    ArrowUp,
    ArrowDown,
    Char(char),
}

/// Entries of the block context menu
#[derive(Debug, Clone, PartialEq)]
pub enum ContextCommand {
    Convert { kind: BlockKind, attrs: BlockAttrs },
    Delete,
    Duplicate,
    MoveUp,
    MoveDown,
}

/// Everything the editor reacts to
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Click(BlockId),
    SelectionChange(Selection),
    Key { key: Key, modifiers: Modifiers },
    /// A block's own editor reports new content
    ContentChanged { block_id: BlockId, content: ContentNode },
    OpenContextMenu { block_id: BlockId, position: Point },
    ContextCommand(ContextCommand),
    DragStart(BlockId),
    DragOver { target: BlockId, bounds: Bounds, pointer_y: f64 },
    Drop { target: BlockId, bounds: Bounds, pointer_y: f64 },
    DragEnd,
    ClickOutside,
    Paste(String),
    ToggleTodo(BlockId),
}

impl EditorEvent {
    pub fn key(key: Key) -> Self {
        EditorEvent::Key {
            key,
            modifiers: Modifiers::NONE,
        }
    }
}

/// What handling an event amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Not consumed; the block's own editor should handle it
    Ignored,
    /// Consumed without touching the blocks
    Handled,
    /// Blocks changed and listeners were notified
    Mutated,
    /// The user asked to save immediately
    SaveRequested,
}
