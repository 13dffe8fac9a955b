//! # blockpress-core
//!
//! Document model and editing engine for blockpress.
//!
//! This crate holds everything that runs synchronously inside the editor:
//! the block types and their rich-text content, the total mutation
//! operations over a block sequence, the interaction state machine that
//! turns keys, clicks and drags into mutations, and Markdown export.
//! Persistence lives in `blockpress-sync`.

pub mod block;
pub mod blocks;
pub mod content;
pub mod document;
pub mod editor;
pub mod interaction;
pub mod render;
pub mod slash;

pub use block::{Alignment, Block, BlockAttrs, BlockKind};
pub use blocks::{BlockList, DropPosition, MoveDirection};
pub use content::{ContentNode, Mark};
pub use document::{Document, DocumentPatch, DocumentSummary, Seed, ValidationError};
pub use editor::{BlocksListener, Editor};
pub use interaction::{
    Bounds, ContextCommand, DropTarget, EditorEvent, EventResult, Key, Mode, Modifiers, Point,
    Selection,
};
pub use render::{blocks_to_markdown, document_to_markdown};
pub use slash::{SlashCommand, SlashMenu, SLASH_COMMANDS};

pub use blockpress_types::{BlockId, DocId, MediaRef, UserId};
