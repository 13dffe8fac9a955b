//! Slash command menu: a filtered list of block conversions opened by `/`.

use blockpress_types::BlockId;

use crate::block::{BlockAttrs, BlockKind};

/// One entry of the slash menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlashCommand {
    pub label: &'static str,
    pub kind: BlockKind,
    /// Heading level for the heading entries
    pub level: Option<u8>,
}

impl SlashCommand {
    const fn new(label: &'static str, kind: BlockKind) -> Self {
        Self {
            label,
            kind,
            level: None,
        }
    }

    const fn heading(label: &'static str, level: u8) -> Self {
        Self {
            label,
            kind: BlockKind::Heading,
            level: Some(level),
        }
    }

    /// Attribute patch applied alongside the kind change.
    pub fn attrs(&self) -> BlockAttrs {
        match self.kind {
            BlockKind::Heading => BlockAttrs::heading(self.level.unwrap_or(1)),
            BlockKind::Todo => BlockAttrs {
                checked: Some(false),
                ..BlockAttrs::default()
            },
            _ => BlockAttrs::default(),
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.label.to_lowercase().contains(&query.to_lowercase())
    }
}

pub const SLASH_COMMANDS: [SlashCommand; 11] = [
    SlashCommand::new("Text", BlockKind::Paragraph),
    SlashCommand::heading("Heading 1", 1),
    SlashCommand::heading("Heading 2", 2),
    SlashCommand::heading("Heading 3", 3),
    SlashCommand::new("Bulleted list", BlockKind::BulletList),
    SlashCommand::new("Numbered list", BlockKind::OrderedList),
    SlashCommand::new("To-do", BlockKind::Todo),
    SlashCommand::new("Code", BlockKind::Code),
    SlashCommand::new("Quote", BlockKind::Blockquote),
    SlashCommand::new("Divider", BlockKind::Divider),
    SlashCommand::new("Image", BlockKind::Image),
];

/// Open slash menu anchored at one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashMenu {
    pub block_id: BlockId,
    query: String,
    highlight: usize,
}

impl SlashMenu {
    pub fn open(block_id: BlockId) -> Self {
        Self {
            block_id,
            query: String::new(),
            highlight: 0,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn highlight(&self) -> usize {
        self.highlight
    }

    /// Commands whose label contains the query, case-insensitively.
    pub fn filtered(&self) -> Vec<&'static SlashCommand> {
        SLASH_COMMANDS
            .iter()
            .filter(|cmd| cmd.matches(&self.query))
            .collect()
    }

    pub fn selected(&self) -> Option<&'static SlashCommand> {
        self.filtered().get(self.highlight).copied()
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.highlight = 0;
    }

    /// Drop the last query character. Returns false when the query was
    /// already empty, meaning the menu should close.
    pub fn pop(&mut self) -> bool {
        if self.query.pop().is_none() {
            return false;
        }
        self.highlight = 0;
        true
    }

    pub fn move_up(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        self.highlight = (self.highlight + len - 1) % len;
    }

    pub fn move_down(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        self.highlight = (self.highlight + 1) % len;
    }
}
