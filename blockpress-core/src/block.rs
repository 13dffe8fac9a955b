//! Block types: the atomic editable unit of a document.

use blockpress_types::BlockId;
use serde::{Deserialize, Serialize};

use crate::content::ContentNode;

/// Types of blocks in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Paragraph,
    /// Heading (level 1-3, see [`BlockAttrs::level`])
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    /// Code block (with optional language)
    Code,
    Blockquote,
    /// Image (url + alt in attrs)
    Image,
    /// Horizontal rule
    Divider,
    /// Embedded external content (url in attrs)
    Embed,
    Table,
    TableRow,
    TableCell,
    /// Checkbox item
    Todo,
}

impl BlockKind {
    pub const ALL: [BlockKind; 14] = [
        BlockKind::Paragraph,
        BlockKind::Heading,
        BlockKind::BulletList,
        BlockKind::OrderedList,
        BlockKind::ListItem,
        BlockKind::Code,
        BlockKind::Blockquote,
        BlockKind::Image,
        BlockKind::Divider,
        BlockKind::Embed,
        BlockKind::Table,
        BlockKind::TableRow,
        BlockKind::TableCell,
        BlockKind::Todo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::BulletList => "bulletList",
            BlockKind::OrderedList => "orderedList",
            BlockKind::ListItem => "listItem",
            BlockKind::Code => "code",
            BlockKind::Blockquote => "blockquote",
            BlockKind::Image => "image",
            BlockKind::Divider => "divider",
            BlockKind::Embed => "embed",
            BlockKind::Table => "table",
            BlockKind::TableRow => "tableRow",
            BlockKind::TableCell => "tableCell",
            BlockKind::Todo => "todo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        BlockKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Whether this block kind holds editable text
    pub fn has_text(&self) -> bool {
        match self {
            BlockKind::Paragraph
            | BlockKind::Heading
            | BlockKind::BulletList
            | BlockKind::OrderedList
            | BlockKind::ListItem
            | BlockKind::Code
            | BlockKind::Blockquote
            | BlockKind::TableCell
            | BlockKind::Todo => true,
            BlockKind::Image
            | BlockKind::Divider
            | BlockKind::Embed
            | BlockKind::Table
            | BlockKind::TableRow => false,
        }
    }

    /// Minimal valid content for a freshly created block of this kind.
    pub fn empty_content(&self) -> ContentNode {
        if self.has_text() {
            ContentNode::empty_doc()
        } else {
            ContentNode::doc(Vec::new())
        }
    }

    /// Kind given to the block that receives the tail of a split.
    ///
    /// Text kinds continue as themselves except headings, whose tail becomes
    /// a paragraph. Void kinds have no text to carry and continue as
    /// paragraphs too.
    pub fn continuation(&self) -> BlockKind {
        match self {
            BlockKind::Heading => BlockKind::Paragraph,
            kind if kind.has_text() => *kind,
            _ => BlockKind::Paragraph,
        }
    }

    /// Human-readable name shown in menus.
    pub fn label(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "Text",
            BlockKind::Heading => "Heading",
            BlockKind::BulletList => "Bulleted list",
            BlockKind::OrderedList => "Numbered list",
            BlockKind::ListItem => "List item",
            BlockKind::Code => "Code",
            BlockKind::Blockquote => "Quote",
            BlockKind::Image => "Image",
            BlockKind::Divider => "Divider",
            BlockKind::Embed => "Embed",
            BlockKind::Table => "Table",
            BlockKind::TableRow => "Table row",
            BlockKind::TableCell => "Table cell",
            BlockKind::Todo => "To-do",
        }
    }
}

/// Horizontal alignment of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Type-dependent block attributes.
///
/// Only the fields relevant to a block's kind are meaningful; the rest are
/// carried along untouched so that converting back and forth loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockAttrs {
    /// Heading level (1-3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,

    /// Code block language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Image or embed source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Image alternative text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    /// Todo checked state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
}

impl BlockAttrs {
    pub fn heading(level: u8) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn code(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Self::default()
        }
    }

    pub fn image(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            alt: Some(alt.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Shallow merge: every field set in `patch` overwrites ours.
    pub fn merge(&mut self, patch: &BlockAttrs) {
        if patch.level.is_some() {
            self.level = patch.level;
        }
        if patch.language.is_some() {
            self.language = patch.language.clone();
        }
        if patch.url.is_some() {
            self.url = patch.url.clone();
        }
        if patch.alt.is_some() {
            self.alt = patch.alt.clone();
        }
        if patch.checked.is_some() {
            self.checked = patch.checked;
        }
        if patch.alignment.is_some() {
            self.alignment = patch.alignment;
        }
    }
}

/// Block in a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,

    #[serde(rename = "type")]
    pub kind: BlockKind,

    #[serde(default)]
    pub content: ContentNode,

    #[serde(default, skip_serializing_if = "BlockAttrs::is_empty")]
    pub attrs: BlockAttrs,

    /// Nested blocks. Carried for table/nesting support; the sequence
    /// operations never look inside.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl Block {
    /// A fresh block of `kind` with empty content.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
            content: kind.empty_content(),
            attrs: BlockAttrs::default(),
            children: Vec::new(),
        }
    }

    pub fn paragraph(text: &str) -> Self {
        Self {
            content: ContentNode::paragraph_doc(text),
            ..Self::new(BlockKind::Paragraph)
        }
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Self {
            content: ContentNode::paragraph_doc(text),
            attrs: BlockAttrs::heading(level),
            ..Self::new(BlockKind::Heading)
        }
    }

    pub fn with_attrs(mut self, attrs: BlockAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    /// Heading level clamped to the supported 1-3 range.
    pub fn heading_level(&self) -> u8 {
        self.attrs.level.unwrap_or(1).clamp(1, 3)
    }

    pub fn is_checked(&self) -> bool {
        self.attrs.checked.unwrap_or(false)
    }

    pub fn plain_text(&self) -> String {
        self.content.plain_text()
    }

    pub fn text_len(&self) -> usize {
        self.content.text_len()
    }

    /// Reset to an empty paragraph, keeping the id.
    pub fn clear(&mut self) {
        self.kind = BlockKind::Paragraph;
        self.content = ContentNode::empty_doc();
        self.attrs = BlockAttrs::default();
        self.children.clear();
    }
}
