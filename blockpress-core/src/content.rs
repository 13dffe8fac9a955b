//! Rich-text content carried by a block.
//!
//! Content is a small tree in the tiptap/ProseMirror JSON shape:
//!
//! ```json
//! {"type": "doc", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "hi"}]}]}
//! ```
//!
//! The block-sequence logic treats content as opaque. The operations here
//! are the few the editor needs: measuring, splitting at a cursor offset,
//! joining two trees, and inserting pasted text.
//!
//! Offsets count `char`s of inline text. A `hardBreak` counts as one
//! character and block boundaries count as nothing, so offset `n` means
//! "after the n-th visible character".

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DOC: &str = "doc";
const PARAGRAPH: &str = "paragraph";
const TEXT: &str = "text";
const HARD_BREAK: &str = "hardBreak";

/// Node kinds that hold inline content even when they are empty.
const TEXTBLOCK_KINDS: &[&str] = &["paragraph", "heading", "codeBlock"];

/// An inline formatting mark (bold, italic, link, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl Mark {
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs: Map::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

/// A node of the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentNode>,
}

impl Default for ContentNode {
    fn default() -> Self {
        Self::empty_doc()
    }
}

impl ContentNode {
    pub fn element(kind: impl Into<String>, content: Vec<ContentNode>) -> Self {
        Self {
            kind: kind.into(),
            text: None,
            marks: Vec::new(),
            attrs: Map::new(),
            content,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::element(TEXT, Vec::new())
        }
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            marks,
            ..Self::text(text)
        }
    }

    pub fn hard_break() -> Self {
        Self::element(HARD_BREAK, Vec::new())
    }

    pub fn doc(content: Vec<ContentNode>) -> Self {
        Self::element(DOC, content)
    }

    /// A document holding one empty paragraph.
    pub fn empty_doc() -> Self {
        Self::doc(vec![Self::element(PARAGRAPH, Vec::new())])
    }

    /// A document holding one paragraph with `text` (no text node when empty).
    pub fn paragraph_doc(text: &str) -> Self {
        let inline = if text.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(text)]
        };
        Self::doc(vec![Self::element(PARAGRAPH, inline)])
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == TEXT
    }

    pub fn is_hard_break(&self) -> bool {
        self.kind == HARD_BREAK
    }

    fn is_inline(&self) -> bool {
        self.is_text() || self.is_hard_break()
    }

    /// Whether this node directly holds inline content.
    pub fn is_textblock(&self) -> bool {
        if self.kind == DOC || self.is_inline() {
            return false;
        }
        TEXTBLOCK_KINDS.contains(&self.kind.as_str())
            || (!self.content.is_empty() && self.content.iter().all(ContentNode::is_inline))
    }

    fn is_container(&self) -> bool {
        !self.is_inline() && !self.is_textblock() && !self.content.is_empty()
    }

    /// Number of addressable characters in this subtree.
    pub fn text_len(&self) -> usize {
        match self.kind.as_str() {
            TEXT => self.text.as_deref().map_or(0, |t| t.chars().count()),
            HARD_BREAK => 1,
            _ => self.content.iter().map(ContentNode::text_len).sum(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.plain_text().trim().is_empty()
    }

    /// Visible text, with text blocks separated by newlines.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.write_plain(&mut out);
        out
    }

    fn write_plain(&self, out: &mut String) {
        match self.kind.as_str() {
            TEXT => out.push_str(self.text.as_deref().unwrap_or("")),
            HARD_BREAK => out.push('\n'),
            _ if self.is_textblock() => {
                for child in &self.content {
                    child.write_plain(out);
                }
            }
            _ => {
                for (ix, child) in self.content.iter().enumerate() {
                    if ix > 0 {
                        out.push('\n');
                    }
                    child.write_plain(out);
                }
            }
        }
    }

    /// Copy of this node without text or children.
    fn shell(&self) -> ContentNode {
        ContentNode {
            kind: self.kind.clone(),
            text: None,
            marks: self.marks.clone(),
            attrs: self.attrs.clone(),
            content: Vec::new(),
        }
    }

    fn with_text(&self, text: &str) -> Option<ContentNode> {
        if text.is_empty() {
            return None;
        }
        let mut node = self.clone();
        node.text = Some(text.to_string());
        Some(node)
    }

    /// Split into the content before and after `offset`.
    ///
    /// The text block containing the offset is divided into two text blocks
    /// of the same kind, so both halves stay well formed. Joining the halves
    /// back with [`ContentNode::append`] restores the original text.
    pub fn split_at(&self, offset: usize) -> (ContentNode, ContentNode) {
        let offset = offset.min(self.text_len());
        let (left, right) = self.split_inner(offset);
        (
            left.unwrap_or_else(|| self.shell()),
            right.unwrap_or_else(|| self.shell()),
        )
    }

    fn split_inner(&self, offset: usize) -> (Option<ContentNode>, Option<ContentNode>) {
        if self.is_text() {
            let text = self.text.as_deref().unwrap_or("");
            let (head, tail) = text.split_at(char_to_byte(text, offset));
            return (self.with_text(head), self.with_text(tail));
        }
        if self.kind == HARD_BREAK {
            return if offset == 0 {
                (None, Some(self.clone()))
            } else {
                (Some(self.clone()), None)
            };
        }
        if self.content.is_empty() && !self.is_textblock() && self.kind != DOC {
            // Void leaf (image, rule): stays with the left half.
            return (Some(self.clone()), None);
        }

        let mut left = self.shell();
        let mut right = self.shell();
        let mut pos = 0;

        if self.is_textblock() {
            for child in &self.content {
                let len = child.text_len();
                if pos + len <= offset {
                    left.content.push(child.clone());
                } else if pos >= offset {
                    right.content.push(child.clone());
                } else {
                    let (l, r) = child.split_inner(offset - pos);
                    left.content.extend(l);
                    right.content.extend(r);
                }
                pos += len;
            }
        } else {
            let mut split_done = false;
            for child in &self.content {
                let len = child.text_len();
                if split_done {
                    right.content.push(child.clone());
                } else if offset <= pos + len {
                    let (l, r) = child.split_inner(offset - pos);
                    left.content.extend(l);
                    right.content.extend(r);
                    split_done = true;
                } else {
                    left.content.push(child.clone());
                }
                pos += len;
            }
        }

        (Some(left), Some(right))
    }

    /// Append `other` to the end of this tree.
    ///
    /// The trailing text block of `self` and the leading text block of
    /// `other` are joined into one; remaining children follow in order.
    pub fn append(&mut self, other: ContentNode) {
        join_children(&mut self.content, other.content);
    }

    /// Insert unformatted `text` at `offset`.
    pub fn insert_text(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let (mut head, tail) = self.split_at(offset);
        head.append(ContentNode::paragraph_doc(text));
        head.append(tail);
        *self = head;
    }
}

fn join_children(target: &mut Vec<ContentNode>, incoming: Vec<ContentNode>) {
    let mut incoming = incoming.into_iter();
    let Some(first) = incoming.next() else {
        return;
    };

    match target.last_mut() {
        Some(last) if last.is_textblock() && first.is_textblock() => {
            last.content.extend(first.content);
            normalize_inline(&mut last.content);
        }
        Some(last)
            if last.is_container() && last.kind == first.kind && last.attrs == first.attrs =>
        {
            join_children(&mut last.content, first.content);
        }
        Some(last) if last.is_container() && first.is_textblock() => {
            join_children(&mut last.content, vec![first]);
        }
        _ => target.push(first),
    }

    target.extend(incoming);
}

/// Drop empty text nodes and merge neighbours that carry the same marks.
fn normalize_inline(nodes: &mut Vec<ContentNode>) {
    let mut out: Vec<ContentNode> = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        if node.is_text() && node.text.as_deref().map_or(true, str::is_empty) {
            continue;
        }
        if let Some(prev) = out.last_mut() {
            if prev.is_text() && node.is_text() && prev.marks == node.marks {
                if let (Some(head), Some(tail)) = (prev.text.as_mut(), node.text.as_deref()) {
                    head.push_str(tail);
                    continue;
                }
            }
        }
        out.push(node);
    }
    *nodes = out;
}

fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}
