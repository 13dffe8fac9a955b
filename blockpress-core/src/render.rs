//! Markdown export of a block sequence (used by the public read view).

use crate::block::{Block, BlockKind};
use crate::content::{ContentNode, Mark};
use crate::document::Document;

/// Render a document as Markdown: title first, then its blocks.
pub fn document_to_markdown(doc: &Document) -> String {
    let body = blocks_to_markdown(&doc.blocks);
    let repeats_title = doc.blocks.first().is_some_and(|b| {
        b.kind == BlockKind::Heading && b.heading_level() == 1 && b.plain_text() == doc.title
    });
    if repeats_title || doc.title.is_empty() {
        body
    } else {
        format!("# {}\n\n{}", doc.title, body)
    }
}

/// Render blocks as Markdown.
///
/// Adjacent list items of the same family are kept on consecutive lines;
/// everything else is separated by a blank line.
pub fn blocks_to_markdown(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut ordinal = 0;
    let mut prev: Option<BlockKind> = None;

    for block in blocks {
        ordinal = if block.kind == BlockKind::OrderedList {
            ordinal + 1
        } else {
            0
        };

        if let Some(prev) = prev {
            out.push_str(if same_list(prev, block.kind) { "\n" } else { "\n\n" });
        }
        out.push_str(&block_to_markdown(block, ordinal));
        prev = Some(block.kind);
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn same_list(a: BlockKind, b: BlockKind) -> bool {
    let family = |k: BlockKind| match k {
        BlockKind::BulletList | BlockKind::ListItem | BlockKind::Todo => Some(0),
        BlockKind::OrderedList => Some(1),
        _ => None,
    };
    family(a).is_some() && family(a) == family(b)
}

/// Markdown for one block. `ordinal` numbers ordered-list items.
pub fn block_to_markdown(block: &Block, ordinal: usize) -> String {
    let text = inline_markdown(&block.content);
    match block.kind {
        BlockKind::Paragraph | BlockKind::TableCell => text,
        BlockKind::Heading => {
            format!("{} {}", "#".repeat(block.heading_level() as usize), text)
        }
        BlockKind::BulletList | BlockKind::ListItem => prefix_lines(&text, "- ", "  "),
        BlockKind::OrderedList => {
            let marker = format!("{}. ", ordinal.max(1));
            let indent = " ".repeat(marker.len());
            prefix_lines(&text, &marker, &indent)
        }
        BlockKind::Todo => {
            let marker = if block.is_checked() { "- [x] " } else { "- [ ] " };
            prefix_lines(&text, marker, "      ")
        }
        BlockKind::Code => {
            let language = block.attrs.language.as_deref().unwrap_or("");
            format!("```{}\n{}\n```", language, block.plain_text())
        }
        BlockKind::Blockquote => prefix_lines(&text, "> ", "> "),
        BlockKind::Image => {
            let url = block.attrs.url.as_deref().unwrap_or("");
            let alt = block.attrs.alt.as_deref().unwrap_or("");
            format!("![{}]({})", alt, url)
        }
        BlockKind::Divider => "---".to_string(),
        BlockKind::Embed => match block.attrs.url.as_deref() {
            Some(url) => format!("<{}>", url),
            None => String::new(),
        },
        BlockKind::Table => table_markdown(&block.children),
        BlockKind::TableRow => row_markdown(block),
    }
}

fn table_markdown(rows: &[Block]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (ix, row) in rows.iter().enumerate() {
        lines.push(row_markdown(row));
        if ix == 0 {
            let cols = row.children.len().max(1);
            lines.push(format!("|{}", " --- |".repeat(cols)));
        }
    }
    lines.join("\n")
}

fn row_markdown(row: &Block) -> String {
    let cells: Vec<String> = row
        .children
        .iter()
        .map(|cell| inline_markdown(&cell.content).replace('\n', " "))
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::new();
    for (ix, line) in text.split('\n').enumerate() {
        if ix > 0 {
            out.push('\n');
        }
        out.push_str(if ix == 0 { first } else { rest });
        out.push_str(line);
    }
    out
}

/// Inline Markdown of a content tree, one line per text block.
pub fn inline_markdown(content: &ContentNode) -> String {
    let mut lines = Vec::new();
    collect_lines(content, &mut lines);
    lines.join("\n")
}

fn collect_lines(node: &ContentNode, lines: &mut Vec<String>) {
    if node.is_textblock() {
        let mut line = String::new();
        for child in &node.content {
            write_inline(child, &mut line);
        }
        lines.push(line);
    } else if node.is_text() || node.is_hard_break() {
        let mut line = String::new();
        write_inline(node, &mut line);
        lines.push(line);
    } else {
        for child in &node.content {
            collect_lines(child, lines);
        }
    }
}

fn write_inline(node: &ContentNode, out: &mut String) {
    if node.is_hard_break() {
        out.push_str("  \n");
        return;
    }
    let Some(text) = node.text.as_deref() else {
        return;
    };
    let mut rendered = text.to_string();
    // Innermost marks first so that links wrap the emphasised text.
    for mark in node.marks.iter().filter(|m| m.mark_type != "link") {
        rendered = wrap_mark(mark, &rendered);
    }
    if let Some(link) = node.marks.iter().find(|m| m.mark_type == "link") {
        rendered = format!("[{}]({})", rendered, link.attr_str("href").unwrap_or(""));
    }
    out.push_str(&rendered);
}

fn wrap_mark(mark: &Mark, text: &str) -> String {
    let delimiter = match mark.mark_type.as_str() {
        "bold" | "strong" => "**",
        "italic" | "em" => "*",
        "strike" => "~~",
        "code" => "`",
        _ => return text.to_string(),
    };
    format!("{delimiter}{text}{delimiter}")
}
