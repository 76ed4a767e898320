//! Content block → markdown rendering.
//!
//! Rendering is a pure function of the block tree. It knows nothing about
//! pages, paths, or front matter.
//!
//! ## Block Mapping
//!
//! ```text
//! Paragraph        text
//! Heading(n)       ### text           (n = 1..=3 hashes)
//! BulletedItem     - text
//! NumberedItem     1. text            (markdown renumbers)
//! ToDo             - [x] text / - [ ] text
//! Image            ![alt](url)        (+ caption line when captioned)
//! Quote            > text
//! Code             ```lang … ```
//! Divider          ---
//! Unsupported      (nothing)
//! ```
//!
//! Siblings are joined by one blank line in source order. Blocks that render
//! to nothing are dropped before joining, so an unsupported block never
//! leaves a gap behind.
//!
//! ## Nesting
//!
//! Children of list-like blocks are indented four spaces under the item,
//! which CommonMark reads as content of that item. Children of a quote stay
//! inside the quote. Any other block's children follow it at the same level.

use crate::naming;
use crate::types::{BlockKind, ContentBlock, TextSpan};

const CHILD_INDENT: &str = "    ";

/// Render a sequence of sibling blocks.
pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    join_fragments(blocks.iter().map(render_block))
}

/// Render one block and its children. May return an empty string.
pub fn render_block(block: &ContentBlock) -> String {
    let text = render_inline(&block.text);
    match &block.kind {
        BlockKind::Paragraph => {
            join_fragments([text, render_blocks(&block.children)])
        }
        BlockKind::Heading { level } => {
            // A toggle heading may have no text of its own but still carry
            // a body.
            let heading = if text.is_empty() {
                String::new()
            } else {
                format!("{} {}", "#".repeat((*level).clamp(1, 3) as usize), text)
            };
            join_fragments([heading, render_blocks(&block.children)])
        }
        BlockKind::BulletedItem => list_item("- ", &text, &block.children),
        BlockKind::NumberedItem => list_item("1. ", &text, &block.children),
        BlockKind::ToDo { checked } => {
            let marker = if *checked { "- [x] " } else { "- [ ] " };
            list_item(marker, &text, &block.children)
        }
        BlockKind::Image { url, caption } => render_image(url.as_deref(), caption),
        BlockKind::Quote => {
            let inner = join_fragments([text, render_blocks(&block.children)]);
            prefix_lines(&inner, "> ", ">")
        }
        BlockKind::Code { language } => {
            let code: String = block.text.iter().map(|s| s.content.as_str()).collect();
            if code.is_empty() {
                return String::new();
            }
            let lang = match language.as_deref() {
                Some("plain text") | None => "",
                Some(l) => l,
            };
            format!("```{lang}\n{code}\n```")
        }
        BlockKind::Divider => "---".to_string(),
        BlockKind::Unsupported { .. } => String::new(),
    }
}

/// Render inline spans, translating annotations to markdown.
pub fn render_inline(spans: &[TextSpan]) -> String {
    spans.iter().map(render_span).collect()
}

/// Concatenate plain span text, ignoring formatting.
pub fn plain_text(spans: &[TextSpan]) -> String {
    spans.iter().map(|s| s.content.as_str()).collect()
}

fn render_span(span: &TextSpan) -> String {
    if span.content.is_empty() {
        return String::new();
    }
    // Markers must hug the text: `** bold**` is not bold in CommonMark.
    let trimmed = span.content.trim();
    if trimmed.is_empty() {
        return span.content.clone();
    }
    let start = span.content.find(trimmed).unwrap_or(0);
    let leading = &span.content[..start];
    let trailing = &span.content[start + trimmed.len()..];

    let a = span.annotations;
    let mut inner = trimmed.to_string();
    if a.code {
        inner = format!("`{inner}`");
    }
    if a.strikethrough {
        inner = format!("~~{inner}~~");
    }
    if a.italic {
        inner = format!("*{inner}*");
    }
    if a.bold {
        inner = format!("**{inner}**");
    }
    if let Some(url) = &span.link {
        inner = format!("[{inner}]({url})");
    }
    format!("{leading}{inner}{trailing}")
}

fn list_item(marker: &str, text: &str, children: &[ContentBlock]) -> String {
    let children = render_blocks(children);
    if text.is_empty() && children.is_empty() {
        return String::new();
    }
    let mut out = format!("{marker}{text}");
    if !children.is_empty() {
        out.push('\n');
        out.push_str(&prefix_lines(&children, CHILD_INDENT, ""));
    }
    out
}

fn render_image(url: Option<&str>, caption: &[TextSpan]) -> String {
    let Some(url) = url.filter(|u| !u.is_empty()) else {
        return String::new();
    };
    let caption_plain = plain_text(caption);
    let caption_plain = caption_plain.trim();
    if caption_plain.is_empty() {
        format!("![{}]({url})", naming::url_file_stem(url))
    } else {
        format!("![{caption_plain}]({url})\n*{}*", render_inline(caption).trim())
    }
}

/// Prefix every line of `text`. Empty lines get `blank_prefix` instead so no
/// trailing whitespace is emitted.
fn prefix_lines(text: &str, prefix: &str, blank_prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                blank_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_fragments<I>(fragments: I) -> String
where
    I: IntoIterator<Item = String>,
{
    fragments
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
