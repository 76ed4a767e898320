//! Shared test utilities.
//!
//! Builders for pages and blocks, in-memory page sources, and small
//! filesystem helpers for site-root temp directories.
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let about = page("p1", "About Us", "Page", vec![
//!     heading(1, "Intro"),
//!     bullet("a").with_children(vec![bullet("nested")]),
//! ]);
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::remote::{PageSource, RemoteError};
use crate::types::{Annotations, BlockKind, ContentBlock, RemotePage, TextSpan};

// =========================================================================
// Pages
// =========================================================================

pub fn page(id: &str, title: &str, page_type: &str, blocks: Vec<ContentBlock>) -> RemotePage {
    RemotePage {
        id: id.to_string(),
        title: Some(title.to_string()),
        page_type: page_type.to_string(),
        blocks,
    }
}

pub fn untitled_page(id: &str, page_type: &str) -> RemotePage {
    RemotePage {
        id: id.to_string(),
        title: None,
        page_type: page_type.to_string(),
        blocks: Vec::new(),
    }
}

// =========================================================================
// Blocks
// =========================================================================

fn text_block(kind: BlockKind, text: &str) -> ContentBlock {
    let spans = if text.is_empty() {
        Vec::new()
    } else {
        vec![TextSpan::plain(text)]
    };
    ContentBlock::new(kind, spans)
}

pub fn paragraph(text: &str) -> ContentBlock {
    text_block(BlockKind::Paragraph, text)
}

pub fn heading(level: u8, text: &str) -> ContentBlock {
    text_block(BlockKind::Heading { level }, text)
}

pub fn bullet(text: &str) -> ContentBlock {
    text_block(BlockKind::BulletedItem, text)
}

pub fn numbered(text: &str) -> ContentBlock {
    text_block(BlockKind::NumberedItem, text)
}

pub fn todo(text: &str, checked: bool) -> ContentBlock {
    text_block(BlockKind::ToDo { checked }, text)
}

pub fn image(url: &str, caption: &str) -> ContentBlock {
    let caption = if caption.is_empty() {
        Vec::new()
    } else {
        vec![TextSpan::plain(caption)]
    };
    ContentBlock::new(
        BlockKind::Image {
            url: Some(url.to_string()),
            caption,
        },
        Vec::new(),
    )
}

pub fn unsupported(kind_name: &str) -> ContentBlock {
    ContentBlock::new(
        BlockKind::Unsupported {
            kind_name: kind_name.to_string(),
        },
        vec![TextSpan::plain("ignored")],
    )
}

pub fn span(content: &str, annotations: Annotations, link: Option<&str>) -> TextSpan {
    TextSpan {
        content: content.to_string(),
        annotations,
        link: link.map(str::to_string),
    }
}

// =========================================================================
// Sources
// =========================================================================

/// Returns a fixed list of pages.
pub struct StaticSource(pub Vec<RemotePage>);

impl PageSource for StaticSource {
    fn fetch_pages(&self) -> Result<Vec<RemotePage>, RemoteError> {
        Ok(self.0.clone())
    }
}

/// Always fails, like an unreachable API.
pub struct FailingSource;

impl PageSource for FailingSource {
    fn fetch_pages(&self) -> Result<Vec<RemotePage>, RemoteError> {
        Err(RemoteError::Api {
            status: 401,
            message: "unauthorized".to_string(),
        })
    }
}

// =========================================================================
// Filesystem
// =========================================================================

pub fn paths(items: &[&str]) -> BTreeSet<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

/// Write `content` at `rel` under `root`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Read the file at `rel` under `root`. Panics with the path on miss.
pub fn read_file(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel))
        .unwrap_or_else(|e| panic!("could not read '{rel}': {e}"))
}
