//! Shared types passed between the sync stages.
//!
//! Remote data is converted into these types once, at the edge (see
//! [`crate::remote`]). Rendering and everything after it works on these and
//! never on raw Notion JSON.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of the remote database.
///
/// `id` is the only identity that survives between runs. Titles change and
/// must never be used to match a page to a previously generated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePage {
    pub id: String,
    /// `None` when the page has no title property or it is empty.
    pub title: Option<String>,
    /// Raw type tag (`"Home"`, `"Page"`, anything else). Empty when unset.
    pub page_type: String,
    pub blocks: Vec<ContentBlock>,
}

/// One node of a page body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<TextSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentBlock>,
}

/// Closed set of block kinds the renderer knows about.
///
/// Anything else arrives as `Unsupported` and renders to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading {
        level: u8,
    },
    BulletedItem,
    NumberedItem,
    ToDo {
        checked: bool,
    },
    Image {
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        caption: Vec<TextSpan>,
    },
    Quote,
    Code {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Divider,
    Unsupported {
        kind_name: String,
    },
}

/// An inline run of text with its formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    pub content: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Inline annotations that have a markdown equivalent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

/// Output destination category of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// The site's homepage file.
    Home,
    /// A page listed in site navigation.
    NavPage,
    /// A page reachable by direct link only.
    HiddenPage,
}

impl Classification {
    pub fn in_nav(self) -> bool {
        matches!(self, Classification::NavPage)
    }
}

/// A fully serialized markdown file, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// Path relative to the site root.
    pub path: PathBuf,
    pub content: String,
    pub page_id: String,
    pub title: String,
    pub classification: Classification,
}

impl TextSpan {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

impl ContentBlock {
    pub fn new(kind: BlockKind, text: Vec<TextSpan>) -> Self {
        Self {
            kind,
            text,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<ContentBlock>) -> Self {
        self.children = children;
        self
    }
}
