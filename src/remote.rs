//! Remote page model and the accessor layer over Notion JSON.
//!
//! Notion returns pages, properties, and blocks as loosely typed JSON whose
//! shape depends on a `type` discriminator. This module is the only place
//! that looks at that JSON. It extracts `id`, title, type tag, and the block
//! tree with explicit defaults, so the rest of the crate works on
//! [`RemotePage`] and never on raw values.
//!
//! ## Defaults
//!
//! | Input | Result |
//! |-------|--------|
//! | Missing `id` | [`RemoteError::Malformed`] (no identity, nothing to sync) |
//! | Missing/empty title property | `title: None` (serializer skips the page) |
//! | Missing/empty type property | `page_type: ""` (hidden page) |
//! | Unknown block `type` | [`BlockKind::Unsupported`] |
//! | Missing `rich_text` | no text |
//!
//! ## Sources
//!
//! [`PageSource`] is the seam between the engine and wherever pages come
//! from. [`crate::notion::NotionClient`] talks to the API; [`JsonFileSource`]
//! reads a dump previously written by `export`, which is handy for dry runs
//! and tests.

use crate::config::NotionConfig;
use crate::types::{Annotations, BlockKind, ContentBlock, RemotePage, TextSpan};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Notion API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Rate limited by Notion (attempt {attempts})")]
    RateLimited { attempts: u32 },
    #[error("Malformed remote data: {0}")]
    Malformed(String),
    #[error("Missing setting: {0}")]
    MissingSetting(String),
}

/// Anything that can produce the full, ordered list of remote pages.
///
/// Implementations own pagination, retries, and auth. The engine only sees a
/// completed list; if the list can't be completed, the run fails before any
/// file is touched.
pub trait PageSource {
    fn fetch_pages(&self) -> Result<Vec<RemotePage>, RemoteError>;
}

/// Which page properties carry the title and type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNames {
    pub title: String,
    pub page_type: String,
}

impl PropertyNames {
    pub fn from_config(config: &NotionConfig) -> Self {
        Self {
            title: config.title_property.clone(),
            page_type: config.type_property.clone(),
        }
    }
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self::from_config(&NotionConfig::default())
    }
}

// =============================================================================
// Pages and properties
// =============================================================================

/// Build a [`RemotePage`] from a Notion page object and its block objects.
pub fn page_from_json(
    page: &Value,
    blocks: &[Value],
    names: &PropertyNames,
) -> Result<RemotePage, RemoteError> {
    let id = page_id(page)?;
    let properties = page.get("properties").and_then(Value::as_object);

    let title = properties
        .and_then(|props| title_from_properties(props, &names.title))
        .filter(|t| !t.trim().is_empty());
    let page_type = properties
        .and_then(|props| props.get(&names.page_type))
        .map(property_text)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(RemotePage {
        id,
        title,
        page_type,
        blocks: blocks.iter().map(block_from_json).collect(),
    })
}

/// The `id` of a page object.
pub fn page_id(page: &Value) -> Result<String, RemoteError> {
    page.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Malformed("page object without an id".into()))
}

/// Title from the named property, falling back to the first property whose
/// type is `title` (every Notion database has exactly one).
fn title_from_properties(props: &Map<String, Value>, name: &str) -> Option<String> {
    let named = props
        .get(name)
        .map(property_text)
        .filter(|t| !t.is_empty());
    named.or_else(|| {
        props
            .values()
            .find(|p| p.get("type").and_then(Value::as_str) == Some("title"))
            .map(property_text)
            .filter(|t| !t.is_empty())
    })
}

/// Flatten a property value to text.
///
/// Rich text is flattened to plain text here: titles and type tags go into
/// front matter, not into the body.
pub fn property_text(prop: &Value) -> String {
    let kind = prop.get("type").and_then(Value::as_str).unwrap_or_default();
    let value = prop.get(kind);
    match kind {
        "title" | "rich_text" => value.map(plain_from_rich_text).unwrap_or_default(),
        "select" | "status" => value
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        "multi_select" => value
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|o| o.get("name").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default(),
        "number" => match value {
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
        "checkbox" => match value.and_then(Value::as_bool) {
            Some(true) => "true".to_string(),
            Some(false) => "false".to_string(),
            None => String::new(),
        },
        "date" => value
            .and_then(|v| v.get("start"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        "url" | "email" | "phone_number" => value
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

// =============================================================================
// Blocks
// =============================================================================

/// Convert one Notion block object (with nested `children`, if any).
///
/// Children are read from a top-level `children` array, or from the
/// type-specific object, which is where Notion's own create payloads put
/// them.
pub fn block_from_json(block: &Value) -> ContentBlock {
    let kind_name = block.get("type").and_then(Value::as_str).unwrap_or_default();
    let body = block.get(kind_name).cloned().unwrap_or(Value::Null);
    let text = body
        .get("rich_text")
        .map(rich_text_from_json)
        .unwrap_or_default();

    let kind = match kind_name {
        "paragraph" => BlockKind::Paragraph,
        "heading_1" => BlockKind::Heading { level: 1 },
        "heading_2" => BlockKind::Heading { level: 2 },
        "heading_3" => BlockKind::Heading { level: 3 },
        "bulleted_list_item" => BlockKind::BulletedItem,
        "numbered_list_item" => BlockKind::NumberedItem,
        "to_do" => BlockKind::ToDo {
            checked: body.get("checked").and_then(Value::as_bool).unwrap_or(false),
        },
        "image" => BlockKind::Image {
            url: file_url(&body),
            caption: body
                .get("caption")
                .map(rich_text_from_json)
                .unwrap_or_default(),
        },
        "quote" => BlockKind::Quote,
        "code" => BlockKind::Code {
            language: body
                .get("language")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        "divider" => BlockKind::Divider,
        other => BlockKind::Unsupported {
            kind_name: other.to_string(),
        },
    };

    let children = block
        .get("children")
        .or_else(|| body.get("children"))
        .and_then(Value::as_array)
        .map(|c| c.iter().map(block_from_json).collect())
        .unwrap_or_default();

    ContentBlock {
        kind,
        text,
        children,
    }
}

/// URL of a Notion file object (`external` or Notion-hosted `file`).
fn file_url(body: &Value) -> Option<String> {
    let source = body.get("type").and_then(Value::as_str)?;
    body.get(source)
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

/// Convert a Notion rich-text array to spans.
///
/// `text` items carry their content and link; mentions and equations fall
/// back to `plain_text` and `href`. Annotations without a markdown
/// equivalent (underline, color) are ignored.
pub fn rich_text_from_json(value: &Value) -> Vec<TextSpan> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(span_from_json).collect()
}

fn span_from_json(item: &Value) -> Option<TextSpan> {
    let text = item.get("text");
    let content = text
        .and_then(|t| t.get("content"))
        .or_else(|| item.get("plain_text"))
        .and_then(Value::as_str)?
        .to_string();
    let link = text
        .and_then(|t| t.get("link"))
        .and_then(|l| l.get("url"))
        .or_else(|| item.get("href"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let flag = |name: &str| {
        item.get("annotations")
            .and_then(|a| a.get(name))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    Some(TextSpan {
        content,
        annotations: Annotations {
            bold: flag("bold"),
            italic: flag("italic"),
            strikethrough: flag("strikethrough"),
            code: flag("code"),
        },
        link,
    })
}

fn plain_from_rich_text(value: &Value) -> String {
    rich_text_from_json(value)
        .into_iter()
        .map(|s| s.content)
        .collect()
}

// =============================================================================
// JSON dump source
// =============================================================================

/// Reads pages from a JSON dump: `{"pages": [<page object + "blocks">...]}`.
///
/// Each entry is a Notion page object with an extra `blocks` array holding
/// its block objects, children nested under `children`. This is exactly what
/// `export` writes.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    names: PropertyNames,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>, names: PropertyNames) -> Self {
        Self {
            path: path.into(),
            names,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageSource for JsonFileSource {
    fn fetch_pages(&self) -> Result<Vec<RemotePage>, RemoteError> {
        let content = fs::read_to_string(&self.path)?;
        let dump: Value = serde_json::from_str(&content)?;
        pages_from_dump(&dump, &self.names)
    }
}

/// Parse the `pages` array of a dump.
pub fn pages_from_dump(dump: &Value, names: &PropertyNames) -> Result<Vec<RemotePage>, RemoteError> {
    let entries = dump
        .get("pages")
        .and_then(Value::as_array)
        .ok_or_else(|| RemoteError::Malformed("dump has no \"pages\" array".into()))?;
    entries
        .iter()
        .map(|entry| {
            let blocks = entry
                .get("blocks")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            page_from_json(entry, blocks, names)
        })
        .collect()
}
