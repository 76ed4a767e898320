//! Page → markdown file.
//!
//! Every generated file is YAML front matter followed by the rendered body:
//!
//! ```text
//! ---
//! title: About Us
//! layout: default
//! type: Page
//! nav_exclude: false
//! permalink: /about-us/
//! ---
//!
//! # Intro
//!
//! hello
//! ```
//!
//! `nav_exclude` and `type` are the contract with the site theme:
//! `nav_exclude` is `false` only for navigation pages, and `type` carries the
//! raw tag so templates can branch on it. The homepage gets no permalink; it
//! is served from the site root.

use crate::classify::classify;
use crate::config::SyncConfig;
use crate::naming;
use crate::render::render_blocks;
use crate::types::{Classification, OutputFile, RemotePage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-page failures. The page is skipped; the run continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("page {page_id} has no title")]
    MissingTitle { page_id: String },
    #[error("front matter for page {page_id} could not be encoded: {message}")]
    FrontMatter { page_id: String, message: String },
}

/// Front matter block of a generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMatter {
    pub title: String,
    pub layout: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub nav_exclude: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

/// Classify and serialize in one step.
pub fn serialize_page(page: &RemotePage, config: &SyncConfig) -> Result<OutputFile, PageError> {
    serialize(page, classify(page), config)
}

/// Produce the output file for a classified page.
pub fn serialize(
    page: &RemotePage,
    classification: Classification,
    config: &SyncConfig,
) -> Result<OutputFile, PageError> {
    let title = page
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PageError::MissingTitle {
            page_id: page.id.clone(),
        })?;

    let (path, permalink) = match classification {
        Classification::Home => (config.output.home_path(), None),
        Classification::NavPage | Classification::HiddenPage => {
            let slug = naming::page_slug(title, &page.id);
            let path = config.output.pages_path().join(format!("{slug}.md"));
            (path, Some(naming::permalink(&slug)))
        }
    };

    let front_matter = FrontMatter {
        title: title.to_string(),
        layout: config.front_matter.layout.clone(),
        page_type: page.page_type.clone(),
        nav_exclude: !classification.in_nav(),
        permalink,
    };

    let mut body = String::new();
    if config.render.title_heading {
        body.push_str(&format!("# {title}"));
    }
    let rendered = render_blocks(&page.blocks);
    if !rendered.is_empty() {
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(&rendered);
    }

    let content = compose(&front_matter, &body).map_err(|e| PageError::FrontMatter {
        page_id: page.id.clone(),
        message: e.to_string(),
    })?;

    Ok(OutputFile {
        path,
        content,
        page_id: page.id.clone(),
        title: title.to_string(),
        classification,
    })
}

/// Join front matter and body into the final file text.
fn compose(front_matter: &FrontMatter, body: &str) -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(front_matter)?;
    let mut out = format!("---\n{yaml}---\n");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    Ok(out)
}

/// Split a generated file back into front matter and body.
///
/// Returns `None` when the text doesn't start with a front matter block.
pub fn parse_front_matter(content: &str) -> Option<(FrontMatter, &str)> {
    let rest = content.strip_prefix("---\n")?;
    let end = rest.find("\n---\n")?;
    let front_matter = serde_yaml::from_str(&rest[..end + 1]).ok()?;
    let body = rest[end + "\n---\n".len()..].trim_start_matches('\n');
    Some((front_matter, body))
}
