//! # notion-site-sync
//!
//! Keeps a static site's markdown source in step with a Notion database.
//! Each database row becomes one markdown file with front matter; rows that
//! disappear take their file with them.
//!
//! # Architecture: Plan, Then Apply
//!
//! A run is a one-way pipeline. Nothing is written until every page has been
//! fetched, rendered, and compared with what is on disk:
//!
//! ```text
//! 1. Fetch     Notion API / dump  →  Vec<RemotePage>     (remote, notion)
//! 2. Plan      pages              →  files + diff        (classify, serialize, render, manifest)
//! 3. Apply     plan               →  writes, then deletes (sync)
//! ```
//!
//! A failure in 1 or 2 leaves the site untouched. In 3, all writes happen
//! before any delete.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`remote`] | `PageSource` seam, typed accessors over Notion JSON, dump reader |
//! | [`notion`] | Blocking Notion API client: pagination, nested blocks, retries |
//! | [`render`] | Content block tree → markdown |
//! | [`classify`] | `Type` property → Home / navigation page / hidden page |
//! | [`serialize`] | Page → front matter + body at its output path |
//! | [`naming`] | Title slugs and permalinks |
//! | [`manifest`] | Managed-file scan and desired/existing diff |
//! | [`sync`] | Orchestration: plan, apply, run |
//! | [`config`] | `sync.toml` loading, validation, stock defaults |
//! | [`output`] | CLI report formatting |
//! | [`types`] | Shared types (`RemotePage`, `ContentBlock`, `OutputFile`) |
//!
//! # Design Decisions
//!
//! ## Page Id Is Identity, Paths Are Derived
//!
//! A page's output path is computed from its type and title on every run
//! and is never stored. Renaming a page therefore just changes the desired
//! path; the old file falls out as an orphan and is deleted in the same run.
//! There is no state file to drift out of sync with the site.
//!
//! ## Ownership By Location
//!
//! The tool owns the home file and the `.md` files directly inside the pages
//! directory, and nothing else. Manual edits to owned files are overwritten;
//! files anywhere else are never listed, let alone deleted.
//!
//! ## Always Rewrite
//!
//! Every desired file is rewritten on every run instead of comparing content
//! hashes. Runs are small, and an unchanged file rewritten with identical
//! bytes is a no-op for the commit step that follows.
//!
//! ## Closed Block Set
//!
//! Block kinds are a closed enum matched exhaustively by the renderer. A
//! block type Notion adds tomorrow arrives as `Unsupported` and renders to
//! nothing instead of failing the page.

pub mod classify;
pub mod config;
pub mod manifest;
pub mod naming;
pub mod notion;
pub mod output;
pub mod remote;
pub mod render;
pub mod serialize;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
