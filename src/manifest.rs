//! Desired vs. existing output paths.
//!
//! The tool owns exactly two locations, both relative to the site root:
//!
//! ```text
//! site/
//! ├── index.md          ← home file (owned)
//! ├── _pages/
//! │   ├── about-us.md   ← owned: .md directly inside the pages dir
//! │   ├── logo.png      ← not owned (not markdown)
//! │   └── drafts/x.md   ← not owned (nested)
//! ├── _config.yml       ← not owned
//! └── README.md         ← not owned
//! ```
//!
//! [`scan_managed`] lists what currently exists in those locations;
//! [`diff`] is pure set arithmetic over paths. Deleting
//! `existing − desired` is the whole cleanup mechanism: a deleted page leaves
//! its file in that difference, and so does the old path of a renamed page.

use crate::config::OutputConfig;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of comparing desired and existing managed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Every desired path. Content is always rewritten.
    pub to_write: BTreeSet<PathBuf>,
    /// Existing managed paths no page maps to anymore.
    pub to_delete: BTreeSet<PathBuf>,
    /// Desired paths not present before this run.
    pub to_create: BTreeSet<PathBuf>,
    /// Desired paths that already existed (overwritten).
    pub to_update: BTreeSet<PathBuf>,
}

/// Compare the paths this run will produce with what is already on disk.
///
/// `to_write` and `to_delete` are disjoint by construction.
pub fn diff(desired: &BTreeSet<PathBuf>, existing: &BTreeSet<PathBuf>) -> ManifestDiff {
    ManifestDiff {
        to_write: desired.clone(),
        to_delete: existing.difference(desired).cloned().collect(),
        to_create: desired.difference(existing).cloned().collect(),
        to_update: desired.intersection(existing).cloned().collect(),
    }
}

/// List managed files currently on disk, as paths relative to `site_root`.
///
/// Includes the home file when it is a regular file, and every `.md` file
/// directly inside the pages directory. A missing pages directory is an
/// empty listing, not an error.
pub fn scan_managed(site_root: &Path, output: &OutputConfig) -> io::Result<BTreeSet<PathBuf>> {
    let mut owned = BTreeSet::new();

    let home = output.home_path();
    if site_root.join(&home).is_file() {
        owned.insert(home);
    }

    let pages_rel = output.pages_path();
    let pages_dir = site_root.join(&pages_rel);
    if !pages_dir.is_dir() {
        return Ok(owned);
    }
    for entry in WalkDir::new(&pages_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            owned.insert(pages_rel.join(entry.file_name()));
        }
    }
    Ok(owned)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}
