//! Sync orchestration: fetch → plan → apply.
//!
//! A run has two phases with a hard line between them:
//!
//! 1. **Plan** (no side effects): every page is classified and serialized,
//!    the managed locations are scanned, and the diff is computed. Per-page
//!    problems are recorded as warnings and the page is skipped.
//! 2. **Apply**: every file is written, then every orphan is deleted. The
//!    first I/O failure stops the run and reports what was not applied.
//!
//! A fetch or scan failure ends the run inside phase 1, so the site is left
//! exactly as it was. Deletions always come after all writes, so a failed
//! write never leaves a page deleted without its replacement.
//!
//! ## Collisions
//!
//! Pages are processed in remote order. When two pages map to the same path
//! (two `Home` pages, or two titles with the same slug) the later page wins
//! and a [`SyncWarning::PathCollision`] is recorded.

use crate::config::SyncConfig;
use crate::manifest::{self, ManifestDiff};
use crate::remote::{PageSource, RemoteError};
use crate::serialize::{PageError, serialize_page};
use crate::types::{OutputFile, RemotePage};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote fetch failed: {0}")]
    Remote(#[from] RemoteError),
    #[error("Could not list managed files: {0}")]
    Scan(#[source] io::Error),
    #[error("Could not {op}: {source} ({} operations not applied)", .pending.len())]
    Apply {
        op: FileOp,
        #[source]
        source: io::Error,
        pending: Vec<FileOp>,
    },
}

/// A single filesystem mutation, path relative to the site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOp {
    Write(PathBuf),
    Delete(PathBuf),
}

impl fmt::Display for FileOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOp::Write(p) => write!(f, "write {}", p.display()),
            FileOp::Delete(p) => write!(f, "delete {}", p.display()),
        }
    }
}

/// Recovered problems. None of these stop a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// The page could not be serialized and was left out.
    Skipped(PageError),
    /// Two pages mapped to the same path; the later one was kept.
    PathCollision {
        path: PathBuf,
        replaced_page_id: String,
        replaced_title: String,
        page_id: String,
        title: String,
    },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::Skipped(e) => write!(f, "skipped: {e}"),
            SyncWarning::PathCollision {
                path,
                replaced_title,
                title,
                ..
            } => write!(
                f,
                "{} claimed by both \"{replaced_title}\" and \"{title}\"; keeping \"{title}\"",
                path.display()
            ),
        }
    }
}

/// Everything a run intends to do, computed before touching the filesystem.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    /// Number of pages received from the source.
    pub page_count: usize,
    /// Files to write, keyed by relative path.
    pub files: BTreeMap<PathBuf, OutputFile>,
    pub diff: ManifestDiff,
    pub skipped: usize,
    pub warnings: Vec<SyncWarning>,
}

impl SyncPlan {
    /// No pages came back, yet the plan would delete files.
    ///
    /// Usually an auth or sharing problem on the remote side rather than a
    /// deliberately emptied database. The CLI refuses such plans unless told
    /// otherwise.
    pub fn is_suspiciously_empty(&self) -> bool {
        self.page_count == 0 && !self.diff.to_delete.is_empty()
    }

    /// Writes first, then deletes: the order `apply` executes them in.
    pub fn operations(&self) -> Vec<FileOp> {
        self.diff
            .to_write
            .iter()
            .cloned()
            .map(FileOp::Write)
            .chain(self.diff.to_delete.iter().cloned().map(FileOp::Delete))
            .collect()
    }
}

/// Outcome of an applied run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub written: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub warnings: Vec<SyncWarning>,
}

/// Serialized pages of one run, before comparing with disk.
#[derive(Debug, Clone, Default)]
pub struct Outputs {
    pub files: BTreeMap<PathBuf, OutputFile>,
    pub skipped: usize,
    pub warnings: Vec<SyncWarning>,
}

impl Outputs {
    pub fn paths(&self) -> BTreeSet<PathBuf> {
        self.files.keys().cloned().collect()
    }
}

/// Serialize every page in order. Pure: no I/O.
pub fn build_outputs(pages: &[RemotePage], config: &SyncConfig) -> Outputs {
    let mut outputs = Outputs::default();
    for page in pages {
        let file = match serialize_page(page, config) {
            Ok(file) => file,
            Err(e) => {
                warn!(page_id = %page.id, error = %e, "skipping page");
                outputs.skipped += 1;
                outputs.warnings.push(SyncWarning::Skipped(e));
                continue;
            }
        };
        if let Some(previous) = outputs.files.get(&file.path) {
            let warning = SyncWarning::PathCollision {
                path: file.path.clone(),
                replaced_page_id: previous.page_id.clone(),
                replaced_title: previous.title.clone(),
                page_id: file.page_id.clone(),
                title: file.title.clone(),
            };
            warn!("{warning}");
            outputs.warnings.push(warning);
        }
        outputs.files.insert(file.path.clone(), file);
    }
    outputs
}

/// Compute the full plan for `pages` against the current state of `site_root`.
pub fn plan(
    pages: &[RemotePage],
    site_root: &Path,
    config: &SyncConfig,
) -> Result<SyncPlan, SyncError> {
    let outputs = build_outputs(pages, config);
    let existing = manifest::scan_managed(site_root, &config.output).map_err(SyncError::Scan)?;
    let diff = manifest::diff(&outputs.paths(), &existing);
    Ok(SyncPlan {
        page_count: pages.len(),
        files: outputs.files,
        diff,
        skipped: outputs.skipped,
        warnings: outputs.warnings,
    })
}

/// Execute a plan: all writes, then all deletes.
pub fn apply(plan: &SyncPlan, site_root: &Path) -> Result<SyncSummary, SyncError> {
    let ops = plan.operations();
    for (i, op) in ops.iter().enumerate() {
        let result = match op {
            FileOp::Write(rel) => match plan.files.get(rel) {
                Some(file) => write_atomic(&site_root.join(rel), &file.content),
                None => Err(io::Error::other("no content staged for path")),
            },
            FileOp::Delete(rel) => remove_if_present(&site_root.join(rel)),
        };
        if let Err(source) = result {
            return Err(SyncError::Apply {
                op: op.clone(),
                source,
                pending: ops[i + 1..].to_vec(),
            });
        }
        info!("{op}");
    }

    Ok(SyncSummary {
        written: plan.diff.to_write.len(),
        created: plan.diff.to_create.len(),
        updated: plan.diff.to_update.len(),
        deleted: plan.diff.to_delete.len(),
        skipped: plan.skipped,
        warnings: plan.warnings.clone(),
    })
}

/// Fetch from `source`, plan, and apply.
pub fn run(
    source: &dyn PageSource,
    site_root: &Path,
    config: &SyncConfig,
) -> Result<SyncSummary, SyncError> {
    let pages = source.fetch_pages()?;
    let plan = plan(&pages, site_root, config)?;
    apply(&plan, site_root)
}

/// Write through a temp file in the target directory, then rename, so a
/// reader never sees a half-written page.
fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other("output path has no parent directory"))?;
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    // Temp files are created owner-only; the site must stay readable by
    // whatever builds or serves it.
    if let Some(permissions) = output_permissions(path) {
        tmp.as_file().set_permissions(permissions)?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Keep the mode of a file being replaced; new files get `0o644` on Unix.
fn output_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => new_file_permissions(),
    }
}

#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
