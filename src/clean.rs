//! Removal of generated pages and conversion artifacts.
//!
//! Three modes, one per invocation:
//!
//! - **Generated** (`--clean`): every file directly in the scan root whose
//!   name matches a generated pattern (`index.html`, `style.css`,
//!   `*_index.html`, `player_*.html`). Subdirectories are not touched.
//! - **Converted** (`--clean-converted`): every `.mp4` that has a
//!   convertible sibling with the same stem. The original is kept.
//! - **Originals** (`--clean-originals`): the opposite, every convertible
//!   file that has a `.mp4` sibling. The converted copy is kept.
//!
//! Pairs are found with the scanner's walk and sibling test, so what gets
//! removed always matches what generation would have deduplicated.

use crate::naming;
use crate::scan::{self, ScanError};
use crate::types;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("error removing {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Which side of an original/converted pair to delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSide {
    /// Delete the `.mp4`, keep the original.
    Converted,
    /// Delete the original, keep the `.mp4`.
    Originals,
}

/// One deleted file, relative to the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub removed: String,
    /// The file of the pair that was kept (pair modes only).
    pub kept: Option<String>,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removals: Vec<Removal>,
}

impl CleanReport {
    pub fn count(&self) -> usize {
        self.removals.len()
    }
}

/// Remove generated pages and the stylesheet from `root` (non-recursive).
pub fn clean_generated(root: &Path) -> Result<CleanReport, CleanError> {
    scan::validate_root(root)?;

    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if naming::is_generated_name(&name) {
            names.push(name);
        }
    }
    names.sort();

    let mut report = CleanReport::default();
    for name in names {
        remove(&root.join(&name))?;
        report.removals.push(Removal {
            removed: name,
            kept: None,
        });
    }
    Ok(report)
}

/// Remove one side of every original/converted pair under `root`.
pub fn clean_pairs(root: &Path, side: PairSide) -> Result<CleanReport, CleanError> {
    scan::validate_root(root)?;

    // keyed by the file to delete; several originals can share one .mp4
    let mut targets: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    for path in scan::visible_files(root)? {
        let Some(ext) = scan::extension_of(&path) else {
            continue;
        };
        if !types::needs_conversion(&ext) || !scan::has_native_sibling(&path)? {
            continue;
        }
        let native = scan::native_sibling(&path);
        match side {
            PairSide::Converted => targets.entry(native).or_insert(path),
            PairSide::Originals => targets.entry(path).or_insert(native),
        };
    }

    let mut report = CleanReport::default();
    for (target, kept) in targets {
        remove(&target)?;
        report.removals.push(Removal {
            removed: scan::relative_string(root, &target),
            kept: Some(scan::relative_string(root, &kept)),
        });
    }
    Ok(report)
}

fn remove(path: &Path) -> Result<(), CleanError> {
    fs::remove_file(path).map_err(|source| CleanError::Remove {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "removed");
    Ok(())
}
