//! Shared test utilities for the vsite test suite.
//!
//! Fixtures are built on the fly in a temp directory: every path passed to
//! [`fixture`] becomes a small placeholder file (scan only looks at names, so
//! the content never has to be a real video).
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = fixture(&["a.mp4", "sub/b.mkv"]);
//! let catalog = scan(tmp.path()).unwrap();
//! assert_eq!(video_names(&catalog), vec!["a", "b"]);
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

use crate::hierarchy::{DirectoryNode, Hierarchy};
use crate::scan::Catalog;
use crate::types::Video;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a file at `root/rel`, including parent directories.
pub fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, format!("fake video: {rel}")).unwrap();
}

/// Temp directory populated with one placeholder file per relative path.
pub fn fixture(paths: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for rel in paths {
        touch(tmp.path(), rel);
    }
    tmp
}

/// Every file under `root`, as `/`-joined relative paths.
pub fn file_set(root: &Path) -> BTreeSet<String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| crate::scan::relative_string(root, e.path()))
        .collect()
}

/// Build a video record the way the scanner would, without touching disk.
pub fn video(relative_path: &str) -> Video {
    let (directory, file_name) = match relative_path.rsplit_once('/') {
        Some((dir, file)) => (dir.to_string(), file.to_string()),
        None => (String::new(), relative_path.to_string()),
    };
    let (name, extension) = file_name
        .rsplit_once('.')
        .map(|(n, e)| (n.to_string(), e.to_lowercase()))
        .unwrap_or_else(|| (file_name.clone(), String::new()));
    Video {
        name,
        file_name,
        relative_path: relative_path.to_string(),
        extension,
        directory,
        player_page: crate::naming::player_page_name(relative_path),
    }
}

/// Catalog from relative paths, in the given (discovery) order.
pub fn catalog_of(paths: &[&str]) -> Catalog {
    Catalog::from_videos(paths.iter().map(|p| video(p)).collect())
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a video by display name. Panics if not found.
pub fn find_video<'a>(catalog: &'a Catalog, name: &str) -> &'a Video {
    catalog
        .videos()
        .iter()
        .find(|v| v.name == name)
        .unwrap_or_else(|| {
            let names = video_names(catalog);
            panic!("video '{name}' not found. Available: {names:?}")
        })
}

/// Find a directory node by relative path. Panics if not found.
pub fn find_dir<'a>(hierarchy: &'a Hierarchy, path: &str) -> &'a DirectoryNode {
    hierarchy.find(path).unwrap_or_else(|| {
        let paths: Vec<&str> = hierarchy.nodes().iter().map(|n| n.path.as_str()).collect();
        panic!("directory '{path}' not found. Available: {paths:?}")
    })
}

// =========================================================================
// Bulk extractors
// =========================================================================

/// Video display names in catalog (discovery) order.
pub fn video_names(catalog: &Catalog) -> Vec<&str> {
    catalog.videos().iter().map(|v| v.name.as_str()).collect()
}

/// Display names of a directory's videos, in listing order.
pub fn listed_videos<'a>(hierarchy: &Hierarchy, catalog: &'a Catalog, dir: &str) -> Vec<&'a str> {
    find_dir(hierarchy, dir)
        .videos
        .iter()
        .map(|&i| catalog.get(i).name.as_str())
        .collect()
}

/// Subdirectory names of a directory, in listing order.
pub fn listed_subdirs<'a>(hierarchy: &'a Hierarchy, dir: &str) -> Vec<&'a str> {
    hierarchy
        .subdirectories(find_dir(hierarchy, dir))
        .map(|entry| entry.name)
        .collect()
}
