//! Filesystem scanning and video discovery.
//!
//! Stage 1 of the vsite pipeline. Walks the scan root and builds a
//! [`Catalog`]: every playable video in discovery order, plus a grouping by
//! owning directory that the [`hierarchy`](crate::hierarchy) stage consumes.
//!
//! ## Rules
//!
//! - Directories whose name starts with `.` are skipped together with their
//!   whole subtree. The root itself is never skipped, so `vsite .` works.
//! - A file is a candidate when its lowercase extension is in
//!   [`PLAYABLE_EXTENSIONS`](crate::types::PLAYABLE_EXTENSIONS).
//! - A candidate that needs conversion (`.mkv`, `.avi`, ...) is dropped when a
//!   sibling with the same stem and a `.mp4` extension exists. The `.mp4` is
//!   found separately by the same walk and becomes the catalog entry.
//!
//! ```text
//! videos/
//! ├── a.mp4                 → listed
//! ├── .thumbs/x.mp4         → skipped (hidden directory)
//! └── sub/
//!     ├── b.mkv             → dropped, b.mp4 exists
//!     ├── b.mp4             → listed
//!     └── c.avi             → listed (not converted yet)
//! ```
//!
//! ## Errors
//!
//! The walk is all-or-nothing. Any entry that cannot be read aborts the scan,
//! since a partial catalog would produce listing pages with missing links.
//!
//! The same walk and sibling predicates back the conversion task finder and
//! the cleaner, so all three agree on which file of a pair is authoritative.

use crate::naming;
use crate::types::{self, Video};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("directory '{0}' does not exist")]
    NotFound(PathBuf),
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result of a scan: the videos in discovery order and their directory grouping.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Default)]
pub struct Catalog {
    videos: Vec<Video>,
    by_directory: BTreeMap<String, Vec<usize>>,
}

impl Catalog {
    /// Group an already-ordered list of videos by owning directory.
    pub fn from_videos(videos: Vec<Video>) -> Self {
        let mut by_directory: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, video) in videos.iter().enumerate() {
            by_directory
                .entry(video.directory.clone())
                .or_default()
                .push(idx);
        }
        Self {
            videos,
            by_directory,
        }
    }

    /// All videos, in discovery order.
    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn get(&self, idx: usize) -> &Video {
        &self.videos[idx]
    }

    /// Directories that directly contain at least one video, with catalog
    /// indices in discovery order.
    pub fn directories(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.by_directory
            .iter()
            .map(|(dir, idxs)| (dir.as_str(), idxs.as_slice()))
    }

    /// Catalog indices of the videos directly inside `dir`.
    pub fn videos_in(&self, dir: &str) -> &[usize] {
        self.by_directory
            .get(dir)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// Scan `root` for videos.
pub fn scan(root: &Path) -> Result<Catalog, ScanError> {
    validate_root(root)?;

    let mut videos = Vec::new();
    for path in visible_files(root)? {
        let Some(ext) = extension_of(&path) else {
            continue;
        };
        if !types::is_playable(&ext) {
            continue;
        }
        if types::needs_conversion(&ext) && has_native_sibling(&path)? {
            debug!(path = %path.display(), "converted copy exists, skipping original");
            continue;
        }
        videos.push(build_video(root, &path, ext));
    }

    Ok(Catalog::from_videos(videos))
}

/// Check that `root` exists and is a directory.
pub fn validate_root(root: &Path) -> Result<(), ScanError> {
    if !root.try_exists()? {
        return Err(ScanError::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Every non-directory entry under `root`, skipping hidden directories.
///
/// Entries are visited depth-first with siblings sorted by filename, so the
/// order is stable across runs and platforms.
pub fn visible_files(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    collect_visible(WalkDir::new(root))
}

/// Any walk error aborts: a partial file list would leave listings with
/// missing links.
fn collect_visible(walker: WalkDir) -> Result<Vec<PathBuf>, ScanError> {
    let walker = walker
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden_dir(e));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        files.push(entry.into_path());
    }
    Ok(files)
}

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir() && entry.file_name().to_string_lossy().starts_with('.')
}

/// Lowercase extension without the dot.
///
/// A dotfile such as `.mp4` has no extension and is never a video.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Where the converted copy of `path` lives (same stem, `.mp4`).
pub fn native_sibling(path: &Path) -> PathBuf {
    path.with_extension(types::NATIVE_EXTENSION)
}

pub fn has_native_sibling(path: &Path) -> Result<bool, ScanError> {
    Ok(native_sibling(path).try_exists()?)
}

/// `/`-joined form of `path` relative to `root`.
pub fn relative_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_video(root: &Path, path: &Path, extension: String) -> Video {
    let relative_path = relative_string(root, path);
    let directory = relative_path
        .rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let player_page = naming::player_page_name(&relative_path);

    Video {
        name,
        file_name,
        relative_path,
        extension,
        directory,
        player_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_concrete_scenario() {
        let tmp = fixture(&["a.mp4", "sub/b.mkv"]);
        let catalog = scan(tmp.path()).unwrap();

        assert_eq!(video_names(&catalog), vec!["a", "b"]);

        let a = find_video(&catalog, "a");
        assert_eq!(a.directory, "");
        assert_eq!(a.player_page, "player_a.html");

        let b = find_video(&catalog, "b");
        assert_eq!(b.directory, "sub");
        assert_eq!(b.relative_path, "sub/b.mkv");
        assert_eq!(b.extension, "mkv");
        assert_eq!(b.player_page, "player_sub_b.html");
    }

    #[test]
    fn converted_copy_replaces_original() {
        let tmp = fixture(&["name.avi", "name.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.videos()[0].name, "name");
        assert_eq!(catalog.videos()[0].extension, "mp4");
    }

    #[test]
    fn dedup_applies_per_directory() {
        let tmp = fixture(&["x/clip.mkv", "y/clip.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        let exts: Vec<&str> = catalog
            .videos()
            .iter()
            .map(|v| v.extension.as_str())
            .collect();
        assert_eq!(exts, vec!["mkv", "mp4"]);
    }

    #[test]
    fn uppercase_original_is_deduplicated() {
        let tmp = fixture(&["Movie.MKV", "Movie.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.videos()[0].file_name, "Movie.mp4");
    }

    #[test]
    fn extension_is_lowercased() {
        let tmp = fixture(&["Holiday.WEBM"]);
        let catalog = scan(tmp.path()).unwrap();

        let v = &catalog.videos()[0];
        assert_eq!(v.extension, "webm");
        assert_eq!(v.file_name, "Holiday.WEBM");
        assert_eq!(v.name, "Holiday");
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let tmp = fixture(&["visible.mp4", ".cache/hidden.mp4", ".cache/deep/x.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        assert_eq!(video_names(&catalog), vec!["visible"]);
    }

    #[test]
    fn hidden_root_is_still_scanned() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(".videos");
        touch(&root, "a.mp4");

        let catalog = scan(&root).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn non_video_files_are_ignored() {
        let tmp = fixture(&["notes.txt", "poster.jpg", "clip.mp4", "legacy.wmv"]);
        let catalog = scan(tmp.path()).unwrap();

        assert_eq!(video_names(&catalog), vec!["clip"]);
    }

    #[test]
    fn grouping_by_directory() {
        let tmp = fixture(&["a.mp4", "sub/b.mp4", "sub/c.mp4", "sub/deep/d.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        let dirs: Vec<&str> = catalog.directories().map(|(d, _)| d).collect();
        assert_eq!(dirs, vec!["", "sub", "sub/deep"]);
        assert_eq!(catalog.videos_in("sub").len(), 2);
        assert!(catalog.videos_in("nowhere").is_empty());
    }

    #[test]
    fn root_is_empty_string_not_dot() {
        let tmp = fixture(&["a.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        assert_eq!(catalog.videos()[0].directory, "");
        assert_eq!(catalog.videos()[0].relative_path, "a.mp4");
    }

    #[test]
    fn empty_directory_gives_empty_catalog() {
        let tmp = TempDir::new().unwrap();
        let catalog = scan(tmp.path()).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan(&tmp.path().join("nope"));
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn file_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.mp4");
        fs::write(&file, "x").unwrap();
        assert!(matches!(scan(&file), Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn unicode_and_spaces_in_names() {
        let tmp = fixture(&["Tōkyō trip/day one.mp4"]);
        let catalog = scan(tmp.path()).unwrap();

        let v = &catalog.videos()[0];
        assert_eq!(v.directory, "Tōkyō trip");
        assert_eq!(v.name, "day one");
        assert_eq!(v.player_page, "player_Tky_trip_day_one.html");
    }

    #[test]
    fn native_sibling_keeps_stem() {
        assert_eq!(
            native_sibling(Path::new("dir/show.s01.mkv")),
            PathBuf::from("dir/show.s01.mp4")
        );
    }

    #[test]
    fn visible_files_lists_all_non_hidden_files() {
        let tmp = fixture(&["a.mp4", "notes.txt", ".git/config", "sub/b.mkv"]);
        let files = visible_files(tmp.path()).unwrap();
        let rels: Vec<String> = files
            .iter()
            .map(|p| relative_string(tmp.path(), p))
            .collect();
        assert_eq!(rels, vec!["a.mp4", "notes.txt", "sub/b.mkv"]);
    }

    #[test]
    fn dotfile_named_like_a_video_is_skipped() {
        let tmp = fixture(&[".mp4", "a.mp4"]);
        let catalog = scan(tmp.path()).unwrap();
        assert_eq!(video_names(&catalog), vec!["a"]);
        assert_eq!(extension_of(Path::new(".mp4")), None);
    }

    // =========================================================================
    // Walk errors
    // =========================================================================

    #[cfg(unix)]
    #[test]
    fn walk_error_aborts_instead_of_partial_list() {
        let tmp = fixture(&["a.mp4", "sub/b.mp4"]);
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("sub/loop")).unwrap();

        let result = collect_visible(WalkDir::new(tmp.path()).follow_links(true));
        match result {
            Err(ScanError::Walk(e)) => assert!(e.loop_ancestor().is_some()),
            other => panic!("expected walk error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_fails_every_walk() {
        use crate::clean::{self, CleanError, PairSide};
        use crate::convert::{self, ConvertError};
        use std::os::unix::fs::PermissionsExt;

        let tmp = fixture(&["a.mp4", "locked/b.mkv"]);
        let locked = tmp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // running with privileges that ignore permission bits
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scanned = scan(tmp.path());
        let pending = convert::find_pending(tmp.path());
        let cleaned = clean::clean_pairs(tmp.path(), PairSide::Converted);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(scanned, Err(ScanError::Walk(_))));
        assert!(matches!(pending, Err(ConvertError::Scan(ScanError::Walk(_)))));
        assert!(matches!(cleaned, Err(CleanError::Scan(ScanError::Walk(_)))));
    }
}
