//! Shared types used across the scan, hierarchy, and generate stages.
//!
//! Relative paths are stored as `/`-joined strings regardless of platform so
//! that page names and links are stable across operating systems. The root
//! directory is always the empty string, never `.`.

/// Extensions (lowercase, no dot) that are picked up as videos.
pub const PLAYABLE_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "avi", "mov", "m4v", "ogv", "3gp"];

/// Extensions browsers cannot play natively. A file with one of these is
/// hidden behind its `.mp4` sibling when one exists, and is a conversion
/// candidate when it doesn't.
pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["mkv", "avi", "mov", "wmv", "flv"];

/// The browser-playable container conversions produce.
pub const NATIVE_EXTENSION: &str = "mp4";

/// One discovered video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    /// Filename without extension, used as the display name.
    pub name: String,
    /// Full filename including extension.
    pub file_name: String,
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    /// Lowercase extension without the leading dot.
    pub extension: String,
    /// Owning directory relative to the scan root (`""` for the root).
    pub directory: String,
    /// Flat player page filename, e.g. `player_sub_clip.html`.
    pub player_page: String,
}

pub fn is_playable(extension: &str) -> bool {
    PLAYABLE_EXTENSIONS.contains(&extension)
}

pub fn needs_conversion(extension: &str) -> bool {
    CONVERTIBLE_EXTENSIONS.contains(&extension)
}

/// MIME type for the `<source type=...>` attribute of a player page.
pub fn mime_type(extension: &str) -> &'static str {
    match extension {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "m4v" => "video/x-m4v",
        "ogv" => "video/ogg",
        "3gp" => "video/3gpp",
        _ => "application/octet-stream",
    }
}

/// Parent of a `/`-joined relative directory, or `None` for the root.
pub fn parent_dir(dir: &str) -> Option<&str> {
    if dir.is_empty() {
        return None;
    }
    Some(dir.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(""))
}

/// Last segment of a `/`-joined relative directory.
pub fn dir_name(dir: &str) -> &str {
    dir.rsplit('/').next().unwrap_or(dir)
}
