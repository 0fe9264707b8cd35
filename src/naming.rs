//! Flat output filenames for listing and player pages.
//!
//! Every generated page lives directly in the scan root, so a nested source
//! path has to be folded into a single filename. The scheme is:
//!
//! - join the path segments with `_`
//! - strip the file extension (player pages only)
//! - keep ASCII letters, digits, `_` and `-`; turn spaces into `_`; drop
//!   everything else, including non-ASCII characters
//!
//! ```text
//! ""                      → index.html
//! "Travel/Japan 2019"     → Travel_Japan_2019_index.html
//! "clip.mp4"              → player_clip.html
//! "Travel/Tōkyō day.mkv"  → player_Travel_Tky_day.html
//! ```
//!
//! ## Collisions
//!
//! Dropping characters is lossy: `a:b` and `ab` flatten to the same name, as
//! do two directories whose names are entirely non-ASCII. Writing both would
//! silently overwrite one page with the other, so every generated name is
//! claimed through a [`NameRegistry`], which refuses a second claim from a
//! different source path.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Filename of the root listing page.
pub const ROOT_INDEX: &str = "index.html";

/// Filename of the shared stylesheet.
pub const STYLESHEET: &str = "style.css";

const LISTING_SUFFIX: &str = "_index.html";
const PLAYER_PREFIX: &str = "player_";

/// Filter a name down to the filesystem-safe alphabet.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' => Some(c),
            ' ' => Some('_'),
            _ => None,
        })
        .collect()
}

/// Flatten a `/`-joined relative path into a single name (no extension handling).
pub fn flatten(relative: &str) -> String {
    sanitize(&relative.replace('/', "_"))
}

/// Listing page filename for a directory. The root maps to `index.html`.
pub fn listing_page_name(dir: &str) -> String {
    if dir.is_empty() {
        ROOT_INDEX.to_string()
    } else {
        format!("{}{}", flatten(dir), LISTING_SUFFIX)
    }
}

/// Player page filename for a video's path relative to the root.
pub fn player_page_name(relative_path: &str) -> String {
    let (dir, file) = match relative_path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, relative_path),
    };
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());
    let joined = match dir {
        Some(dir) => format!("{dir}/{stem}"),
        None => stem,
    };
    format!("{}{}.html", PLAYER_PREFIX, flatten(&joined))
}

/// True for filenames this tool generates into the scan root.
pub fn is_generated_name(file_name: &str) -> bool {
    file_name == ROOT_INDEX
        || file_name == STYLESHEET
        || file_name.ends_with(LISTING_SUFFIX)
        || (file_name.starts_with(PLAYER_PREFIX) && file_name.ends_with(".html"))
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error(
    "output file {file_name} would be written for both {first:?} and {second:?}; rename one of them"
)]
pub struct NameCollision {
    pub file_name: String,
    pub first: String,
    pub second: String,
}

/// Tracks which source path owns each generated filename.
#[derive(Debug, Default)]
pub struct NameRegistry {
    owners: HashMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `file_name` for `source`. Claiming the same name twice for the
    /// same source is a no-op.
    pub fn claim(&mut self, file_name: &str, source: &str) -> Result<(), NameCollision> {
        match self.owners.get(file_name) {
            Some(owner) if owner != source => Err(NameCollision {
                file_name: file_name.to_string(),
                first: owner.clone(),
                second: source.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.owners
                    .insert(file_name.to_string(), source.to_string());
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.owners.len()
    }
}
