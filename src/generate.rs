//! HTML site generation.
//!
//! Stage 3 of the vsite pipeline. Takes the catalog and hierarchy and writes
//! the static pages flat into the scan root, next to the videos.
//!
//! ## Generated Files
//!
//! - **Stylesheet** (`style.css`): colour variables from `[colors]` followed by
//!   the embedded base styles
//! - **Listing pages** (`index.html`, `<flat-path>_index.html`): subdirectory
//!   cards, then video cards, with a back link to the parent listing
//! - **Player pages** (`player_<flat-path>.html`): `<video>` element with
//!   previous/next/back links
//!
//! ```text
//! videos/
//! ├── index.html             # root listing
//! ├── style.css
//! ├── sub_index.html         # listing for sub/
//! ├── player_a.html          # player for a.mp4
//! ├── player_sub_b.html      # player for sub/b.mkv
//! ├── a.mp4
//! └── sub/
//!     └── b.mkv
//! ```
//!
//! All links are relative filenames, so the site works from `file://` as
//! well as from any HTTP server rooted anywhere.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Names and titles come straight from the filesystem; maud escapes them.

use crate::config::{self, SiteConfig};
use crate::hierarchy::{Hierarchy, ListingPage, PlayerPage};
use crate::naming::{self, NameCollision};
use crate::scan::{self, Catalog, ScanError};
use crate::types::{self, Video};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Collision(#[from] NameCollision),
    #[error("no videos found in directory '{}'", .0.display())]
    NoVideos(PathBuf),
}

/// Scanned and linked site, ready to render.
#[derive(Debug)]
pub struct Site {
    pub catalog: Catalog,
    pub hierarchy: Hierarchy,
}

/// What a generation run wrote.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub videos: usize,
    /// Listing filenames, root first.
    pub listing_pages: Vec<String>,
    pub player_pages: usize,
}

const CSS_STATIC: &str = include_str!("../static/style.css");
const JS: &str = include_str!("../static/player.js");

/// Scan `root` and link the result.
///
/// Fails when the root holds no videos or when two sources would share a
/// generated filename. Nothing is written.
pub fn prepare(root: &Path, root_title: &str) -> Result<Site, GenerateError> {
    let catalog = scan::scan(root)?;
    if catalog.is_empty() {
        return Err(GenerateError::NoVideos(root.to_path_buf()));
    }
    let hierarchy = Hierarchy::build(&catalog, root_title)?;
    Ok(Site { catalog, hierarchy })
}

/// Write the stylesheet, every listing page, and every player page into `root`.
pub fn generate(
    root: &Path,
    site: &Site,
    config: &SiteConfig,
) -> Result<GenerateReport, GenerateError> {
    let mut report = GenerateReport {
        videos: site.catalog.len(),
        ..Default::default()
    };

    fs::write(root.join(naming::STYLESHEET), stylesheet(config))?;

    for page in site.hierarchy.listing_pages(&site.catalog) {
        let markup = render_listing(&page);
        fs::write(root.join(page.file_name), markup.into_string())?;
        debug!(page = page.file_name, "wrote listing page");
        report.listing_pages.push(page.file_name.to_string());
    }

    for page in site.hierarchy.player_pages(&site.catalog) {
        let markup = render_player(&page);
        fs::write(root.join(&page.video.player_page), markup.into_string())?;
        report.player_pages += 1;
    }

    Ok(report)
}

/// Colour variables followed by the base styles.
pub fn stylesheet(config: &SiteConfig) -> String {
    let color_css = config::generate_color_css(&config.colors);
    format!("{}\n\n{}", color_css, CSS_STATIC)
}

/// Relative URL of a video: each path segment percent-encoded, joined by `/`.
pub fn video_src(relative_path: &str) -> String {
    relative_path
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href=(naming::STYLESHEET);
            }
            body class=(body_class) {
                div.page {
                    (content)
                }
            }
        }
    }
}

/// Page header with an optional back button
fn site_header(title: &str, back: Option<&str>) -> Markup {
    html! {
        header.site-header {
            @if let Some(href) = back {
                a.button.back href=(href) { "← Back" }
            }
            h1 { (title) }
        }
    }
}

fn video_card(video: &Video) -> Markup {
    html! {
        a.video-card href=(video.player_page) {
            div.video-thumb { "▶" }
            div.video-info {
                div.video-title { (video.name) }
                div.video-meta { (video.extension) }
            }
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders a directory listing: subdirectories first, then videos
pub fn render_listing(page: &ListingPage) -> Markup {
    let content = html! {
        (site_header(page.title, page.parent_link))
        main.listing {
            @if !page.subdirectories.is_empty() {
                h2.section-title { "Folders" }
                div.dir-grid {
                    @for dir in &page.subdirectories {
                        a.dir-card href=(dir.link) {
                            span.dir-icon { "📁" }
                            span.dir-name { (dir.name) }
                        }
                    }
                }
            }
            @if !page.videos.is_empty() {
                h2.section-title { "Videos" }
                div.video-grid {
                    @for video in &page.videos {
                        (video_card(video))
                    }
                }
            }
            @if page.subdirectories.is_empty() && page.videos.is_empty() {
                p.empty { "Nothing here." }
            }
        }
    };

    base_document(page.title, "listing-view", content)
}

/// Renders a player page with previous/next/back navigation
pub fn render_player(page: &PlayerPage) -> Markup {
    let video = page.video;
    let prev = page.prev.map(|v| v.player_page.as_str());
    let next = page.next.map(|v| v.player_page.as_str());

    let content = html! {
        (site_header(&video.name, Some(page.back_link)))
        main.player {
            video controls autoplay preload="metadata" {
                source src=(video_src(&video.relative_path)) type=(types::mime_type(&video.extension));
                "Your browser does not support the video tag."
            }
            div.player-controls data-back=(page.back_link) data-prev=[prev] data-next=[next] {
                nav {
                    (nav_button(prev, "← Previous"))
                    (nav_button(next, "Next →"))
                }
                span.file-name { (video.file_name) }
            }
        }
        script { (PreEscaped(JS)) }
    };

    base_document(&video.name, "player-view", content)
}

fn nav_button(target: Option<&str>, label: &str) -> Markup {
    html! {
        @match target {
            Some(href) => {
                a.button href=(href) { (label) }
            }
            None => {
                span.button.disabled { (label) }
            }
        }
    }
}
