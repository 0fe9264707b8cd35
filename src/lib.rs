//! # vsite
//!
//! A static video gallery generator. Point it at a directory of videos and it
//! writes a browsable set of HTML pages next to them: one listing page per
//! directory and one player page per video.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Scan       videos/  →  Catalog     (filesystem → video records)
//! 2. Hierarchy  Catalog  →  Hierarchy   (directory closure, links, prev/next)
//! 3. Generate   both     →  *.html      (flat pages in the scan root)
//! ```
//!
//! Optional steps wrap the pipeline: [`convert`] runs before it to produce
//! browser-playable `.mp4` siblings, and [`clean`] reverses generation or
//! conversion instead of running it.
//!
//! Nothing is cached between runs. Every invocation rebuilds the whole state
//! from the filesystem, so the output always reflects the directory as it is.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the root, filters playable files, drops originals that have a `.mp4` |
//! | [`hierarchy`] | Stage 2: directory closure, parent/child links, sorted listings, navigation |
//! | [`generate`] | Stage 3: renders listing and player pages with Maud, writes `style.css` |
//! | [`naming`] | Flat output filenames and the collision registry |
//! | [`types`] | The `Video` record, extension sets, MIME types |
//! | [`convert`] | ffmpeg preflight and the conversion loop (CPU or GPU profile) |
//! | [`clean`] | Removal of generated pages, converted copies, or converted originals |
//! | [`config`] | Optional `vsite.toml`: title, colours, encoder profiles |
//! | [`output`] | CLI output formatting for every stage |
//!
//! # Design Decisions
//!
//! ## Flat Output
//!
//! All pages live in the scan root, beside the videos, so the directory can be
//! served as-is or opened from disk. Nested paths are folded into filenames
//! (`Travel/Japan` → `Travel_Japan_index.html`). Folding drops characters, so
//! two sources can land on one name; [`naming::NameRegistry`] turns that into
//! an error instead of a silent overwrite.
//!
//! ## The `.mp4` Sibling Is Authoritative
//!
//! A file that browsers cannot play (`clip.mkv`) and its converted copy
//! (`clip.mp4`) are one video. Scan lists only the copy, conversion skips
//! files that already have one, and cleaning removes one side of the pair.
//! All three use the same sibling test in [`scan`].
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/), a compile-time HTML
//! macro system. Every name in the output comes from the filesystem, and Maud
//! escapes all interpolation by default.

pub mod clean;
pub mod config;
pub mod convert;
pub mod generate;
pub mod hierarchy;
pub mod naming;
pub mod output;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
