//! CLI output formatting for all pipeline stages.
//!
//! Output leads with what a user browses: directory titles and video names,
//! with the generated page each one maps to after an arrow. Filesystem paths
//! appear only where the user has to act on them (conversion and removal).
//!
//! # Output Format
//!
//! ## Scan / check
//!
//! ```text
//! Found 3 videos
//! Videos → index.html
//!     001 a → player_a.html
//!     sub → sub_index.html
//!         001 b → player_sub_b.html
//!         002 c → player_sub_c.html
//! ```
//!
//! ## Convert
//!
//! ```text
//! Found 2 videos to convert (CPU)
//! [1/2] Converting: sub/b.mkv
//!     Done: b.mp4
//! [2/2] Converting: c.avi
//!     Failed: encoder exited with exit status: 1 (c.avi)
//! Conversion finished: 1 converted, 1 failed
//! ```
//!
//! ## Generate
//!
//! ```text
//! Generated 2 listing pages, 3 player pages and style.css
//! Files generated in: /videos
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::clean::CleanReport;
use crate::convert::{ConvertEvent, ConvertSummary, Pending, Profile};
use crate::generate::{GenerateReport, Site};
use crate::naming;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the discovered tree: every listing page, each followed by its
/// videos in listing order, then its subdirectories.
pub fn format_scan_output(site: &Site) -> Vec<String> {
    let mut lines = vec![format!(
        "Found {}",
        plural(site.catalog.len(), "video", "videos")
    )];

    for (depth, node) in site.hierarchy.walk() {
        lines.push(format!(
            "{}{} \u{2192} {}",
            indent(depth),
            node.title,
            node.listing_page
        ));
        for (i, &idx) in node.videos.iter().enumerate() {
            let video = site.catalog.get(idx);
            lines.push(format!(
                "{}{} {} \u{2192} {}",
                indent(depth + 1),
                format_index(i + 1),
                video.name,
                video.player_page
            ));
        }
    }
    lines
}

pub fn print_scan_output(site: &Site) {
    for line in format_scan_output(site) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert output
// ============================================================================

/// Format the conversion plan shown before any task starts.
pub fn format_convert_plan(pending: &Pending, profile: Profile, gpus: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = gpus.iter().map(|g| format!("GPU detected: {g}")).collect();
    if pending.tasks.is_empty() {
        lines.push("No videos need conversion.".to_string());
    } else {
        lines.push(format!(
            "Found {} to convert ({})",
            plural(pending.tasks.len(), "video", "videos"),
            profile.label()
        ));
    }
    lines
}

pub fn print_convert_plan(pending: &Pending, profile: Profile, gpus: &[String]) {
    for line in format_convert_plan(pending, profile, gpus) {
        println!("{}", line);
    }
}

/// Format a single conversion progress event as display lines.
pub fn format_convert_event(event: &ConvertEvent) -> Vec<String> {
    match event {
        ConvertEvent::Started {
            index,
            total,
            relative,
        } => vec![format!("[{}/{}] Converting: {}", index + 1, total, relative)],
        ConvertEvent::Finished { target, .. } => vec![format!("    Done: {}", target)],
        ConvertEvent::Failed {
            relative, error, ..
        } => vec![format!("    Failed: {} ({})", error, relative)],
    }
}

/// Format the end-of-run conversion summary.
pub fn format_convert_summary(summary: &ConvertSummary) -> Vec<String> {
    if summary.total() == 0 {
        return Vec::new();
    }
    let mut lines = vec![format!(
        "Conversion finished: {} converted, {} failed",
        summary.converted.len(),
        summary.failed.len()
    )];
    for (relative, error) in &summary.failed {
        lines.push(format!("    {}: {}", relative, error));
    }
    lines
}

pub fn print_convert_summary(summary: &ConvertSummary) {
    for line in format_convert_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Generate output
// ============================================================================

/// Format generate stage output.
pub fn format_generate_output(report: &GenerateReport, root: &Path) -> Vec<String> {
    vec![
        format!(
            "Generated {}, {} and {}",
            plural(report.listing_pages.len(), "listing page", "listing pages"),
            plural(report.player_pages, "player page", "player pages"),
            naming::STYLESHEET
        ),
        format!("Files generated in: {}", root.display()),
    ]
}

pub fn print_generate_output(report: &GenerateReport, root: &Path) {
    for line in format_generate_output(report, root) {
        println!("{}", line);
    }
}

// ============================================================================
// Clean output
// ============================================================================

/// Format removals, one line per file, then a count.
pub fn format_clean_output(report: &CleanReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .removals
        .iter()
        .map(|r| match &r.kept {
            Some(kept) => format!("Removed: {} (kept {})", r.removed, kept),
            None => format!("Removed: {}", r.removed),
        })
        .collect();
    if report.count() == 0 {
        lines.push("Nothing to remove".to_string());
    } else {
        lines.push(format!("Removed {}", plural(report.count(), "file", "files")));
    }
    lines
}

pub fn print_clean_output(report: &CleanReport) {
    for line in format_clean_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::Removal;
    use crate::convert::ConversionTask;
    use crate::hierarchy::Hierarchy;
    use crate::test_helpers::*;
    use std::path::PathBuf;

    fn site_of(paths: &[&str]) -> Site {
        let catalog = catalog_of(paths);
        let hierarchy = Hierarchy::build(&catalog, "Videos").unwrap();
        Site { catalog, hierarchy }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "video", "videos"), "1 video");
        assert_eq!(plural(0, "video", "videos"), "0 videos");
    }

    // =========================================================================
    // Scan
    // =========================================================================

    #[test]
    fn scan_output_tree() {
        let site = site_of(&["sub/c.mp4", "a.mp4", "sub/b.mkv"]);
        assert_eq!(
            format_scan_output(&site),
            vec![
                "Found 3 videos",
                "Videos → index.html",
                "    001 a → player_a.html",
                "    sub → sub_index.html",
                "        001 b → player_sub_b.html",
                "        002 c → player_sub_c.html",
            ]
        );
    }

    #[test]
    fn scan_output_shows_empty_intermediate_directories() {
        let site = site_of(&["a/b/clip.mp4"]);
        let lines = format_scan_output(&site);
        assert_eq!(lines[0], "Found 1 video");
        assert_eq!(lines[2], "    a → a_index.html");
        assert_eq!(lines[3], "        b → a_b_index.html");
        assert_eq!(lines[4], "            001 clip → player_a_b_clip.html");
    }

    // =========================================================================
    // Convert
    // =========================================================================

    #[test]
    fn convert_plan_nothing_to_do() {
        let lines = format_convert_plan(&Pending::default(), Profile::Cpu, &[]);
        assert_eq!(lines, vec!["No videos need conversion."]);
    }

    #[test]
    fn convert_plan_lists_gpus() {
        let pending = Pending {
            tasks: vec![ConversionTask {
                source: PathBuf::from("/v/a.mkv"),
                target: PathBuf::from("/v/a.mp4"),
                relative: "a.mkv".to_string(),
            }],
            already_converted: 0,
            shared_target: 0,
        };
        let lines = format_convert_plan(&pending, Profile::Gpu, &["Tesla T4".to_string()]);
        assert_eq!(
            lines,
            vec!["GPU detected: Tesla T4", "Found 1 video to convert (GPU)"]
        );
    }

    #[test]
    fn convert_events() {
        let started = ConvertEvent::Started {
            index: 0,
            total: 2,
            relative: "sub/b.mkv".to_string(),
        };
        assert_eq!(format_convert_event(&started), vec!["[1/2] Converting: sub/b.mkv"]);

        let done = ConvertEvent::Finished {
            index: 0,
            total: 2,
            target: "b.mp4".to_string(),
        };
        assert_eq!(format_convert_event(&done), vec!["    Done: b.mp4"]);

        let failed = ConvertEvent::Failed {
            index: 1,
            total: 2,
            relative: "c.avi".to_string(),
            error: "encoder exited with exit status: 1".to_string(),
        };
        assert_eq!(
            format_convert_event(&failed),
            vec!["    Failed: encoder exited with exit status: 1 (c.avi)"]
        );
    }

    #[test]
    fn convert_summary_lists_failures() {
        let summary = ConvertSummary {
            converted: vec!["a.mkv".to_string()],
            failed: vec![("c.avi".to_string(), "boom".to_string())],
            already_converted: 3,
        };
        assert_eq!(
            format_convert_summary(&summary),
            vec!["Conversion finished: 1 converted, 1 failed", "    c.avi: boom"]
        );
    }

    #[test]
    fn convert_summary_empty_when_nothing_ran() {
        assert!(format_convert_summary(&ConvertSummary::default()).is_empty());
    }

    // =========================================================================
    // Generate and clean
    // =========================================================================

    #[test]
    fn generate_output_counts() {
        let report = GenerateReport {
            videos: 2,
            listing_pages: vec!["index.html".to_string(), "sub_index.html".to_string()],
            player_pages: 1,
        };
        let lines = format_generate_output(&report, Path::new("/videos"));
        assert_eq!(lines[0], "Generated 2 listing pages, 1 player page and style.css");
        assert_eq!(lines[1], "Files generated in: /videos");
    }

    #[test]
    fn clean_output_lines() {
        let report = CleanReport {
            removals: vec![
                Removal {
                    removed: "index.html".to_string(),
                    kept: None,
                },
                Removal {
                    removed: "a.mp4".to_string(),
                    kept: Some("a.mkv".to_string()),
                },
            ],
        };
        assert_eq!(
            format_clean_output(&report),
            vec!["Removed: index.html", "Removed: a.mp4 (kept a.mkv)", "Removed 2 files"]
        );
    }

    #[test]
    fn clean_output_nothing() {
        assert_eq!(
            format_clean_output(&CleanReport::default()),
            vec!["Nothing to remove"]
        );
    }
}
