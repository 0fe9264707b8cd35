//! Format conversion to browser-playable MP4.
//!
//! Runs before generation when `--convert` is given. Every file that needs
//! conversion (`.mkv`, `.avi`, `.mov`, `.wmv`, `.flv`) and has no `.mp4`
//! sibling yet is handed to ffmpeg, which writes the sibling next to it. The
//! original is never touched.
//!
//! ## Idempotency
//!
//! The `.mp4` sibling is the only record of a finished conversion. A second
//! run finds nothing to do; a run interrupted mid-file leaves a partial
//! sibling that must be removed by hand (or by `--clean-converted`). A
//! conversion that fails on its own removes its partial output, so the next
//! run retries it.
//!
//! ## Profiles
//!
//! | | CPU (default) | GPU (`--gpu`) |
//! |---|---|---|
//! | decode | software | `-hwaccel cuda` |
//! | video | `libx264 -preset fast -crf 22` | `h264_nvenc -preset p4 -cq 23` |
//! | audio | `aac 128k` | `aac 128k` |
//! | container | `+faststart` | `+faststart` |
//!
//! Both are configurable under `[conversion.cpu]` / `[conversion.gpu]`.
//!
//! ## Preflight
//!
//! Before any task runs, ffmpeg must answer `-version`. With `--gpu`, the GPU
//! query tool must report at least one device and ffmpeg must list the GPU
//! video codec among its encoders. Each failure is fatal and carries install
//! hints.
//!
//! ## Scheduling
//!
//! Tasks run in discovery order, one at a time. With
//! `conversion.max_processes > 1` CPU tasks run on a bounded rayon pool
//! instead; GPU tasks always run serially since they share one device. The
//! summary lists results in discovery order either way.

use crate::config::{self, ConversionConfig, EncoderProfile};
use crate::scan::{self, ScanError};
use crate::types;
use rayon::prelude::*;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error(
        "ffmpeg not found ('{0}'). Install with:\n  Debian/Ubuntu: sudo apt install ffmpeg\n  Fedora/RHEL:   sudo dnf install ffmpeg"
    )]
    FfmpegNotFound(String),
    #[error("'{binary} -version' failed: {reason}")]
    FfmpegBroken { binary: String, reason: String },
    #[error(
        "NVIDIA GPU not detected ('{0}' not found).\n\nRequirements for --gpu:\n  1. NVIDIA driver installed (nvidia-smi must work)\n  2. ffmpeg with NVENC support\n\nDriver installation:\n  Debian/Ubuntu: sudo apt install nvidia-driver-535\n  Fedora/RHEL:   sudo dnf install akmod-nvidia"
    )]
    GpuToolNotFound(String),
    #[error("error querying GPU: {0}\n\nCheck that the driver is installed correctly.")]
    GpuQuery(String),
    #[error("no GPU found")]
    NoGpu,
    #[error("error checking ffmpeg encoders: {0}")]
    EncoderQuery(String),
    #[error(
        "ffmpeg does not support {0}.\n\nffmpeg needs to be built with NVENC support.\n\nInstallation:\n  Debian/Ubuntu: sudo apt install ffmpeg\n  Fedora/RHEL:   sudo dnf install ffmpeg --allowerasing\n\nIf the problem persists, install ffmpeg from a repository that includes\nNVENC support (e.g., RPM Fusion)."
    )]
    MissingHwEncoder(String),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Failure of a single conversion. Reported and skipped, never fatal.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("could not run encoder: {0}")]
    Spawn(#[from] io::Error),
    #[error("encoder exited with {0}")]
    Failed(String),
}

/// Which encoder profile a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Cpu,
    Gpu,
}

impl Profile {
    pub fn settings(self, config: &ConversionConfig) -> &EncoderProfile {
        match self {
            Profile::Cpu => &config.cpu,
            Profile::Gpu => &config.gpu,
        }
    }

    /// Concurrent conversions allowed. A GPU run is always serial.
    pub fn workers(self, config: &ConversionConfig) -> usize {
        match self {
            Profile::Cpu => config::effective_workers(config),
            Profile::Gpu => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Profile::Cpu => "CPU",
            Profile::Gpu => "GPU",
        }
    }
}

/// One file to convert.
///
/// The encoder profile is chosen once per run and passed to [`convert`], so
/// every task in a run is encoded with the same settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Source path relative to the scan root, for display.
    pub relative: String,
}

/// Files needing conversion, plus how many already have their `.mp4`.
#[derive(Debug, Default)]
pub struct Pending {
    pub tasks: Vec<ConversionTask>,
    pub already_converted: usize,
    /// Originals skipped because an earlier original owns the same target.
    pub shared_target: usize,
}

/// Progress events sent while converting.
#[derive(Debug, Clone)]
pub enum ConvertEvent {
    Started {
        index: usize,
        total: usize,
        relative: String,
    },
    Finished {
        index: usize,
        total: usize,
        target: String,
    },
    Failed {
        index: usize,
        total: usize,
        relative: String,
        error: String,
    },
}

/// Outcome of a conversion run, in discovery order.
#[derive(Debug, Default)]
pub struct ConvertSummary {
    pub converted: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub already_converted: usize,
}

impl ConvertSummary {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}

/// ffmpeg arguments for one task.
///
/// Input options, input, codec settings, then `-y` and the output path.
pub fn ffmpeg_args(profile: &EncoderProfile, task: &ConversionTask) -> Vec<OsString> {
    let mut args: Vec<OsString> = profile.hwaccel.iter().map(OsString::from).collect();
    args.push("-i".into());
    args.push(task.source.clone().into_os_string());
    let rate_flag = format!("-{}", profile.rate_control);
    let quality = profile.quality.to_string();
    for arg in [
        "-c:v",
        profile.video_codec.as_str(),
        "-preset",
        profile.preset.as_str(),
        rate_flag.as_str(),
        quality.as_str(),
        "-c:a",
        profile.audio_codec.as_str(),
        "-b:a",
        profile.audio_bitrate.as_str(),
    ] {
        args.push(arg.into());
    }
    if profile.faststart {
        args.push("-movflags".into());
        args.push("+faststart".into());
    }
    args.push("-y".into());
    args.push(task.target.clone().into_os_string());
    args
}

// ============================================================================
// Encoder seam
// ============================================================================

/// Runs one conversion to completion.
///
/// `Sync` so a single encoder can be shared across the rayon pool.
pub trait Encoder: Sync {
    fn encode(&self, profile: &EncoderProfile, task: &ConversionTask) -> Result<(), EncodeError>;
}

/// The ffmpeg binary as an [`Encoder`].
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: String,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Encoder for Ffmpeg {
    fn encode(&self, profile: &EncoderProfile, task: &ConversionTask) -> Result<(), EncodeError> {
        let args = ffmpeg_args(profile, task);
        debug!(binary = %self.binary, ?args, "spawning encoder");
        // ffmpeg's own progress goes straight to the terminal
        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(EncodeError::Failed(status.to_string()))
        }
    }
}

// ============================================================================
// Preflight
// ============================================================================

/// Result of a successful preflight.
#[derive(Debug)]
pub struct Preflight {
    pub encoder: Ffmpeg,
    /// Device names reported by the GPU query tool (GPU profile only).
    pub gpus: Vec<String>,
}

/// Check the external tools a conversion run needs.
pub fn preflight(config: &ConversionConfig, profile: Profile) -> Result<Preflight, ConvertError> {
    let output = Command::new(&config.ffmpeg)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConvertError::FfmpegNotFound(config.ffmpeg.clone()),
            _ => ConvertError::FfmpegBroken {
                binary: config.ffmpeg.clone(),
                reason: e.to_string(),
            },
        })?;
    if !output.status.success() {
        return Err(ConvertError::FfmpegBroken {
            binary: config.ffmpeg.clone(),
            reason: output.status.to_string(),
        });
    }

    let gpus = match profile {
        Profile::Cpu => Vec::new(),
        Profile::Gpu => {
            let gpus = probe_gpu(&config.gpu_query)?;
            check_encoder_support(&config.ffmpeg, &config.gpu.video_codec)?;
            gpus
        }
    };

    Ok(Preflight {
        encoder: Ffmpeg::new(config.ffmpeg.clone()),
        gpus,
    })
}

/// Ask the GPU query tool for device names. At least one is required.
pub fn probe_gpu(tool: &str) -> Result<Vec<String>, ConvertError> {
    let output = Command::new(tool)
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConvertError::GpuToolNotFound(tool.to_string()),
            _ => ConvertError::GpuQuery(e.to_string()),
        })?;
    if !output.status.success() {
        return Err(ConvertError::GpuQuery(output.status.to_string()));
    }
    let gpus = parse_gpu_names(&String::from_utf8_lossy(&output.stdout));
    if gpus.is_empty() {
        return Err(ConvertError::NoGpu);
    }
    Ok(gpus)
}

/// One device per non-blank line.
pub fn parse_gpu_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

fn check_encoder_support(ffmpeg: &str, codec: &str) -> Result<(), ConvertError> {
    let output = Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ConvertError::EncoderQuery(e.to_string()))?;
    if !output.status.success() {
        return Err(ConvertError::EncoderQuery(output.status.to_string()));
    }
    if lists_encoder(&String::from_utf8_lossy(&output.stdout), codec) {
        Ok(())
    } else {
        Err(ConvertError::MissingHwEncoder(codec.to_string()))
    }
}

/// Whether `ffmpeg -encoders` output has a line for `codec`.
pub fn lists_encoder(encoders: &str, codec: &str) -> bool {
    encoders
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(codec))
}

// ============================================================================
// Task discovery and execution
// ============================================================================

/// Every convertible file under `root` without a `.mp4` sibling.
///
/// Uses the same walk and sibling test as the scanner, so a file converted
/// here is exactly one the next scan will replace with its `.mp4`. Each
/// target gets one task: when `a.avi` and `a.mkv` both lack `a.mp4`, only
/// the first in walk order is converted.
pub fn find_pending(root: &Path) -> Result<Pending, ConvertError> {
    scan::validate_root(root)?;
    let mut pending = Pending::default();
    let mut targets = HashSet::new();
    for path in scan::visible_files(root)? {
        let Some(ext) = scan::extension_of(&path) else {
            continue;
        };
        if !types::needs_conversion(&ext) {
            continue;
        }
        if scan::has_native_sibling(&path)? {
            debug!(path = %path.display(), "already converted");
            pending.already_converted += 1;
            continue;
        }
        let target = scan::native_sibling(&path);
        if !targets.insert(target.clone()) {
            debug!(path = %path.display(), target = %target.display(), "target already queued");
            pending.shared_target += 1;
            continue;
        }
        pending.tasks.push(ConversionTask {
            target,
            relative: scan::relative_string(root, &path),
            source: path,
        });
    }
    Ok(pending)
}

/// Convert every pending file under `root`.
pub fn convert_all(
    root: &Path,
    config: &ConversionConfig,
    profile: Profile,
    encoder: &impl Encoder,
    events: Option<Sender<ConvertEvent>>,
) -> Result<ConvertSummary, ConvertError> {
    let pending = find_pending(root)?;
    let mut summary = convert(
        &pending.tasks,
        profile.settings(config),
        encoder,
        profile.workers(config),
        events,
    )?;
    summary.already_converted = pending.already_converted;
    Ok(summary)
}

/// Run `tasks` with at most `workers` at a time.
pub fn convert(
    tasks: &[ConversionTask],
    profile: &EncoderProfile,
    encoder: &impl Encoder,
    workers: usize,
    events: Option<Sender<ConvertEvent>>,
) -> Result<ConvertSummary, ConvertError> {
    let total = tasks.len();
    let run = |(index, task): (usize, &ConversionTask)| {
        let sender = events.clone();
        let emit = |event: ConvertEvent| {
            if let Some(tx) = &sender {
                tx.send(event).ok();
            }
        };
        emit(ConvertEvent::Started {
            index,
            total,
            relative: task.relative.clone(),
        });
        let result = convert_one(encoder, profile, task);
        match &result {
            Ok(()) => emit(ConvertEvent::Finished {
                index,
                total,
                target: file_name(&task.target),
            }),
            Err(e) => emit(ConvertEvent::Failed {
                index,
                total,
                relative: task.relative.clone(),
                error: e.to_string(),
            }),
        }
        result
    };

    let results: Vec<Result<(), EncodeError>> = if workers > 1 && total > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()?;
        pool.install(|| tasks.par_iter().enumerate().map(run).collect())
    } else {
        tasks.iter().enumerate().map(run).collect()
    };

    let mut summary = ConvertSummary::default();
    for (task, result) in tasks.iter().zip(results) {
        match result {
            Ok(()) => summary.converted.push(task.relative.clone()),
            Err(e) => summary.failed.push((task.relative.clone(), e.to_string())),
        }
    }
    Ok(summary)
}

/// Encode one task, removing any partial output on failure.
fn convert_one(
    encoder: &impl Encoder,
    profile: &EncoderProfile,
    task: &ConversionTask,
) -> Result<(), EncodeError> {
    encoder.encode(profile, task).inspect_err(|e| {
        warn!(source = %task.source.display(), error = %e, "conversion failed");
        match std::fs::remove_file(&task.target) {
            Ok(()) => debug!(target = %task.target.display(), "removed partial output"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(target = %task.target.display(), error = %err, "could not remove partial output")
            }
        }
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
