//! Site configuration module.
//!
//! Handles loading, validating, and merging the optional `vsite.toml` in the
//! scan root. Stock defaults are serialized to a TOML table and the user file
//! is merged over it key by key, so a config file only needs the values it
//! changes.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "Videos"            # Root listing title (--title wins)
//!
//! [colors]
//! bg_primary = "#0f0f0f"
//! accent = "#6366f1"
//! # ...
//!
//! [conversion]
//! ffmpeg = "ffmpeg"           # Encoder binary (name on PATH or a path)
//! gpu_query = "nvidia-smi"    # GPU query tool used by --gpu
//! max_processes = 1           # Parallel CPU conversions (GPU is always 1)
//!
//! [conversion.cpu]
//! video_codec = "libx264"
//! preset = "fast"
//! rate_control = "crf"
//! quality = 22
//! # ...
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the scan root.
pub const CONFIG_FILE: &str = "vsite.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `vsite.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Title of the root listing page.
    pub title: String,
    /// Stylesheet colour variables.
    pub colors: ColorConfig,
    /// Encoder binaries and profiles for `--convert`.
    pub conversion: ConversionConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Videos".to_string(),
            colors: ColorConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let conv = &self.conversion;
        if conv.max_processes == 0 {
            return Err(ConfigError::Validation(
                "conversion.max_processes must be at least 1".into(),
            ));
        }
        if conv.ffmpeg.trim().is_empty() || conv.gpu_query.trim().is_empty() {
            return Err(ConfigError::Validation(
                "conversion.ffmpeg and conversion.gpu_query must not be empty".into(),
            ));
        }
        for (label, profile) in [("cpu", &conv.cpu), ("gpu", &conv.gpu)] {
            if profile.quality > 51 {
                return Err(ConfigError::Validation(format!(
                    "conversion.{label}.quality must be 0-51"
                )));
            }
            if profile.video_codec.is_empty()
                || profile.audio_codec.is_empty()
                || profile.rate_control.is_empty()
            {
                return Err(ConfigError::Validation(format!(
                    "conversion.{label} codecs and rate_control must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Colours injected into `style.css` as CSS custom properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColorConfig {
    pub bg_primary: String,
    pub bg_secondary: String,
    pub bg_tertiary: String,
    pub text_primary: String,
    pub text_secondary: String,
    pub accent: String,
    pub accent_hover: String,
    pub border: String,
    pub shadow: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            bg_primary: "#0f0f0f".to_string(),
            bg_secondary: "#1a1a1a".to_string(),
            bg_tertiary: "#252525".to_string(),
            text_primary: "#ffffff".to_string(),
            text_secondary: "#a0a0a0".to_string(),
            accent: "#6366f1".to_string(),
            accent_hover: "#818cf8".to_string(),
            border: "#333333".to_string(),
            shadow: "rgba(0, 0, 0, 0.5)".to_string(),
        }
    }
}

/// Conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Encoder binary: a bare name resolved on `PATH`, or a path.
    pub ffmpeg: String,
    /// GPU management tool queried by the `--gpu` capability probe.
    pub gpu_query: String,
    /// Maximum parallel CPU-profile conversions. GPU conversions always run
    /// one at a time.
    pub max_processes: usize,
    pub cpu: EncoderProfile,
    pub gpu: EncoderProfile,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            gpu_query: "nvidia-smi".to_string(),
            max_processes: 1,
            cpu: EncoderProfile::cpu(),
            gpu: EncoderProfile::gpu(),
        }
    }
}

/// One ffmpeg parameter set.
///
/// These values decide the codec, quality, and container layout of every
/// converted file, which is what browsers end up playing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderProfile {
    /// Arguments placed before `-i` (hardware decode setup).
    pub hwaccel: Vec<String>,
    pub video_codec: String,
    pub preset: String,
    /// Rate-control flag name without the dash (`crf`, `cq`, `qp`).
    pub rate_control: String,
    pub quality: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Move the moov atom to the front so playback starts before download ends.
    pub faststart: bool,
}

impl EncoderProfile {
    /// libx264 software encoding.
    pub fn cpu() -> Self {
        Self {
            hwaccel: Vec::new(),
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            rate_control: "crf".to_string(),
            quality: 22,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            faststart: true,
        }
    }

    /// NVENC hardware encoding with CUDA decode.
    pub fn gpu() -> Self {
        Self {
            hwaccel: vec![
                "-hwaccel".to_string(),
                "cuda".to_string(),
                "-hwaccel_output_format".to_string(),
                "cuda".to_string(),
            ],
            video_codec: "h264_nvenc".to_string(),
            preset: "p4".to_string(),
            rate_control: "cq".to_string(),
            quality: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            faststart: true,
        }
    }
}

/// Resolve how many conversions may run at once.
///
/// Capped at the number of available cores; users can lower it, not raise it.
pub fn effective_workers(config: &ConversionConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.clamp(1, cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `vsite.toml` from `root` as a raw TOML value, `Ok(None)` if absent.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config for a scan root: stock defaults, overlaid with `vsite.toml`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `vsite.toml`.
///
/// Printed by `vsite --gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# vsite configuration
# ===================
# Place this file as vsite.toml in the directory you run vsite on.
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Title of the root listing page. The --title flag takes precedence.
title = "Videos"

# ---------------------------------------------------------------------------
# Stylesheet colours (written to style.css as CSS custom properties)
# ---------------------------------------------------------------------------
[colors]
bg_primary = "#0f0f0f"
bg_secondary = "#1a1a1a"
bg_tertiary = "#252525"
text_primary = "#ffffff"
text_secondary = "#a0a0a0"
accent = "#6366f1"
accent_hover = "#818cf8"
border = "#333333"
shadow = "rgba(0, 0, 0, 0.5)"

# ---------------------------------------------------------------------------
# Conversion (--convert)
# ---------------------------------------------------------------------------
[conversion]
# Encoder binary. A bare name is looked up on PATH.
ffmpeg = "ffmpeg"

# GPU management tool used to check for a device when --gpu is given.
gpu_query = "nvidia-smi"

# Parallel CPU conversions, capped at the number of cores.
# GPU conversions always run one at a time.
max_processes = 1

# Software profile: H.264 via libx264.
[conversion.cpu]
hwaccel = []
video_codec = "libx264"
preset = "fast"
rate_control = "crf"
quality = 22
audio_codec = "aac"
audio_bitrate = "128k"
faststart = true

# Hardware profile (--gpu): CUDA decode, NVENC H.264 encode.
[conversion.gpu]
hwaccel = ["-hwaccel", "cuda", "-hwaccel_output_format", "cuda"]
video_codec = "h264_nvenc"
preset = "p4"
rate_control = "cq"
quality = 23
audio_codec = "aac"
audio_bitrate = "128k"
faststart = true
"##
}

/// Generate the `:root` custom properties block for `style.css`.
pub fn generate_color_css(colors: &ColorConfig) -> String {
    format!(
        r#":root {{
  --bg-primary: {bg_primary};
  --bg-secondary: {bg_secondary};
  --bg-tertiary: {bg_tertiary};
  --text-primary: {text_primary};
  --text-secondary: {text_secondary};
  --accent: {accent};
  --accent-hover: {accent_hover};
  --border: {border};
  --shadow: {shadow};
}}"#,
        bg_primary = colors.bg_primary,
        bg_secondary = colors.bg_secondary,
        bg_tertiary = colors.bg_tertiary,
        text_primary = colors.text_primary,
        text_secondary = colors.text_secondary,
        accent = colors.accent,
        accent_hover = colors.accent_hover,
        border = colors.border,
        shadow = colors.shadow,
    )
}
