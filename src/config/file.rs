//! TOML configuration file loading
//!
//! Supports `~/.config/wakeword-gateway/config.toml` (or `$WAKEWORD_CONFIG`)
//! as a persistent config source. All fields are optional; the file is a
//! partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfigFile {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Detection policy configuration
    #[serde(default)]
    pub detection: DetectionFileConfig,

    /// Quiet-frame boost configuration
    #[serde(default)]
    pub normalize: NormalizeFileConfig,

    /// Scoring engine configuration
    #[serde(default)]
    pub scoring: ScoringFileConfig,

    /// Synthesis engine configuration
    #[serde(default)]
    pub synthesis: SynthesisFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Bind address
    pub host: Option<String>,

    /// Listen port
    pub port: Option<u16>,
}

/// Detection policy configuration
#[derive(Debug, Default, Deserialize)]
pub struct DetectionFileConfig {
    /// Wake phrase identifiers known to the scoring engine
    pub phrases: Option<Vec<String>>,

    /// Samples per analysis frame
    pub frame_size: Option<usize>,

    /// Input sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Moving-average threshold
    pub low_threshold: Option<f32>,

    /// Single-frame threshold
    pub high_threshold: Option<f32>,

    /// Minimum interval between detections of the same phrase
    pub debounce_ms: Option<u64>,

    /// Number of scores in the smoothing window
    pub window_size: Option<usize>,

    /// Distance below a threshold that counts as a near miss
    pub near_miss_margin: Option<f32>,
}

/// Quiet-frame boost configuration
#[derive(Debug, Default, Deserialize)]
pub struct NormalizeFileConfig {
    /// Peaks below this are boosted
    pub quiet_threshold: Option<u16>,

    /// Peak amplitude a boosted frame aims for
    pub target_peak: Option<f32>,

    /// Upper bound on the applied gain
    pub max_gain: Option<f32>,
}

/// Scoring engine configuration
#[derive(Debug, Default, Deserialize)]
pub struct ScoringFileConfig {
    /// Engine kind ("http" or "energy")
    pub engine: Option<String>,

    /// Inference service URL for the http engine
    pub url: Option<String>,

    /// Per-frame scoring timeout
    pub timeout_ms: Option<u64>,

    /// Scoring calls slower than this are logged
    pub slow_frame_ms: Option<u64>,
}

/// Synthesis engine configuration
#[derive(Debug, Default, Deserialize)]
pub struct SynthesisFileConfig {
    /// Synthesis service URL; synthesis is unavailable when unset
    pub url: Option<String>,

    /// Request timeout
    pub timeout_ms: Option<u64>,

    /// Sample rate assumed when the engine does not report one
    pub sample_rate: Option<u32>,
}

/// Parse a TOML document into the file schema
///
/// # Errors
///
/// Returns error if the document is not valid TOML or has unknown sections
pub fn parse_config_file(content: &str) -> Result<GatewayConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load the TOML config file from `path`, or from the standard path
///
/// Returns `GatewayConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file(path: Option<&Path>) -> GatewayConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return GatewayConfigFile::default();
    };

    if !path.exists() {
        return GatewayConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config_file(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                GatewayConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            GatewayConfigFile::default()
        }
    }
}

/// Return the config file path: `$WAKEWORD_CONFIG` or `~/.config/wakeword-gateway/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("WAKEWORD_CONFIG") {
        return Some(PathBuf::from(path));
    }

    directories::BaseDirs::new().map(|d| d.config_dir().join("wakeword-gateway").join("config.toml"))
}
