//! Configuration management for the wake word gateway

pub mod file;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

use file::GatewayConfigFile;

/// Wake word gateway configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Listener configuration
    pub server: ServerConfig,

    /// Detection policy
    pub detection: DetectionConfig,

    /// Quiet-frame boost
    pub normalize: NormalizeConfig,

    /// Scoring engine
    pub scoring: ScoringConfig,

    /// Synthesis engine
    pub synthesis: SynthesisConfig,
}

/// HTTP/WebSocket listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Detection policy configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Wake phrase identifiers, in the order events are evaluated
    pub phrases: Vec<String>,

    /// Samples per analysis frame (1280 = 80ms at 16kHz)
    pub frame_size: usize,

    /// Input sample rate in Hz
    pub sample_rate: u32,

    /// Moving-average threshold (sustained activity)
    pub low_threshold: f32,

    /// Single-frame threshold (strong spike)
    pub high_threshold: f32,

    /// Minimum interval between detections of the same phrase
    pub debounce: Duration,

    /// Smoothing window capacity
    pub window_size: usize,

    /// Distance below a threshold logged as a near miss
    pub near_miss_margin: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            phrases: vec!["hey_jarvis".to_string()],
            frame_size: 1280,
            sample_rate: 16_000,
            low_threshold: 0.35,
            high_threshold: 0.5,
            debounce: Duration::from_millis(1500),
            window_size: 5,
            near_miss_margin: 0.1,
        }
    }
}

impl DetectionConfig {
    /// Wall-clock duration covered by one frame
    #[must_use]
    pub fn frame_duration(&self) -> Duration {
        let micros = self.frame_size as u64 * 1_000_000 / u64::from(self.sample_rate.max(1));
        Duration::from_micros(micros)
    }
}

/// Quiet-frame boost configuration
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Frames whose peak is below this are boosted
    pub quiet_threshold: u16,

    /// Peak a boosted frame aims for
    pub target_peak: f32,

    /// Upper bound on the applied gain
    pub max_gain: f32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            quiet_threshold: 5000,
            target_peak: 10_000.0,
            max_gain: 3.0,
        }
    }
}

/// Which scoring engine to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringBackend {
    /// Remote inference service over HTTP
    Http,
    /// Local RMS-energy heuristic
    #[default]
    Energy,
}

impl FromStr for ScoringBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "energy" => Ok(Self::Energy),
            other => Err(Error::Config(format!("unknown scoring engine: {other}"))),
        }
    }
}

/// Scoring engine configuration
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Engine kind
    pub engine: ScoringBackend,

    /// Inference service URL (http engine)
    pub url: Option<String>,

    /// Per-frame scoring timeout
    pub timeout: Duration,

    /// Scoring calls slower than this are logged
    pub slow_frame: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            engine: ScoringBackend::Energy,
            url: None,
            timeout: Duration::from_millis(2000),
            slow_frame: Duration::from_millis(80),
        }
    }
}

/// Synthesis engine configuration
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Synthesis service URL; unset means synthesis is unavailable
    pub url: Option<String>,

    /// Request timeout
    pub timeout: Duration,

    /// Sample rate assumed when the engine does not report one
    pub sample_rate: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(30),
            sample_rate: 24_000,
        }
    }
}

impl Config {
    /// Load configuration from the environment and the TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if the resulting configuration is invalid
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Precedence is env > file > default.
    ///
    /// # Errors
    ///
    /// Returns error if a value cannot be interpreted or validation fails
    pub fn from_sources<F>(fc: GatewayConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server = ServerConfig {
            host: env("WAKEWORD_HOST")
                .or(fc.server.host)
                .unwrap_or(defaults.server.host),
            port: env_parse(&env, "WAKEWORD_PORT")
                .or(fc.server.port)
                .unwrap_or(defaults.server.port),
        };

        let phrases = env("WAKEWORD_PHRASES")
            .map(|list| list.split(',').map(ToString::to_string).collect())
            .or(fc.detection.phrases)
            .unwrap_or(defaults.detection.phrases)
            .into_iter()
            .map(|p| p.trim().to_string())
            .collect();

        let detection = DetectionConfig {
            phrases,
            frame_size: env_parse(&env, "WAKEWORD_FRAME_SIZE")
                .or(fc.detection.frame_size)
                .unwrap_or(defaults.detection.frame_size),
            sample_rate: env_parse(&env, "WAKEWORD_SAMPLE_RATE")
                .or(fc.detection.sample_rate)
                .unwrap_or(defaults.detection.sample_rate),
            low_threshold: env_parse(&env, "WAKEWORD_LOW_THRESHOLD")
                .or(fc.detection.low_threshold)
                .unwrap_or(defaults.detection.low_threshold),
            high_threshold: env_parse(&env, "WAKEWORD_HIGH_THRESHOLD")
                .or(fc.detection.high_threshold)
                .unwrap_or(defaults.detection.high_threshold),
            debounce: env_parse(&env, "WAKEWORD_DEBOUNCE_MS")
                .or(fc.detection.debounce_ms)
                .map_or(defaults.detection.debounce, Duration::from_millis),
            window_size: env_parse(&env, "WAKEWORD_WINDOW_SIZE")
                .or(fc.detection.window_size)
                .unwrap_or(defaults.detection.window_size),
            near_miss_margin: fc
                .detection
                .near_miss_margin
                .unwrap_or(defaults.detection.near_miss_margin),
        };

        let normalize = NormalizeConfig {
            quiet_threshold: env_parse(&env, "WAKEWORD_QUIET_THRESHOLD")
                .or(fc.normalize.quiet_threshold)
                .unwrap_or(defaults.normalize.quiet_threshold),
            target_peak: env_parse(&env, "WAKEWORD_TARGET_PEAK")
                .or(fc.normalize.target_peak)
                .unwrap_or(defaults.normalize.target_peak),
            max_gain: env_parse(&env, "WAKEWORD_MAX_GAIN")
                .or(fc.normalize.max_gain)
                .unwrap_or(defaults.normalize.max_gain),
        };

        let engine = match env("WAKEWORD_SCORING_ENGINE").or(fc.scoring.engine) {
            Some(name) => name.parse()?,
            None => defaults.scoring.engine,
        };

        // Slow-frame warning defaults to one frame of audio: slower than real time
        let scoring = ScoringConfig {
            engine,
            url: env("WAKEWORD_SCORING_URL").or(fc.scoring.url),
            timeout: env_parse(&env, "WAKEWORD_SCORING_TIMEOUT_MS")
                .or(fc.scoring.timeout_ms)
                .map_or(defaults.scoring.timeout, Duration::from_millis),
            slow_frame: fc
                .scoring
                .slow_frame_ms
                .map_or_else(|| detection.frame_duration(), Duration::from_millis),
        };

        let synthesis = SynthesisConfig {
            url: env("WAKEWORD_SYNTHESIS_URL").or(fc.synthesis.url),
            timeout: fc
                .synthesis
                .timeout_ms
                .map_or(defaults.synthesis.timeout, Duration::from_millis),
            sample_rate: fc
                .synthesis
                .sample_rate
                .unwrap_or(defaults.synthesis.sample_rate),
        };

        let config = Self {
            server,
            detection,
            normalize,
            scoring,
            synthesis,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a usable gateway
    ///
    /// # Errors
    ///
    /// Returns error naming the first invalid setting
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;

        if d.phrases.is_empty() {
            return Err(Error::Config("at least one wake phrase is required".to_string()));
        }
        for (i, phrase) in d.phrases.iter().enumerate() {
            if phrase.is_empty() {
                return Err(Error::Config("wake phrase names must not be empty".to_string()));
            }
            if d.phrases[..i].contains(phrase) {
                return Err(Error::Config(format!("duplicate wake phrase: {phrase}")));
            }
        }
        if d.frame_size == 0 {
            return Err(Error::Config("frame_size must be positive".to_string()));
        }
        if d.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        for (name, value) in [("low_threshold", d.low_threshold), ("high_threshold", d.high_threshold)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if d.window_size == 0 {
            return Err(Error::Config("window_size must be positive".to_string()));
        }
        if !d.near_miss_margin.is_finite() || d.near_miss_margin < 0.0 {
            return Err(Error::Config("near_miss_margin must be non-negative".to_string()));
        }

        let n = &self.normalize;
        if n.quiet_threshold == 0 {
            return Err(Error::Config("quiet_threshold must be positive".to_string()));
        }
        if !n.target_peak.is_finite() || n.target_peak <= 0.0 {
            return Err(Error::Config("target_peak must be positive".to_string()));
        }
        if !n.max_gain.is_finite() || n.max_gain < 1.0 {
            return Err(Error::Config("max_gain must be at least 1.0".to_string()));
        }

        if self.scoring.timeout.is_zero() {
            return Err(Error::Config("scoring.timeout_ms must be positive".to_string()));
        }
        if self.scoring.engine == ScoringBackend::Http && self.scoring.url.is_none() {
            return Err(Error::Config("http scoring engine requires scoring.url".to_string()));
        }

        Ok(())
    }
}

/// Read and parse an environment variable, ignoring unparseable values
fn env_parse<T, F>(env: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
