//! Acoustic scoring engines and the per-frame scoring adapter
//!
//! The engine itself is an external collaborator. Engines that are safe to
//! call concurrently implement [`ScoringEngine`] directly; stateful engines
//! that need `&mut self` implement [`FrameScorer`] and are wrapped in a
//! [`SerializedScorer`], which queues calls so sessions never overlap inside
//! the engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::config::ScoringConfig;
use crate::{Error, Result};

use super::frame::Frame;

/// Raw engine output: probability per wake phrase name
pub type PhraseScores = HashMap<String, f32>;

/// Scoring engine shared by all sessions
#[async_trait]
pub trait ScoringEngine: Send + Sync {
    /// Score one frame
    async fn score(&self, frame: &Frame) -> Result<PhraseScores>;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}

/// Stateful scoring engine that must not be called concurrently
pub trait FrameScorer: Send + 'static {
    /// Score one frame
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails on this frame
    fn score(&mut self, frame: &Frame) -> Result<PhraseScores>;
}

/// Serializes calls to a [`FrameScorer`] and runs them off the async workers
pub struct SerializedScorer<S> {
    inner: Arc<tokio::sync::Mutex<S>>,
    name: &'static str,
}

impl<S: FrameScorer> SerializedScorer<S> {
    /// Wrap a scorer
    pub fn new(scorer: S, name: &'static str) -> Self {
        Self {
            inner: Arc::new(tokio::sync::Mutex::new(scorer)),
            name,
        }
    }
}

#[async_trait]
impl<S: FrameScorer> ScoringEngine for SerializedScorer<S> {
    async fn score(&self, frame: &Frame) -> Result<PhraseScores> {
        // Fair mutex: waiting sessions are served in arrival order
        let mut guard = Arc::clone(&self.inner).lock_owned().await;
        let frame = frame.clone();

        tokio::task::spawn_blocking(move || guard.score(&frame))
            .await
            .map_err(|e| Error::Scoring(format!("scorer task failed: {e}")))?
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Scores frames with a remote inference service
///
/// Frames are POSTed as little-endian PCM; the service answers with a JSON
/// object mapping phrase names to probabilities.
pub struct HttpScoringEngine {
    client: reqwest::Client,
    url: String,
    sample_rate: u32,
}

impl HttpScoringEngine {
    /// Create a client for the service at `url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: String, sample_rate: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            sample_rate,
        })
    }
}

#[async_trait]
impl ScoringEngine for HttpScoringEngine {
    async fn score(&self, frame: &Frame) -> Result<PhraseScores> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("x-sample-rate", self.sample_rate.to_string())
            .body(frame.to_le_bytes())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Scoring(format!("inference service error {status}: {body}")));
        }

        Ok(response.json().await?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Full-scale RMS that maps to a score of 1.0
const ENERGY_FULL_SCALE: f32 = 0.1;

/// Normalized RMS treated as silence
const ENERGY_NOISE_FLOOR: f32 = 0.005;

/// Offline fallback scorer based on frame energy
///
/// Reports the same score for every configured phrase: RMS energy above a
/// fixed noise floor, scaled into `[0, 1]`. Holds no per-stream state, so one
/// instance serves every session without them influencing each other. Useful
/// for exercising the gateway without an inference service; it cannot tell
/// phrases apart.
#[derive(Debug, Clone)]
pub struct EnergyScorer {
    phrases: Vec<String>,
}

impl EnergyScorer {
    /// Create a scorer reporting for `phrases`
    #[must_use]
    pub const fn new(phrases: Vec<String>) -> Self {
        Self { phrases }
    }

    /// Score for one frame's samples
    #[must_use]
    pub fn frame_score(samples: &[i16]) -> f32 {
        let rms = calculate_rms(samples);
        ((rms - ENERGY_NOISE_FLOOR) / ENERGY_FULL_SCALE).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl ScoringEngine for EnergyScorer {
    async fn score(&self, frame: &Frame) -> Result<PhraseScores> {
        let score = Self::frame_score(frame.samples());
        Ok(self.phrases.iter().map(|p| (p.clone(), score)).collect())
    }

    fn name(&self) -> &'static str {
        "energy"
    }
}

/// RMS of 16-bit samples, normalized to `[0, 1]`
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let v = f32::from(s) / 32768.0;
            v * v
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Scores for the configured phrases, aligned with [`ScoringAdapter::phrases`]
///
/// `None` means the engine did not report that phrase for this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScores {
    scores: Vec<Option<f32>>,
}

impl FrameScores {
    /// Score per configured phrase, in configuration order
    #[must_use]
    pub fn scores(&self) -> &[Option<f32>] {
        &self.scores
    }
}

/// Invokes the engine once per frame and reconciles its output
///
/// Enforces the per-frame time budget and maps engine output onto the closed
/// set of configured phrases.
#[derive(Clone)]
pub struct ScoringAdapter {
    engine: Arc<dyn ScoringEngine>,
    phrases: Arc<[String]>,
    timeout: Duration,
    slow_frame: Duration,
}

impl ScoringAdapter {
    /// Create an adapter for `engine` scoring `phrases`
    #[must_use]
    pub fn new(engine: Arc<dyn ScoringEngine>, phrases: &[String], config: &ScoringConfig) -> Self {
        Self {
            engine,
            phrases: phrases.into(),
            timeout: config.timeout,
            slow_frame: config.slow_frame,
        }
    }

    /// Configured phrases, in evaluation order
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Score one frame
    ///
    /// # Errors
    ///
    /// Returns error if the engine fails, times out, or reports a non-finite
    /// score. Errors concern this frame only.
    pub async fn score(&self, frame: &Frame) -> Result<FrameScores> {
        let started = Instant::now();
        let raw = tokio::time::timeout(self.timeout, self.engine.score(frame))
            .await
            .map_err(|_| Error::ScoringTimeout(duration_millis(self.timeout)))??;

        let elapsed = started.elapsed();
        if elapsed > self.slow_frame {
            tracing::warn!(
                engine = self.engine.name(),
                elapsed_ms = duration_millis(elapsed),
                budget_ms = duration_millis(self.slow_frame),
                "slow scoring call"
            );
        }

        self.reconcile(raw)
    }

    fn reconcile(&self, mut raw: PhraseScores) -> Result<FrameScores> {
        let mut scores = Vec::with_capacity(self.phrases.len());
        for phrase in self.phrases.iter() {
            let score = match raw.remove(phrase) {
                Some(s) if !s.is_finite() => {
                    return Err(Error::Scoring(format!("non-finite score for {phrase}: {s}")));
                }
                Some(s) => Some(s.clamp(0.0, 1.0)),
                None => None,
            };
            scores.push(score);
        }

        if !raw.is_empty() {
            tracing::trace!(unknown = ?raw.keys().collect::<Vec<_>>(), "ignoring unconfigured phrases");
        }

        Ok(FrameScores { scores })
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_millis(d: Duration) -> u64 {
    d.as_millis() as u64
}
