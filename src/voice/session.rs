//! Per-connection detection pipeline
//!
//! A [`Session`] owns everything one client stream needs: the frame buffer,
//! the score windows, and the debounce clocks. Nothing here is shared between
//! sessions except the scoring engine behind the adapter.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::config::Config;

use super::decider::{Decision, DetectionDecider};
use super::frame::{Frame, FrameAssembler};
use super::normalize::Normalizer;
use super::scoring::{ScoringAdapter, ScoringEngine};
use super::smoothing::ScoreSmoother;

/// A wake phrase detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    /// Phrase that fired
    pub phrase: String,
    /// Instantaneous score of the firing frame, full precision
    pub score: f32,
    /// Wall-clock time of the decision, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

/// Counters reported when a session closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames the engine scored successfully
    pub frames_scored: u64,
    /// Frames dropped because scoring failed
    pub frames_dropped: u64,
    /// Detection events emitted
    pub detections: u64,
}

/// Detection state for one client stream
pub struct Session {
    id: String,
    assembler: FrameAssembler,
    normalizer: Normalizer,
    scorer: ScoringAdapter,
    smoother: ScoreSmoother,
    decider: DetectionDecider,
    stats: SessionStats,
}

impl Session {
    /// Create a session scoring with `engine`
    #[must_use]
    pub fn new(id: impl Into<String>, config: &Config, engine: Arc<dyn ScoringEngine>) -> Self {
        let detection = &config.detection;
        Self {
            id: id.into(),
            assembler: FrameAssembler::new(detection.frame_size),
            normalizer: Normalizer::new(&config.normalize),
            scorer: ScoringAdapter::new(engine, &detection.phrases, &config.scoring),
            smoother: ScoreSmoother::new(detection.phrases.len(), detection.window_size),
            decider: DetectionDecider::new(detection),
            stats: SessionStats::default(),
        }
    }

    /// Session identifier
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Counters so far
    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Buffer a chunk of raw PCM bytes
    pub fn feed(&mut self, bytes: &[u8]) {
        self.assembler.append(bytes);
    }

    /// Score the oldest buffered frame, if any
    ///
    /// Returns `None` when no complete frame is buffered, otherwise the events
    /// (possibly none) produced by that frame.
    pub async fn process_next(&mut self, now: Instant) -> Option<Vec<DetectionEvent>> {
        let frame = self.assembler.next_frame()?;
        Some(self.process_frame(frame, now).await)
    }

    /// Buffer a chunk and score every frame it completes
    pub async fn process_chunk(&mut self, bytes: &[u8], now: Instant) -> Vec<DetectionEvent> {
        self.feed(bytes);
        let mut events = Vec::new();
        while let Some(batch) = self.process_next(now).await {
            events.extend(batch);
        }
        events
    }

    async fn process_frame(&mut self, frame: Frame, now: Instant) -> Vec<DetectionEvent> {
        let frame = self.normalizer.normalize(frame);

        let scores = match self.scorer.score(&frame).await {
            Ok(scores) => scores,
            Err(e) => {
                self.stats.frames_dropped += 1;
                tracing::warn!(session = %self.id, error = %e, "scoring failed, dropping frame");
                return Vec::new();
            }
        };
        self.stats.frames_scored += 1;

        let Self {
            id,
            scorer,
            smoother,
            decider,
            stats,
            ..
        } = self;

        let mut events = Vec::new();
        for (index, (phrase, score)) in scorer.phrases().iter().zip(scores.scores()).enumerate() {
            let Some(score) = *score else { continue };
            let Some(average) = smoother.observe(index, score) else { continue };
            let phrase = phrase.as_str();
            tracing::trace!(session = %id, phrase, score, average, "frame scored");

            match decider.decide(index, score, average, now) {
                Decision::Fire { since_last } => {
                    smoother.reset(index);
                    stats.detections += 1;
                    tracing::info!(
                        session = %id,
                        phrase,
                        score,
                        average,
                        since_last = ?since_last,
                        "wake phrase detected"
                    );
                    events.push(DetectionEvent {
                        phrase: phrase.to_string(),
                        score,
                        timestamp_ms: Utc::now().timestamp_millis(),
                    });
                }
                Decision::Debounced { since_last } => {
                    tracing::info!(
                        session = %id,
                        phrase,
                        score,
                        since_last = ?since_last,
                        "detection ignored (debounced)"
                    );
                }
                Decision::NearMiss => {
                    tracing::debug!(
                        session = %id,
                        phrase,
                        score,
                        average,
                        low = decider.low_threshold(),
                        high = decider.high_threshold(),
                        "near miss"
                    );
                }
                Decision::Quiet => {}
            }
        }

        events
    }

    /// End the session, releasing all per-session state
    pub fn close(self) -> SessionStats {
        match self.assembler.finish() {
            Ok(rest) if !rest.is_empty() => {
                tracing::debug!(session = %self.id, bytes = rest.len(), "discarding partial frame");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(session = %self.id, error = %e, "stream ended mid-sample"),
        }

        tracing::info!(
            session = %self.id,
            frames_scored = self.stats.frames_scored,
            frames_dropped = self.stats.frames_dropped,
            detections = self.stats.detections,
            "session closed"
        );
        self.stats
    }
}
