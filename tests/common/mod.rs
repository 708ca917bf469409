//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wakeword_gateway::voice::{Frame, Pcm, PhraseScores, ScoringEngine, SynthesisEngine, SynthesisOptions};
use wakeword_gateway::{Config, Error, Result};

/// Samples per frame used by the test configuration
pub const TEST_FRAME_SIZE: usize = 4;

/// One scripted scoring outcome
#[derive(Debug, Clone)]
pub enum Step {
    /// Report these phrase scores
    Scores(Vec<(&'static str, f32)>),
    /// Fail the frame
    Fail,
}

/// Score every frame with `score` for a single phrase
#[must_use]
pub fn phrase(name: &'static str, score: f32) -> Step {
    Step::Scores(vec![(name, score)])
}

/// Scoring engine that replays a script, one step per frame
///
/// Frames beyond the end of the script score nothing.
pub struct ScriptedEngine {
    script: Mutex<VecDeque<Step>>,
    peaks: Mutex<Vec<u16>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    /// Create an engine replaying `steps`
    #[must_use]
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            peaks: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Number of frames scored so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Peak amplitude of every frame the engine received
    pub fn peaks(&self) -> Vec<u16> {
        self.peaks.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScoringEngine for ScriptedEngine {
    async fn score(&self, frame: &Frame) -> Result<PhraseScores> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.peaks.lock().unwrap().push(frame.peak());

        let step = self.script.lock().unwrap().pop_front();
        match step {
            Some(Step::Scores(scores)) => Ok(scores.into_iter().map(|(p, s)| (p.to_string(), s)).collect()),
            Some(Step::Fail) => Err(Error::Scoring("scripted failure".to_string())),
            None => Ok(PhraseScores::new()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Scoring engine that never answers within a short timeout
pub struct StalledEngine(pub Duration);

#[async_trait]
impl ScoringEngine for StalledEngine {
    async fn score(&self, _frame: &Frame) -> Result<PhraseScores> {
        tokio::time::sleep(self.0).await;
        Ok(PhraseScores::new())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

/// Synthesis engine producing a short fixed waveform
#[derive(Default)]
pub struct ToneSynthesis {
    calls: AtomicUsize,
}

impl ToneSynthesis {
    /// Number of synthesis calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisEngine for ToneSynthesis {
    async fn synthesize(&self, _text: &str, _options: &SynthesisOptions) -> Result<Pcm> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Pcm {
            samples: vec![0, 1000, 0, -1000],
            sample_rate: 24_000,
        })
    }
}

/// Synthesis engine that always fails
pub struct BrokenSynthesis;

#[async_trait]
impl SynthesisEngine for BrokenSynthesis {
    async fn synthesize(&self, _text: &str, _options: &SynthesisOptions) -> Result<Pcm> {
        Err(Error::Synthesis("vocoder exploded".to_string()))
    }
}

/// Default configuration with tiny frames
#[must_use]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.detection.frame_size = TEST_FRAME_SIZE;
    config
}

/// Test configuration detecting several phrases
#[must_use]
pub fn multi_phrase_config(phrases: &[&str]) -> Config {
    let mut config = test_config();
    config.detection.phrases = phrases.iter().map(ToString::to_string).collect();
    config
}

/// One frame of PCM bytes, every sample set to `value`
#[must_use]
pub fn frame_bytes(value: i16) -> Vec<u8> {
    std::iter::repeat_n(value, TEST_FRAME_SIZE)
        .flat_map(i16::to_le_bytes)
        .collect()
}

/// Offset of the `n`th 80ms frame
#[must_use]
pub fn frame_time(n: u64) -> Duration {
    Duration::from_millis(80 * n)
}
