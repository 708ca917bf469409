//! Voice processing module
//!
//! Streams PCM audio through frame assembly, normalization, scoring,
//! smoothing, and a debounced detection decision. Synthesis is a separate,
//! stateless path.

mod decider;
mod frame;
mod normalize;
mod scoring;
mod session;
mod smoothing;
mod synthesis;
mod wav;

pub use decider::{DeciderState, Decision, DetectionDecider};
pub use frame::{BYTES_PER_SAMPLE, Frame, FrameAssembler, Frames};
pub use normalize::Normalizer;
pub use scoring::{
    EnergyScorer, FrameScorer, FrameScores, HttpScoringEngine, PhraseScores, ScoringAdapter, ScoringEngine,
    SerializedScorer,
};
pub use session::{DetectionEvent, Session, SessionStats};
pub use smoothing::{ScoreSmoother, ScoreWindow};
pub use synthesis::{
    HttpSynthesisEngine, Pcm, SynthesisEngine, SynthesisGateway, SynthesisMode, SynthesisOptions, SynthesisRequest,
    SynthesisResponse,
};
pub use wav::{WavAudio, read_wav, samples_to_wav, wav_to_samples};
