//! Wakeword Gateway - streaming wake word detection over WebSocket
//!
//! This library provides the core functionality for the gateway:
//! - Frame assembly and quiet-frame normalization of raw PCM streams
//! - Per-phrase score smoothing and debounced dual-threshold detection
//! - Shared scoring and synthesis engine handles
//! - HTTP/WebSocket API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         Clients                         │
//! │       /ws (PCM in, detections out)  │  /api/voice       │
//! └────────────────────────────┬────────────────────────────┘
//!                              │
//! ┌────────────────────────────▼────────────────────────────┐
//! │                   Session (per client)                  │
//! │  Assembler → Normalizer → Scoring → Smoother → Decider  │
//! └────────────────────────────┬────────────────────────────┘
//!                              │
//! ┌────────────────────────────▼────────────────────────────┐
//! │               Engines (process-wide, lazy)              │
//! │          Scoring engine   │   Synthesis engine          │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod voice;

pub use config::Config;
pub use daemon::Daemon;
pub use engine::EngineCell;
pub use error::{Error, Result};
pub use voice::{DetectionEvent, Session};
