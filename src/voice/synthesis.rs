//! Text-to-speech gateway
//!
//! Stateless request/response path around an external synthesis engine.
//! Nothing here touches detection sessions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::engine::EngineCell;
use crate::{Error, Result};

use super::frame::{BYTES_PER_SAMPLE, Frame};
use super::wav::samples_to_wav;

/// Quality/latency tradeoff requested from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    /// Shallow clone: lowest latency
    Fast,
    /// Deep clone: higher fidelity, slower
    HighFidelity,
}

impl SynthesisMode {
    /// Mode selected by the caller's high-fidelity flag
    #[must_use]
    pub const fn from_flag(high_fidelity: bool) -> Self {
        if high_fidelity { Self::HighFidelity } else { Self::Fast }
    }
}

/// Options passed to the synthesis engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Requested mode
    pub mode: SynthesisMode,
}

/// Raw synthesized audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcm {
    /// Mono 16-bit samples
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Speech synthesis engine
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Synthesize `text` to PCM audio
    async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<Pcm>;
}

/// Synthesizes speech with a remote service
///
/// The service receives `{text, mode}` as JSON and answers with raw
/// little-endian 16-bit PCM, optionally reporting its rate in `x-sample-rate`.
pub struct HttpSynthesisEngine {
    client: reqwest::Client,
    url: String,
    default_sample_rate: u32,
}

impl HttpSynthesisEngine {
    /// Create a client for the service at `url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: String, default_sample_rate: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            default_sample_rate,
        })
    }
}

#[async_trait]
impl SynthesisEngine for HttpSynthesisEngine {
    async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<Pcm> {
        #[derive(Serialize)]
        struct EngineRequest<'a> {
            text: &'a str,
            mode: SynthesisMode,
        }

        let response = self
            .client
            .post(&self.url)
            .json(&EngineRequest {
                text,
                mode: options.mode,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("synthesis service error {status}: {body}")));
        }

        let sample_rate = header_sample_rate(response.headers()).unwrap_or(self.default_sample_rate);

        let body = response.bytes().await?;
        if body.len() % BYTES_PER_SAMPLE != 0 {
            return Err(Error::Synthesis(format!(
                "synthesis service returned {} bytes, not whole 16-bit samples",
                body.len()
            )));
        }

        Ok(Pcm {
            samples: Frame::from_le_bytes(&body).into_samples(),
            sample_rate,
        })
    }
}

/// Positive sample rate announced by the synthesis service, if any
fn header_sample_rate(headers: &HeaderMap) -> Option<u32> {
    headers
        .get("x-sample-rate")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .filter(|&rate: &u32| rate > 0)
}

/// Synthesis request body
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,

    /// Use the slower, higher-fidelity mode
    #[serde(default, alias = "high_fidelity")]
    pub deep_clone: bool,
}

/// Synthesis response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisResponse {
    /// Base64-encoded audio container
    pub audio: String,

    /// Container tag
    pub format: String,

    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Validates requests, calls the engine, and packages the audio
#[derive(Clone)]
pub struct SynthesisGateway {
    engine: Arc<EngineCell<dyn SynthesisEngine>>,
}

impl SynthesisGateway {
    /// Create a gateway over a shared engine handle
    #[must_use]
    pub const fn new(engine: Arc<EngineCell<dyn SynthesisEngine>>) -> Self {
        Self { engine }
    }

    /// Whether an engine is configured
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.engine.is_available()
    }

    /// Synthesize a request into a WAV payload
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for empty text (without calling the engine),
    /// `EngineUnavailable` if the engine cannot be loaded, and `Synthesis` or
    /// `Audio` if generation or packaging fails
    pub async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResponse> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(Error::InvalidRequest("text must not be empty".to_string()));
        }

        let engine = self.engine.get().await?;
        let options = SynthesisOptions {
            mode: SynthesisMode::from_flag(request.deep_clone),
        };

        tracing::debug!(chars = text.len(), mode = ?options.mode, "synthesizing speech");
        let pcm = engine.synthesize(text, &options).await?;
        let wav = samples_to_wav(&pcm.samples, pcm.sample_rate)?;

        Ok(SynthesisResponse {
            audio: BASE64.encode(wav),
            format: "wav".to_string(),
            sample_rate: pcm.sample_rate,
        })
    }
}
