//! Daemon - the main gateway service
//!
//! Owns the process-wide engine handles and serves the API until interrupted

use std::sync::Arc;

use crate::api::ApiServerBuilder;
use crate::engine::{self, EngineCell};
use crate::voice::{ScoringEngine, SynthesisEngine};
use crate::{Config, Result};

/// The wake word daemon
pub struct Daemon {
    config: Config,
    scoring: Arc<EngineCell<dyn ScoringEngine>>,
    synthesis: Arc<EngineCell<dyn SynthesisEngine>>,
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let scoring = Arc::new(engine::scoring_cell(&config));
        let synthesis = Arc::new(engine::synthesis_cell(&config));

        Ok(Self {
            config,
            scoring,
            synthesis,
        })
    }

    /// Configured wake phrases
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.config.detection.phrases
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the server cannot bind or fails while running
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            host = %self.config.server.host,
            port = self.config.server.port,
            phrases = ?self.config.detection.phrases,
            engine = ?self.config.scoring.engine,
            "daemon running"
        );

        // Load the scoring engine up front so the first client does not pay for it.
        // A failure here is not fatal; sessions retry on connect.
        if let Err(e) = self.scoring.get().await {
            tracing::warn!(error = %e, "scoring engine not ready at startup");
        }

        if !self.synthesis.is_available() {
            tracing::info!("synthesis not configured; /api/voice/synthesize will answer 503");
        }

        let server = ApiServerBuilder::new(self.config)
            .scoring_engine(self.scoring)
            .synthesis_engine(self.synthesis)
            .build();

        server.run().await?;

        tracing::info!("daemon stopped");
        Ok(())
    }
}
