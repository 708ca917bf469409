//! Process-wide engine handles
//!
//! Scoring and synthesis engines are expensive to construct and shared by
//! every session, so each lives in an [`EngineCell`]: built once on first use,
//! then handed out as a cheap `Arc`. A failed build is reported and retried on
//! the next request.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{Config, ScoringBackend};
use crate::voice::{EnergyScorer, HttpScoringEngine, HttpSynthesisEngine, ScoringEngine, SynthesisEngine};
use crate::{Error, Result};

type Factory<T> = Box<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// Lazily-initialized shared engine
pub struct EngineCell<T: ?Sized> {
    name: &'static str,
    cell: OnceCell<Arc<T>>,
    factory: Option<Factory<T>>,
}

impl<T: ?Sized + Send + Sync> EngineCell<T> {
    /// Create a cell that builds its engine with `factory` on first use
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            name,
            cell: OnceCell::new(),
            factory: Some(Box::new(factory)),
        }
    }

    /// Create a cell holding an already-built engine
    pub fn ready(name: &'static str, engine: Arc<T>) -> Self {
        Self {
            name,
            cell: OnceCell::new_with(Some(engine)),
            factory: None,
        }
    }

    /// Create a cell with no engine; every request is unavailable
    #[must_use]
    pub fn unconfigured(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
            factory: None,
        }
    }

    /// Get the engine, building it if needed
    ///
    /// # Errors
    ///
    /// Returns `EngineUnavailable` if no engine is configured or building fails
    pub async fn get(&self) -> Result<Arc<T>> {
        if let Some(engine) = self.cell.get() {
            return Ok(Arc::clone(engine));
        }

        let Some(factory) = &self.factory else {
            return Err(Error::EngineUnavailable(format!("{} engine not configured", self.name)));
        };

        let engine = self
            .cell
            .get_or_try_init(|| async {
                tracing::info!(engine = self.name, "initializing engine");
                factory()
            })
            .await
            .map_err(|e| {
                tracing::error!(engine = self.name, error = %e, "engine initialization failed");
                Error::EngineUnavailable(format!("{} engine failed to load: {e}", self.name))
            })?;

        Ok(Arc::clone(engine))
    }

    /// Whether the engine has been built
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    /// Whether the engine is built or can be built on demand
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.is_ready() || self.factory.is_some()
    }

    /// Engine name used in logs and errors
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// Scoring engine cell for the configured backend
#[must_use]
pub fn scoring_cell(config: &Config) -> EngineCell<dyn ScoringEngine> {
    let phrases = config.detection.phrases.clone();
    let sample_rate = config.detection.sample_rate;
    let url = config.scoring.url.clone();
    let timeout = config.scoring.timeout;

    match config.scoring.engine {
        ScoringBackend::Energy => EngineCell::new("scoring", move || {
            Ok(Arc::new(EnergyScorer::new(phrases.clone())) as Arc<dyn ScoringEngine>)
        }),
        ScoringBackend::Http => EngineCell::new("scoring", move || {
            let url = url
                .clone()
                .ok_or_else(|| Error::Config("http scoring engine requires a URL".to_string()))?;
            let engine = HttpScoringEngine::new(url, sample_rate, timeout)?;
            Ok(Arc::new(engine) as Arc<dyn ScoringEngine>)
        }),
    }
}

/// Synthesis engine cell; unconfigured when no synthesis URL is set
#[must_use]
pub fn synthesis_cell(config: &Config) -> EngineCell<dyn SynthesisEngine> {
    let Some(url) = config.synthesis.url.clone() else {
        return EngineCell::unconfigured("synthesis");
    };
    let timeout = config.synthesis.timeout;
    let sample_rate = config.synthesis.sample_rate;

    EngineCell::new("synthesis", move || {
        let engine = HttpSynthesisEngine::new(url.clone(), sample_rate, timeout)?;
        Ok(Arc::new(engine) as Arc<dyn SynthesisEngine>)
    })
}
