//! HTTP and WebSocket API for the wake word gateway

pub mod health;
pub mod voice;
pub mod websocket;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::{self, EngineCell};
use crate::voice::{ScoringEngine, SynthesisEngine, SynthesisGateway};
use crate::{Config, Error, Result};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Resolved configuration, read by every new session
    pub config: Arc<Config>,
    /// Process-wide scoring engine
    pub scoring: Arc<EngineCell<dyn ScoringEngine>>,
    /// Synthesis path, isolated from detection
    pub synthesis: SynthesisGateway,
}

impl ApiState {
    /// Configured wake phrases
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.config.detection.phrases
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    config: Config,
    scoring: Option<Arc<EngineCell<dyn ScoringEngine>>>,
    synthesis: Option<Arc<EngineCell<dyn SynthesisEngine>>>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self {
            config,
            scoring: None,
            synthesis: None,
        }
    }

    /// Use an existing scoring engine handle instead of the configured one
    #[must_use]
    pub fn scoring_engine(mut self, cell: Arc<EngineCell<dyn ScoringEngine>>) -> Self {
        self.scoring = Some(cell);
        self
    }

    /// Use an existing synthesis engine handle instead of the configured one
    #[must_use]
    pub fn synthesis_engine(mut self, cell: Arc<EngineCell<dyn SynthesisEngine>>) -> Self {
        self.synthesis = Some(cell);
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let scoring = self
            .scoring
            .unwrap_or_else(|| Arc::new(engine::scoring_cell(&self.config)));
        let synthesis = self
            .synthesis
            .unwrap_or_else(|| Arc::new(engine::synthesis_cell(&self.config)));

        let state = Arc::new(ApiState {
            config: Arc::new(self.config),
            scoring,
            synthesis: SynthesisGateway::new(synthesis),
        });

        ApiServer { state }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .nest("/api/voice", voice::router(self.state.clone()))
            .merge(websocket::router(self.state.clone()))
            .merge(health::router(self.state.clone()));

        // Browser clients connect from arbitrary origins
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
        })
        .await
    }

    /// Run the API server until `shutdown` completes
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = &self.state.config.server;
        let addr = format!("{}:{}", server.host, server.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                Error::Config(format!("address {addr} is already in use; stop the other process or choose another port"))
            } else {
                Error::Config(format!("failed to bind API server on {addr}: {e}"))
            }
        })?;

        tracing::info!(%addr, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
