//! Voice API endpoints for speech synthesis

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use super::ApiState;
use crate::voice::{SynthesisRequest, SynthesisResponse};

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/synthesize", post(synthesize))
        .route("/capabilities", get(capabilities))
        .with_state(state)
}

/// Voice capabilities response
#[derive(Debug, Serialize)]
pub struct VoiceCapabilities {
    pub scoring_available: bool,
    pub synthesis_available: bool,
    pub phrases: Vec<String>,
}

/// Get voice capabilities
async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<VoiceCapabilities> {
    Json(VoiceCapabilities {
        scoring_available: state.scoring.is_available(),
        synthesis_available: state.synthesis.is_available(),
        phrases: state.phrases().to_vec(),
    })
}

/// Synthesize text to speech
///
/// Returns a base64-encoded WAV file
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesisRequest>,
) -> Result<Json<SynthesisResponse>, VoiceError> {
    let response = state.synthesis.synthesize(&request).await?;
    Ok(Json(response))
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(String),
    BadRequest(String),
    SynthesisFailed(String),
}

impl From<crate::Error> for VoiceError {
    fn from(e: crate::Error) -> Self {
        match e {
            crate::Error::InvalidRequest(msg) => Self::BadRequest(msg),
            crate::Error::EngineUnavailable(msg) => Self::NotConfigured(msg),
            other => Self::SynthesisFailed(other.to_string()),
        }
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::SynthesisFailed(msg) => {
                tracing::error!(error = %msg, "synthesis failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", msg)
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
