//! API endpoint integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;
use wakeword_gateway::api::ApiServerBuilder;
use wakeword_gateway::voice::{ScoringEngine, SynthesisEngine, wav_to_samples};
use wakeword_gateway::{Config, EngineCell, Error};

mod common;
use common::{
    BrokenSynthesis, ScriptedEngine, ToneSynthesis, frame_bytes, multi_phrase_config, phrase, test_config,
};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Build a test API router around a synthesis engine handle
fn build_test_router(config: Config, synthesis: EngineCell<dyn SynthesisEngine>) -> axum::Router {
    ApiServerBuilder::new(config)
        .synthesis_engine(Arc::new(synthesis))
        .build()
        .router()
}

fn tone_router(engine: &Arc<ToneSynthesis>) -> axum::Router {
    let engine: Arc<dyn SynthesisEngine> = Arc::<ToneSynthesis>::clone(engine);
    build_test_router(test_config(), EngineCell::ready("synthesis", engine))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn synthesize_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/voice/synthesize")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router(test_config(), EngineCell::unconfigured("synthesis"));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_root_reports_active_phrase() {
    let config = multi_phrase_config(&["hey_jarvis", "alexa"]);
    let app = build_test_router(config, EngineCell::unconfigured("synthesis"));

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "running");
    assert_eq!(json["service"], "wake-word-detection");
    assert_eq!(json["model"], "hey_jarvis");
    assert_eq!(json["models"], serde_json::json!(["hey_jarvis", "alexa"]));
}

#[tokio::test]
async fn test_capabilities_without_synthesis() {
    let app = build_test_router(test_config(), EngineCell::unconfigured("synthesis"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/voice/capabilities")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["scoring_available"], true);
    assert_eq!(json["synthesis_available"], false);
    assert_eq!(json["phrases"], serde_json::json!(["hey_jarvis"]));
}

#[tokio::test]
async fn test_synthesize_unconfigured_is_503() {
    let app = build_test_router(test_config(), EngineCell::unconfigured("synthesis"));

    let response = app.oneshot(synthesize_request(r#"{"text":"hello"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_configured");
}

#[tokio::test]
async fn test_synthesize_empty_text_is_400() {
    let engine = Arc::new(ToneSynthesis::default());
    let app = tone_router(&engine);

    let response = app.oneshot(synthesize_request(r#"{"text":"  "}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_synthesize_returns_wav() {
    let engine = Arc::new(ToneSynthesis::default());
    let app = tone_router(&engine);

    let response = app
        .oneshot(synthesize_request(r#"{"text":"hello there","deep_clone":true}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["format"], "wav");
    assert_eq!(json["sample_rate"], 24_000);

    let wav = BASE64.decode(json["audio"].as_str().unwrap()).unwrap();
    let audio = wav_to_samples(&wav).unwrap();
    assert_eq!(audio.samples, vec![0, 1000, 0, -1000]);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn test_synthesis_failure_is_500() {
    let engine: Arc<dyn SynthesisEngine> = Arc::new(BrokenSynthesis);
    let app = build_test_router(test_config(), EngineCell::ready("synthesis", engine));

    let response = app.oneshot(synthesize_request(r#"{"text":"hello"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"]["code"], "synthesis_failed");
}

#[tokio::test]
async fn test_ws_requires_upgrade() {
    let app = build_test_router(test_config(), EngineCell::unconfigured("synthesis"));

    let response = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

/// Serve the API on an ephemeral port with the given scoring engine and open a client
async fn connect_ws(scoring: EngineCell<dyn ScoringEngine>) -> Client {
    let router = ApiServerBuilder::new(test_config())
        .scoring_engine(Arc::new(scoring))
        .build()
        .router();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await });

    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

fn scripted_cell(engine: &Arc<ScriptedEngine>) -> EngineCell<dyn ScoringEngine> {
    let engine: Arc<dyn ScoringEngine> = Arc::<ScriptedEngine>::clone(engine);
    EngineCell::ready("scoring", engine)
}

/// Next server message, failing the test if nothing arrives in time
async fn next_message(client: &mut Client) -> Option<Message> {
    tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .expect("server did not answer")
        .map(Result::unwrap)
}

async fn next_json(client: &mut Client) -> serde_json::Value {
    match next_message(client).await {
        Some(Message::Text(text)) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text message, got {other:?}"),
    }
}

/// Wait for the server to end the connection
async fn assert_closed(client: &mut Client) {
    loop {
        match next_message(client).await {
            None | Some(Message::Close(_)) => return,
            Some(Message::Ping(_) | Message::Pong(_)) => {}
            Some(other) => panic!("expected close, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_ws_binary_audio_yields_detection() {
    let engine = ScriptedEngine::new([phrase("hey_jarvis", 0.912_34)]);
    let mut client = connect_ws(scripted_cell(&engine)).await;

    // One frame split mid-sample across two messages
    let bytes = frame_bytes(0);
    client.send(Message::binary(bytes[..3].to_vec())).await.unwrap();
    client.send(Message::binary(bytes[3..].to_vec())).await.unwrap();

    let json = next_json(&mut client).await;
    assert_eq!(json["type"], "detection");
    assert_eq!(json["model"], "hey_jarvis");
    assert_eq!(json["score"], 0.912);
    assert!(json["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(engine.calls(), 1);
}

#[tokio::test]
async fn test_ws_text_frame_is_fatal() {
    let engine = ScriptedEngine::new(Vec::new());
    let mut client = connect_ws(scripted_cell(&engine)).await;

    client.send(Message::text("hello")).await.unwrap();

    let json = next_json(&mut client).await;
    assert_eq!(json["type"], "error");
    assert!(json["message"].is_string());
    assert_closed(&mut client).await;
}

#[tokio::test]
async fn test_ws_scoring_engine_failure_reports_error() {
    let cell: EngineCell<dyn ScoringEngine> =
        EngineCell::new("scoring", || Err(Error::Scoring("model file missing".to_string())));
    let mut client = connect_ws(cell).await;

    let json = next_json(&mut client).await;
    assert_eq!(json["type"], "error");
    assert_closed(&mut client).await;
}

#[tokio::test]
async fn test_ws_close_after_partial_frame() {
    let engine = ScriptedEngine::new([phrase("hey_jarvis", 0.9)]);
    let mut client = connect_ws(scripted_cell(&engine)).await;

    client.send(Message::binary(frame_bytes(0)[..5].to_vec())).await.unwrap();
    client.close(None).await.unwrap();
    assert_closed(&mut client).await;

    // The partial frame was discarded, never scored or reported
    assert_eq!(engine.calls(), 0);
}
