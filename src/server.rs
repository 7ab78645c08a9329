//! HTTP server for voxguard
//!
//! # Endpoints
//!
//! - `POST /detect-voice` - Classify a base64-encoded clip
//! - `GET /health` - Liveness plus scorer status
//! - `GET /` - Banner

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use voxguard_neural::{ClassifyError, Explainability, Label, Pipeline, ScorerKind};

use crate::auth::{authorize, AuthError};
use crate::payload::DetectVoiceRequest;

const AI_EXPLANATION: &str = "Unnatural pitch consistency and robotic speech patterns detected";
const HUMAN_EXPLANATION: &str = "Natural prosody and emotional variation detected";

/// Shared application state
///
/// The pipeline is immutable after startup; handlers clone it into the
/// blocking pool, so no lock is held across requests.
pub struct AppState {
    pub pipeline: Pipeline,
    pub api_key: String,
    /// Largest `/detect-voice` body buffered before rejecting with 413.
    pub max_body_bytes: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectVoiceResponse {
    pub status: String,
    pub language: String,
    pub classification: Label,
    pub confidence_score: f64,
    pub explanation: String,
    pub explainability: Explainability,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"`
    pub status: String,
    pub scorer: ScorerKind,
    pub degraded_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

pub fn explanation_for(label: Label) -> &'static str {
    match label {
        Label::AiGenerated => AI_EXPLANATION,
        Label::Human => HUMAN_EXPLANATION,
    }
}

/// POST /detect-voice
async fn detect_voice(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    let request_id = request_id(&headers);

    if let Err(e) = authorize(&headers, &state.api_key) {
        tracing::info!(request_id = %request_id, code = e.code(), "detect-voice rejected");
        return auth_error_response(&request_id, e);
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection_response(&request_id, &state, rejection),
    };

    let request: DetectVoiceRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &request_id,
                "invalid_request",
                format!("request body must be a JSON object: {}", e),
            );
        }
    };

    let audio = match request.decode_audio() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::info!(
                request_id = %request_id,
                body_bytes = body.len(),
                code = e.code(),
                "detect-voice payload rejected"
            );
            return error_response(StatusCode::BAD_REQUEST, &request_id, e.code(), e.to_string());
        }
    };
    let audio_bytes = audio.len();
    let hint = request.format_hint();

    let pipeline = state.pipeline.clone();
    let result =
        tokio::task::spawn_blocking(move || pipeline.classify_with_hint(&audio, hint.as_deref()))
            .await;

    let decision = match result {
        Ok(Ok(decision)) => decision,
        Ok(Err(e)) => return classify_error_response(&request_id, audio_bytes, e),
        Err(e) => {
            tracing::error!(request_id = %request_id, "classification task failed: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &request_id,
                "internal_error",
                "classification task failed".to_string(),
            );
        }
    };

    tracing::info!(
        request_id = %request_id,
        audio_bytes,
        classification = decision.label.as_str(),
        confidence = decision.confidence,
        degraded = state.pipeline.is_degraded(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "detect-voice"
    );

    let payload = DetectVoiceResponse {
        status: "success".to_string(),
        language: request.language().to_string(),
        classification: decision.label,
        confidence_score: decision.confidence,
        explanation: explanation_for(decision.label).to_string(),
        explainability: decision.explainability,
    };
    json_response(StatusCode::OK, &request_id, &payload)
}

/// GET /health - always 200; degraded mode still serves
async fn health(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let scorer = state.pipeline.scorer();
    let response = HealthResponse {
        status: if scorer.is_degraded() { "degraded" } else { "ok" }.to_string(),
        scorer: scorer.kind(),
        degraded_reason: scorer.unavailable().map(|u| u.to_string()),
    };
    json_response(StatusCode::OK, &request_id(&headers), &response)
}

/// GET /
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "voxguard synthetic speech detector is running.",
        "usage": "POST base64 audio to /detect-voice with an x-api-key header."
    }))
}

/// Create the axum router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/detect-voice", post(detect_voice).layer(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the server
pub async fn serve(state: Arc<AppState>, addr: std::net::SocketAddr) -> std::io::Result<()> {
    let router = create_router(state);

    tracing::info!("Starting voxguard server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn classify_error_response(request_id: &str, audio_bytes: usize, err: ClassifyError) -> Response {
    let status = if err.is_client_error() {
        tracing::info!(request_id = %request_id, audio_bytes, "undecodable audio: {}", err);
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(request_id = %request_id, audio_bytes, "classification failed: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, request_id, err.code(), err.to_string())
}

fn body_rejection_response(
    request_id: &str,
    state: &AppState,
    rejection: BytesRejection,
) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::info!(
            request_id = %request_id,
            limit = state.max_body_bytes,
            "detect-voice body over limit"
        );
        return error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            request_id,
            "payload_too_large",
            format!("request body exceeds {} bytes", state.max_body_bytes),
        );
    }
    error_response(
        StatusCode::BAD_REQUEST,
        request_id,
        "invalid_request",
        rejection.body_text(),
    )
}

fn auth_error_response(request_id: &str, err: AuthError) -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        request_id,
        err.code(),
        err.message().to_string(),
    )
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(new_request_id)
}

fn set_request_id(resp: &mut Response, request_id: &str) {
    if let Ok(hv) = HeaderValue::from_str(request_id) {
        resp.headers_mut().insert("x-request-id", hv);
    }
}

fn json_response<T: Serialize>(status: StatusCode, request_id: &str, payload: &T) -> Response {
    let mut resp = (status, Json(payload)).into_response();
    set_request_id(&mut resp, request_id);
    resp
}

fn error_response(
    status: StatusCode,
    request_id: &str,
    code: &'static str,
    message: String,
) -> Response {
    json_response(status, request_id, &ErrorBody { code, message })
}

fn new_request_id() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    let mut suffix = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        suffix.push_str(&format!("{:02x}", b));
    }
    format!(
        "req_{}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        suffix
    )
}
