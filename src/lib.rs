//! voxguard: synthetic speech detection service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP API (axum)                        │
//! │        POST /detect-voice, GET /health, GET /               │
//! │     auth (x-api-key / Bearer) · lenient base64 payload      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ raw container bytes
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 voxguard-neural Pipeline                    │
//! │  decode → frame → log-mel → tensor → scorer → decision      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            ScorerHandle (ONNX Runtime / degraded)           │
//! │       loaded once at startup, read-only afterwards          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod evaluate;
pub mod payload;
pub mod server;

pub use config::ServiceConfig;
pub use server::{create_router, serve, AppState};
