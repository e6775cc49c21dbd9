//! REST API handlers for the scrape service
//!
//! This module defines the API routes and handlers for session control.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::models::{Credentials, Session};

use super::AppState;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap();
}

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Request body for starting a session
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub email: String,
    pub password: String,
}

impl StartSessionRequest {
    /// Validate and convert into credentials
    fn into_credentials(self) -> Result<Credentials, String> {
        if !EMAIL_RE.is_match(&self.email) {
            return Err(format!("invalid email address: {}", self.email));
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(Credentials {
            email: self.email,
            password: self.password,
        })
    }
}

/// Response body for a started session
#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
}

/// Session list response
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
    pub count: usize,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/api/health", get(health_check))
        // Session endpoints
        .route("/api/v1/sessions", get(list_sessions).post(start_session))
        .route(
            "/api/v1/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .with_state(state)
}

/// Map a domain error to a status and body
fn error_to_response(err: Error) -> axum::response::Response {
    let status = match &err {
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(ErrorResponse::new(err.to_string()))).into_response()
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    }))
}

// ============================================================================
// Session Handlers
// ============================================================================

/// Start a new scrape session
async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> axum::response::Response {
    let credentials = match request.into_credentials() {
        Ok(c) => c,
        Err(reason) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(reason))).into_response();
        }
    };

    match state.engine.start_session(credentials).await {
        Ok(session_id) => (
            StatusCode::OK,
            Json(ApiResponse::success(StartSessionResponse { session_id })),
        )
            .into_response(),
        Err(e) => error_to_response(e),
    }
}

/// Get a specific session
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match state.engine.get_session(id).await {
        Ok(session) => (StatusCode::OK, Json(ApiResponse::success(session))).into_response(),
        Err(e) => error_to_response(e),
    }
}

/// List all sessions
async fn list_sessions(State(state): State<AppState>) -> axum::response::Response {
    match state.engine.list_sessions().await {
        Ok(sessions) => {
            let count = sessions.len();
            (
                StatusCode::OK,
                Json(ApiResponse::success(SessionsResponse { sessions, count })),
            )
                .into_response()
        }
        Err(e) => error_to_response(e),
    }
}

/// Delete a session record
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match state.engine.delete_session(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success(format!("session {id} deleted"))),
        )
            .into_response(),
        Err(e) => error_to_response(e),
    }
}

// ============================================================================
// Tests
// ============================================================================
