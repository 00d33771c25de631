//! HTTP API handlers for the Wayfind server.

use crate::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use wayfind_intent::{Intent, IntentError, IntentResult};

/// Message returned to clients for any resolution failure other than bad input.
pub const PROCESSING_ERROR_MESSAGE: &str = "Error processing intent";

/// Request body for `POST /api/intent`.
#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    /// The utterance to classify.
    pub text: String,
}

/// One entry of the `GET /api/intents` listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct IntentDescriptor {
    pub intent: String,
    pub action_type: String,
}

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("processing failed: {0}")]
    Processing(String),
}

impl ApiError {
    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ApiError::BadRequest(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Processing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                PROCESSING_ERROR_MESSAGE.to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<IntentError> for ApiError {
    fn from(err: IntentError) -> Self {
        match err {
            IntentError::EmptyInput => ApiError::BadRequest("text must not be empty".to_string()),
            other => ApiError::Processing(other.to_string()),
        }
    }
}

/// Handler for `POST /api/intent`.
///
/// Classifies `text` off the async workers and returns the resolved intent.
pub async fn intent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<IntentRequest>,
) -> Result<Json<IntentResult>, ApiError> {
    let result = state
        .resolver
        .clone()
        .resolve_blocking_offloaded(payload.text)
        .await
        .map_err(|e| {
            let err = ApiError::from(e);
            if err.is_client_error() {
                tracing::debug!("rejected intent request: {}", err);
            } else {
                tracing::error!("intent resolution failed: {}", err);
            }
            err
        })?;

    tracing::info!(
        intent = %result.intent,
        confidence = result.confidence,
        action = result.action.type_name(),
        "resolved intent"
    );
    Ok(Json(result))
}

/// Handler for `GET /api/intents`.
pub async fn list_intents_handler() -> Json<Vec<IntentDescriptor>> {
    Json(
        Intent::ALL
            .into_iter()
            .map(|intent| IntentDescriptor {
                intent: intent.label().to_string(),
                action_type: intent.action_type().to_string(),
            })
            .collect(),
    )
}
