//! Request handlers and the structured error envelope.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reelcap_common::error::ReelcapError;
use reelcap_frame_model::{
    BatchHeader, BatchParams, EncodedArtifact, FinalizeRequest, PublishReceipt, SessionId,
};
use serde::Deserialize;

use crate::state::AppState;

/// Error envelope: every failure becomes `{error, details}` with a status
/// code derived from the error taxonomy.
pub struct ApiError(ReelcapError);

impl From<ReelcapError> for ApiError {
    fn from(error: ReelcapError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ReelcapError::Validation { .. } => StatusCode::BAD_REQUEST,
            ReelcapError::MissingFrame { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ReelcapError::Session { .. } => StatusCode::CONFLICT,
            ReelcapError::FileNotFound { .. } => StatusCode::NOT_FOUND,
            ReelcapError::Transport { .. } | ReelcapError::Storage { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let label = match &self.0 {
            ReelcapError::Config { .. } => "Configuration error",
            ReelcapError::Validation { .. } => "Validation error",
            ReelcapError::Transport { .. } => "Transport error",
            ReelcapError::MissingFrame { .. } => "Missing frame",
            ReelcapError::Encoding { .. } => "Encoding failed",
            ReelcapError::Storage { .. } => "Storage error",
            ReelcapError::Session { .. } => "Session error",
            _ => "Internal error",
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }

        let body = serde_json::json!({
            "error": label,
            "details": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

/// `POST /api/sessions/{session_id}/batches`
///
/// Batch metadata rides the query string; the body is the raw concatenated
/// frame payload. Success means every frame in the batch is durably staged.
pub async fn stage_batch(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(params): Query<BatchParams>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session_id = SessionId::parse(session_id)?;
    let header = BatchHeader::from_params(session_id, &params);

    let op_lock = state.registry.admit_batch(&header)?;
    let _serialized = op_lock.lock().await;
    state.registry.confirm_batch(&header.session_id)?;

    let staged = state.stager.stage_batch(&header, body).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "frames_staged": staged,
    })))
}

/// `POST /api/sessions/{session_id}/finalize`
///
/// Encodes the complete session and returns the MP4 bytes. The session
/// reaches a terminal state either way; repeating the call is rejected.
pub async fn finalize_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<FinalizeRequest>,
) -> Result<Response, ApiError> {
    let session_id = SessionId::parse(session_id)?;
    // Reject malformed requests before the session transitions; a bad
    // request is not a finalize attempt.
    request.validate()?;

    let op_lock = state.registry.admit_finalize(&session_id)?;
    let _serialized = op_lock.lock().await;
    state.registry.confirm_finalize(&session_id)?;

    let finalizer = state.finalizer.clone();
    let task_session = session_id.clone();
    let result = tokio::task::spawn_blocking(move || finalizer.finalize(&task_session, &request))
        .await
        .map_err(|e| ReelcapError::encoding(format!("Finalize task panicked: {e}")))?;

    match result {
        Ok(artifact) => {
            state.registry.resolve_finalize(&session_id, true);
            Ok((
                [(header::CONTENT_TYPE, artifact.content_type())],
                artifact.bytes,
            )
                .into_response())
        }
        Err(error) => {
            state.registry.resolve_finalize(&session_id, false);
            Err(error.into())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PublishParams {
    pub owner: String,
    pub file_name: Option<String>,
}

/// `POST /api/videos`
///
/// Persist an encoded artifact to object storage under the owner's path and
/// create its metadata record.
pub async fn publish_video(
    State(state): State<AppState>,
    Query(params): Query<PublishParams>,
    body: Bytes,
) -> Result<Json<PublishReceipt>, ApiError> {
    if body.is_empty() {
        return Err(ReelcapError::validation("Publish body is empty").into());
    }
    let file_name = params.file_name.unwrap_or_else(|| {
        format!(
            "enhanced-video-{}.mp4",
            chrono::Utc::now().timestamp_millis()
        )
    });
    let artifact = EncodedArtifact::new(body.to_vec());
    let receipt = state
        .publisher
        .publish(&params.owner, &file_name, &artifact)
        .await?;
    Ok(Json(receipt))
}
