//! services/api/src/web/error.rs
//!
//! The single error type returned by every handler. Each failure becomes one
//! HTTP status and one JSON notice, `{"error": "..."}`, that the dashboard
//! shows to the student. Nothing here is fatal to the process.

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use math_mentor_core::{
    extraction::{ExtractionError, FlowError},
    planner::PlanError,
    ports::PortError,
    recall::RecallError,
};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

/// `axum::Json` whose rejections (bad syntax, wrong content type, wrong
/// shape) answer with an [`ErrorNotice`] instead of plain text.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(WebError))]
pub struct ApiJson<T>(pub T);

/// The body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorNotice {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// The request does not fit the current state (wrong flow step, busy action).
    #[error("{0}")]
    Conflict(String),
    /// The AI collaborator failed or answered with something unusable.
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::BadRequest(_) => StatusCode::BAD_REQUEST,
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Conflict(_) => StatusCode::CONFLICT,
            WebError::Upstream(_) => StatusCode::BAD_GATEWAY,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn busy(action: &str) -> Self {
        WebError::Conflict(format!("{} is already in progress.", action))
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        } else {
            warn!("Request rejected with {}: {}", status, self);
        }
        let notice = ErrorNotice {
            error: self.to_string(),
        };
        (status, Json(notice)).into_response()
    }
}

//=========================================================================================
// Conversions from Core Errors
//=========================================================================================

impl From<PortError> for WebError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(what) => WebError::NotFound(what),
            PortError::Unexpected(msg) => WebError::Internal(msg),
        }
    }
}

impl From<FlowError> for WebError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::NoDocument | FlowError::NotReviewing => WebError::Conflict(e.to_string()),
            FlowError::ItemOutOfRange(_) => WebError::NotFound(e.to_string()),
            FlowError::NothingSelected
            | FlowError::QuestionOutOfRange(_)
            | FlowError::EmptySource => WebError::BadRequest(e.to_string()),
        }
    }
}

impl From<ExtractionError> for WebError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::EmptyUpload => WebError::BadRequest(e.to_string()),
            ExtractionError::Collaborator(_)
            | ExtractionError::Reply(_)
            | ExtractionError::NothingExtracted => WebError::Upstream(e.to_string()),
        }
    }
}

impl From<RecallError> for WebError {
    fn from(e: RecallError) -> Self {
        match e {
            RecallError::NoWeakTopics => WebError::Conflict(e.to_string()),
            RecallError::Collaborator(_)
            | RecallError::Reply(_)
            | RecallError::NothingGenerated => WebError::Upstream(e.to_string()),
        }
    }
}

impl From<PlanError> for WebError {
    fn from(e: PlanError) -> Self {
        WebError::Upstream(e.to_string())
    }
}

impl From<MultipartError> for WebError {
    fn from(e: MultipartError) -> Self {
        WebError::BadRequest(format!("Failed to read multipart data: {}", e.body_text()))
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        WebError::BadRequest(rejection.body_text())
    }
}
