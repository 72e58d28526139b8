//! services/api/src/web/recall.rs
//!
//! Handlers for active-recall generation and the LaTeX export.

use crate::web::{
    error::{ErrorNotice, WebError},
    state::AppState,
};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
};
use math_mentor_core::{
    document::{assemble_recall_document, RECALL_EXPORT_FILENAME},
    RecallQuestion,
};
use std::sync::Arc;

/// Generate review questions for the weakest topics, replacing the last set.
#[utoipa::path(
    post,
    path = "/recall",
    responses(
        (status = 200, description = "The generated questions"),
        (status = 409, description = "No records yet, or a generation is running", body = ErrorNotice),
        (status = 502, description = "The assistant failed or returned nothing", body = ErrorNotice)
    )
)]
pub async fn generate_recall_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecallQuestion>>, WebError> {
    let Some(_guard) = app_state.busy.recall.try_acquire() else {
        return Err(WebError::busy("Recall generation"));
    };

    let weak_topics = app_state.store.lock().await.analytics().weak_topics.clone();
    let questions = app_state.recall.generate(&weak_topics).await?;
    *app_state.recall_questions.lock().await = questions.clone();
    Ok(Json(questions))
}

/// The most recently generated questions, empty until the first generation.
#[utoipa::path(
    get,
    path = "/recall",
    responses((status = 200, description = "The current question set"))
)]
pub async fn list_recall_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<RecallQuestion>> {
    Json(app_state.recall_questions.lock().await.clone())
}

/// Download the current questions as one LaTeX sheet.
#[utoipa::path(
    get,
    path = "/recall/document",
    responses(
        (status = 200, description = "The LaTeX source", content_type = "application/x-tex", body = String),
        (status = 404, description = "Nothing has been generated yet", body = ErrorNotice)
    )
)]
pub async fn recall_document_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, WebError> {
    let document = assemble_recall_document(&app_state.recall_questions.lock().await);
    if document.is_empty() {
        return Err(WebError::NotFound(
            "No recall questions have been generated yet.".to_string(),
        ));
    }
    let disposition = format!("attachment; filename=\"{}\"", RECALL_EXPORT_FILENAME);
    Ok((
        [
            (header::CONTENT_TYPE, "application/x-tex; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document,
    ))
}
