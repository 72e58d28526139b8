//! services/api/src/web/documents.rs
//!
//! Handlers for the two-step exam document flow: upload, pick the wrong
//! question numbers, extract, review, then confirm everything at once.

use crate::web::{
    error::{ApiJson, ErrorNotice, WebError},
    rest::{BulkSourceRequest, ConfirmResponse, QuestionSlot, RecordInput, SelectionRequest},
    state::AppState,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use math_mentor_core::{
    extraction::{
        part_for_question, question_label, FlowSnapshot, QuestionSelection, QUESTION_COUNT,
    },
    RecordDraft,
};
use std::sync::Arc;
use tracing::info;

/// The fixed 22-question grid of the exam sheet.
#[utoipa::path(
    get,
    path = "/documents/questions",
    responses((status = 200, description = "Every selectable question", body = Vec<QuestionSlot>))
)]
pub async fn question_grid_handler() -> Json<Vec<QuestionSlot>> {
    let slots = (1..=QUESTION_COUNT)
        .filter_map(|number| {
            Some(QuestionSlot {
                number,
                label: question_label(number)?,
                part: part_for_question(number)?.label().to_string(),
            })
        })
        .collect();
    Json(slots)
}

/// Where the document flow currently stands.
#[utoipa::path(
    get,
    path = "/documents",
    responses((status = 200, description = "The current step of the document flow"))
)]
pub async fn document_state_handler(State(app_state): State<Arc<AppState>>) -> Json<FlowSnapshot> {
    Json(app_state.documents.lock().await.snapshot())
}

/// Abandon the flow at whatever step it is in.
#[utoipa::path(
    delete,
    path = "/documents",
    responses((status = 200, description = "The flow is idle again"))
)]
pub async fn cancel_document_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<FlowSnapshot> {
    let mut flow = app_state.documents.lock().await;
    flow.cancel();
    Json(flow.snapshot())
}

/// Upload an exam PDF and open the question selection step.
///
/// Accepts a multipart/form-data request with a single file part. Anything
/// already in progress is discarded.
#[utoipa::path(
    post,
    path = "/documents",
    request_body(content_type = "multipart/form-data", description = "The exam PDF."),
    responses(
        (status = 201, description = "The selection step is open"),
        (status = 400, description = "Missing or empty file", body = ErrorNotice)
    )
)]
pub async fn upload_document_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FlowSnapshot>), WebError> {
    let Some(field) = multipart.next_field().await? else {
        return Err(WebError::BadRequest(
            "Multipart form must include a file".to_string(),
        ));
    };
    let name = field.file_name().unwrap_or("untitled.pdf").to_string();
    let data = field.bytes().await?;
    if data.is_empty() {
        return Err(WebError::BadRequest("The uploaded file is empty.".to_string()));
    }

    let mut flow = app_state.documents.lock().await;
    flow.open_document(data.to_vec())?;
    info!("Opened document '{}' ({} bytes) for selection.", name, data.len());
    Ok((StatusCode::CREATED, Json(flow.snapshot())))
}

/// Replace the whole set of selected question numbers.
#[utoipa::path(
    put,
    path = "/documents/selection",
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "The updated selection step"),
        (status = 400, description = "A number outside 1 to 22", body = ErrorNotice),
        (status = 409, description = "No document is open", body = ErrorNotice)
    )
)]
pub async fn set_selection_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<SelectionRequest>,
) -> Result<Json<FlowSnapshot>, WebError> {
    let selection = QuestionSelection::from_numbers(request.questions)?;
    let mut flow = app_state.documents.lock().await;
    flow.set_selection(selection)?;
    Ok(Json(flow.snapshot()))
}

/// Flip one question number in the selection.
#[utoipa::path(
    post,
    path = "/documents/selection/{number}",
    params(("number" = u32, Path, description = "Question number, 1 to 22")),
    responses(
        (status = 200, description = "The updated selection step"),
        (status = 400, description = "A number outside 1 to 22", body = ErrorNotice),
        (status = 409, description = "No document is open", body = ErrorNotice)
    )
)]
pub async fn toggle_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(number): Path<u32>,
) -> Result<Json<FlowSnapshot>, WebError> {
    let mut flow = app_state.documents.lock().await;
    flow.toggle_question(number)?;
    Ok(Json(flow.snapshot()))
}

/// Extract the selected questions and open the review step.
///
/// The uploaded document is consumed either way: on failure the flow is back
/// to idle and the student uploads again.
#[utoipa::path(
    post,
    path = "/documents/extract",
    responses(
        (status = 200, description = "The review step with one item per extracted question"),
        (status = 400, description = "No question selected", body = ErrorNotice),
        (status = 409, description = "No document is open, or an extraction is running", body = ErrorNotice),
        (status = 502, description = "The assistant failed or returned nothing", body = ErrorNotice)
    )
)]
pub async fn extract_document_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<FlowSnapshot>, WebError> {
    let Some(_guard) = app_state.busy.document.try_acquire() else {
        return Err(WebError::busy("Document extraction"));
    };

    // The lock is released before the network call so the rest of the
    // dashboard stays responsive.
    let (document, selection) = app_state.documents.lock().await.take_extraction_input()?;
    let items = app_state
        .extraction
        .extract_document(&document, &selection)
        .await?;

    let mut flow = app_state.documents.lock().await;
    flow.stage(items);
    Ok(Json(flow.snapshot()))
}

/// Correct the fields of one staged item.
#[utoipa::path(
    patch,
    path = "/documents/review/{index}",
    params(("index" = usize, Path, description = "Zero-based position in the review list")),
    request_body = RecordInput,
    responses(
        (status = 200, description = "The corrected item"),
        (status = 404, description = "No such item", body = ErrorNotice),
        (status = 409, description = "Nothing is under review", body = ErrorNotice)
    )
)]
pub async fn update_review_item_handler(
    State(app_state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    ApiJson(input): ApiJson<RecordInput>,
) -> Result<Json<RecordDraft>, WebError> {
    let item = app_state
        .documents
        .lock()
        .await
        .update_item(index, input.into())?;
    Ok(Json(item))
}

/// Overwrite the source of every staged item.
#[utoipa::path(
    post,
    path = "/documents/review/source",
    request_body = BulkSourceRequest,
    responses(
        (status = 200, description = "The review step with the new source applied"),
        (status = 400, description = "Blank source", body = ErrorNotice),
        (status = 409, description = "Nothing is under review", body = ErrorNotice)
    )
)]
pub async fn bulk_source_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<BulkSourceRequest>,
) -> Result<Json<FlowSnapshot>, WebError> {
    let mut flow = app_state.documents.lock().await;
    let updated = flow.apply_bulk_source(&request.source)?;
    info!("Applied source '{}' to {} staged items.", request.source.trim(), updated);
    Ok(Json(flow.snapshot()))
}

/// Commit every staged item to the front of the log in one step.
#[utoipa::path(
    post,
    path = "/documents/confirm",
    responses(
        (status = 200, description = "The records that were added", body = ConfirmResponse),
        (status = 409, description = "Nothing is under review", body = ErrorNotice)
    )
)]
pub async fn confirm_review_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ConfirmResponse>, WebError> {
    let records = app_state.documents.lock().await.confirm(Utc::now())?;
    app_state
        .store
        .lock()
        .await
        .prepend_records(records.clone())
        .await;
    info!("Committed {} records from the document review.", records.len());
    Ok(Json(ConfirmResponse {
        added: records.len(),
        records,
    }))
}
