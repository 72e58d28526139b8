//! services/api/src/web/records.rs
//!
//! Handlers for the error log: listing with filters, manual entry, editing,
//! deletion, and the one-shot image analysis path.

use crate::web::{
    error::{ApiJson, ErrorNotice, WebError},
    rest::{RecordInput, RecordListResponse, RecordQuery},
    state::AppState,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use math_mentor_core::{
    filter::{filter_records, parse_selector, RecordFilter},
    ErrorRecord, Part, Topic,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

impl RecordQuery {
    fn into_filter(self) -> Result<RecordFilter, WebError> {
        let bad = |e: math_mentor_core::domain::UnknownLabel| WebError::BadRequest(e.to_string());
        Ok(RecordFilter {
            topic: parse_selector::<Topic>(self.topic.as_deref()).map_err(bad)?,
            part: parse_selector::<Part>(self.part.as_deref()).map_err(bad)?,
            search: self.search.unwrap_or_default().trim().to_string(),
            window: match self.window.as_deref().map(str::trim) {
                None | Some("") => Default::default(),
                Some(label) => label.parse().map_err(bad)?,
            },
        })
    }
}

/// List the recorded mistakes, newest first, narrowed by the log filters.
#[utoipa::path(
    get,
    path = "/records",
    params(RecordQuery),
    responses(
        (status = 200, description = "Matching records in stored order", body = RecordListResponse),
        (status = 400, description = "Unknown topic, part or window label", body = ErrorNotice)
    )
)]
pub async fn list_records_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RecordQuery>,
) -> Result<Json<RecordListResponse>, WebError> {
    let filter = query.into_filter()?;
    let store = app_state.store.lock().await;
    let records: Vec<ErrorRecord> = filter_records(store.records(), &filter, Utc::now())
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(RecordListResponse {
        total: store.records().len(),
        records,
    }))
}

/// Add a record by hand. Missing or invalid fields fall back to defaults.
#[utoipa::path(
    post,
    path = "/records",
    request_body = RecordInput,
    responses((status = 201, description = "The sanitized record as stored"))
)]
pub async fn create_record_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<RecordInput>,
) -> impl IntoResponse {
    let record = app_state
        .store
        .lock()
        .await
        .add_manual_record(input.into(), Utc::now())
        .await;
    info!("Added manual record {}.", record.id);
    (StatusCode::CREATED, Json(record))
}

/// Edit the provided fields of a record; omitted fields keep their value.
#[utoipa::path(
    put,
    path = "/records/{id}",
    params(("id" = Uuid, Path, description = "The record to edit")),
    request_body = RecordInput,
    responses(
        (status = 200, description = "The updated record"),
        (status = 404, description = "No such record", body = ErrorNotice)
    )
)]
pub async fn update_record_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<RecordInput>,
) -> Result<Json<ErrorRecord>, WebError> {
    let record = app_state
        .store
        .lock()
        .await
        .update_record(id, input.into())
        .await?;
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/records/{id}",
    params(("id" = Uuid, Path, description = "The record to delete")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such record", body = ErrorNotice)
    )
)]
pub async fn delete_record_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, WebError> {
    app_state.store.lock().await.delete_record(id).await?;
    info!("Deleted record {}.", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Analyze a photographed question and add it to the front of the log.
///
/// Accepts a multipart/form-data request with a single image part. On any
/// failure the log is left untouched.
#[utoipa::path(
    post,
    path = "/records/image",
    request_body(content_type = "multipart/form-data", description = "The photo of the question."),
    responses(
        (status = 201, description = "The record built from the image"),
        (status = 400, description = "Missing or empty image", body = ErrorNotice),
        (status = 409, description = "An image analysis is already running", body = ErrorNotice),
        (status = 502, description = "The assistant failed", body = ErrorNotice)
    )
)]
pub async fn analyze_image_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, WebError> {
    let Some(_guard) = app_state.busy.image.try_acquire() else {
        return Err(WebError::busy("Image analysis"));
    };

    let Some(field) = multipart.next_field().await? else {
        return Err(WebError::BadRequest(
            "Multipart form must include an image".to_string(),
        ));
    };
    let mime_type = field
        .content_type()
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or("image/png")
        .to_string();
    let image = field.bytes().await?;

    let record = app_state
        .extraction
        .analyze_image(&image, &mime_type, Utc::now())
        .await?;
    app_state
        .store
        .lock()
        .await
        .prepend_records(vec![record.clone()])
        .await;
    Ok((StatusCode::CREATED, Json(record)))
}
