//! services/api/src/web/plan.rs
//!
//! Handlers for the daily study plan and the availability text it is built from.

use crate::web::{
    error::{ApiJson, ErrorNotice, WebError},
    rest::{AvailabilityRequest, GeneratePlanRequest, PlanResponse},
    state::AppState,
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
};
use math_mentor_core::DailyTask;
use std::sync::Arc;

/// The current task list and availability text.
#[utoipa::path(
    get,
    path = "/plan",
    responses((status = 200, description = "The stored plan", body = PlanResponse))
)]
pub async fn get_plan_handler(State(app_state): State<Arc<AppState>>) -> Json<PlanResponse> {
    let store = app_state.store.lock().await;
    Json(PlanResponse {
        tasks: store.tasks().to_vec(),
        availability: store.availability().to_string(),
    })
}

#[utoipa::path(
    put,
    path = "/plan/availability",
    request_body = AvailabilityRequest,
    responses((status = 200, description = "The plan with the new availability", body = PlanResponse))
)]
pub async fn set_availability_handler(
    State(app_state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<AvailabilityRequest>,
) -> Json<PlanResponse> {
    let mut store = app_state.store.lock().await;
    store.set_availability(request.availability).await;
    Json(PlanResponse {
        tasks: store.tasks().to_vec(),
        availability: store.availability().to_string(),
    })
}

/// Build a new schedule around the weakest topics.
///
/// An availability text in the body replaces the stored one first. The body
/// is optional. On failure the previous task list is kept.
#[utoipa::path(
    post,
    path = "/plan/generate",
    request_body = GeneratePlanRequest,
    responses(
        (status = 200, description = "The new plan", body = PlanResponse),
        (status = 400, description = "A body that is not a JSON object", body = ErrorNotice),
        (status = 409, description = "A plan is already being generated", body = ErrorNotice),
        (status = 502, description = "The assistant failed or returned nothing", body = ErrorNotice)
    )
)]
pub async fn generate_plan_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PlanResponse>, WebError> {
    let request = parse_plan_request(&body)?;
    let Some(_guard) = app_state.busy.plan.try_acquire() else {
        return Err(WebError::busy("Plan generation"));
    };

    let (weak_topics, availability) = {
        let mut store = app_state.store.lock().await;
        if let Some(text) = request.availability {
            store.set_availability(text).await;
        }
        (
            store.analytics().weak_topics.clone(),
            store.availability().to_string(),
        )
    };

    let tasks = app_state
        .planner
        .generate_plan(&weak_topics, &availability)
        .await?;

    let mut store = app_state.store.lock().await;
    store.replace_tasks(tasks).await;
    Ok(Json(PlanResponse {
        tasks: store.tasks().to_vec(),
        availability: store.availability().to_string(),
    }))
}

fn parse_plan_request(body: &[u8]) -> Result<GeneratePlanRequest, WebError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GeneratePlanRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| WebError::BadRequest(format!("Failed to read the plan request: {}", e)))
}

/// Flip the completion flag of one task.
#[utoipa::path(
    post,
    path = "/plan/tasks/{index}/toggle",
    params(("index" = usize, Path, description = "Zero-based position in the task list")),
    responses(
        (status = 200, description = "The toggled task"),
        (status = 404, description = "No such task", body = ErrorNotice)
    )
)]
pub async fn toggle_task_handler(
    State(app_state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Result<Json<DailyTask>, WebError> {
    let task = app_state.store.lock().await.toggle_task(index).await?;
    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_request_body_is_optional() {
        assert_eq!(parse_plan_request(b"").unwrap().availability, None);
        assert_eq!(parse_plan_request(b"  \n").unwrap().availability, None);
        let request = parse_plan_request(r#"{"availability": "Sáng rảnh"}"#.as_bytes()).unwrap();
        assert_eq!(request.availability.as_deref(), Some("Sáng rảnh"));
        assert!(matches!(parse_plan_request(b"[1"), Err(WebError::BadRequest(_))));
    }
}
