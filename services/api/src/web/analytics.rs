//! services/api/src/web/analytics.rs
//!
//! Read-only views derived from the record list. Both come from the store's
//! memoized analytics, so repeated reads between mutations are free.

use crate::web::{
    error::{ErrorNotice, WebError},
    rest::TopicQuery,
    state::AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use math_mentor_core::{
    analytics::{DashboardSummary, TopicInsight},
    filter::parse_selector,
    Topic,
};
use std::sync::Arc;

/// Per-topic breakdown for the topic analyzer, most frequent first.
#[utoipa::path(
    get,
    path = "/analytics/topics",
    params(TopicQuery),
    responses(
        (status = 200, description = "One entry per topic with at least one mistake"),
        (status = 400, description = "Unknown topic label", body = ErrorNotice)
    )
)]
pub async fn topic_breakdown_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TopicQuery>,
) -> Result<Json<Vec<TopicInsight>>, WebError> {
    let topic = parse_selector::<Topic>(query.topic.as_deref())
        .map_err(|e| WebError::BadRequest(e.to_string()))?;
    let analytics = app_state.store.lock().await.analytics();
    let insights = analytics
        .breakdown
        .iter()
        .filter(|insight| topic.map_or(true, |t| insight.topic == t))
        .cloned()
        .collect();
    Ok(Json(insights))
}

/// Headline numbers for the dashboard.
#[utoipa::path(
    get,
    path = "/analytics/dashboard",
    responses((status = 200, description = "Totals, priority topics and key remedies"))
)]
pub async fn dashboard_handler(State(app_state): State<Arc<AppState>>) -> Json<DashboardSummary> {
    let analytics = app_state.store.lock().await.analytics();
    Json(analytics.summary.clone())
}
