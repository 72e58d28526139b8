//! services/api/src/web/router.rs
//!
//! Assembles every REST route into one `Router`.

use crate::web::{analytics, documents, plan, recall, records, state::AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the API router. `max_upload_bytes` caps request bodies, which
/// matters for the image and PDF uploads.
pub fn build_router(app_state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let record_routes = Router::new()
        .route(
            "/records",
            get(records::list_records_handler).post(records::create_record_handler),
        )
        .route("/records/image", post(records::analyze_image_handler))
        .route(
            "/records/{id}",
            put(records::update_record_handler).delete(records::delete_record_handler),
        );

    let document_routes = Router::new()
        .route(
            "/documents",
            get(documents::document_state_handler)
                .post(documents::upload_document_handler)
                .delete(documents::cancel_document_handler),
        )
        .route("/documents/questions", get(documents::question_grid_handler))
        .route("/documents/selection", put(documents::set_selection_handler))
        .route(
            "/documents/selection/{number}",
            post(documents::toggle_question_handler),
        )
        .route("/documents/extract", post(documents::extract_document_handler))
        .route(
            "/documents/review/source",
            post(documents::bulk_source_handler),
        )
        .route(
            "/documents/review/{index}",
            patch(documents::update_review_item_handler),
        )
        .route("/documents/confirm", post(documents::confirm_review_handler));

    let insight_routes = Router::new()
        .route("/analytics/topics", get(analytics::topic_breakdown_handler))
        .route("/analytics/dashboard", get(analytics::dashboard_handler))
        .route(
            "/recall",
            get(recall::list_recall_handler).post(recall::generate_recall_handler),
        )
        .route("/recall/document", get(recall::recall_document_handler))
        .route("/plan", get(plan::get_plan_handler))
        .route("/plan/availability", put(plan::set_availability_handler))
        .route("/plan/generate", post(plan::generate_plan_handler))
        .route("/plan/tasks/{index}/toggle", post(plan::toggle_task_handler));

    Router::new()
        .merge(record_routes)
        .merge(document_routes)
        .merge(insight_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
