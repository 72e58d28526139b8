//! services/api/src/web/rest.rs
//!
//! Contains the request and response payloads of the REST API and the master
//! definition for the OpenAPI specification.

use crate::web::{analytics, documents, error::ErrorNotice, plan, recall, records};
use math_mentor_core::{
    sanitize::{lenient_string, lenient_string_list, RawRecord},
    DailyTask, ErrorRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        records::list_records_handler,
        records::create_record_handler,
        records::update_record_handler,
        records::delete_record_handler,
        records::analyze_image_handler,
        documents::question_grid_handler,
        documents::document_state_handler,
        documents::cancel_document_handler,
        documents::upload_document_handler,
        documents::set_selection_handler,
        documents::toggle_question_handler,
        documents::extract_document_handler,
        documents::update_review_item_handler,
        documents::bulk_source_handler,
        documents::confirm_review_handler,
        analytics::topic_breakdown_handler,
        analytics::dashboard_handler,
        recall::generate_recall_handler,
        recall::list_recall_handler,
        recall::recall_document_handler,
        plan::get_plan_handler,
        plan::set_availability_handler,
        plan::generate_plan_handler,
        plan::toggle_task_handler,
    ),
    components(
        schemas(
            ErrorNotice,
            RecordInput,
            RecordListResponse,
            SelectionRequest,
            QuestionSlot,
            BulkSourceRequest,
            ConfirmResponse,
            AvailabilityRequest,
            GeneratePlanRequest,
            PlanResponse,
        )
    ),
    tags(
        (name = "MathMentor API", description = "Local endpoints behind the MathMentor study dashboard.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Records
//=========================================================================================

/// Filters of the error log. `All` or an absent value disables a filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// A topic label such as `Oxyz` or `Xác suất`.
    pub topic: Option<String>,
    /// `I`, `II` or `III`.
    pub part: Option<String>,
    /// Case-insensitive text matched against question, source and sub-type.
    pub search: Option<String>,
    /// `All`, `Today`, `Week` or `Month`.
    pub window: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordListResponse {
    /// Size of the whole log before filtering.
    pub total: usize,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<ErrorRecord>,
}

/// Record fields as typed by the student. Used for manual entry, edits and
/// review corrections; omitted fields are left alone or defaulted. A field of
/// the wrong JSON type counts as omitted.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordInput {
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub part: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub topics: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub remedy: Option<String>,
}

impl From<RecordInput> for RawRecord {
    fn from(input: RecordInput) -> Self {
        RawRecord {
            source: input.source,
            question: input.question,
            difficulty: input.difficulty,
            error_type: input.error_type,
            sub_type: input.sub_type,
            part: input.part,
            topics: input.topics,
            remedy: input.remedy,
        }
    }
}

//=========================================================================================
// Documents
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectionRequest {
    /// Question numbers from 1 to 22.
    pub questions: Vec<u32>,
}

/// One cell of the question grid.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSlot {
    pub number: u32,
    /// The label printed on the exam, e.g. `II-3`.
    pub label: String,
    pub part: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkSourceRequest {
    pub source: String,
}

#[derive(Serialize, ToSchema)]
pub struct ConfirmResponse {
    pub added: usize,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<ErrorRecord>,
}

//=========================================================================================
// Analytics and Plan
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopicQuery {
    /// A topic label, or `All`.
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityRequest {
    pub availability: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct GeneratePlanRequest {
    /// Replaces the stored availability before generating.
    pub availability: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PlanResponse {
    #[schema(value_type = Vec<Object>)]
    pub tasks: Vec<DailyTask>,
    pub availability: String,
}
