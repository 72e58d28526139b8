//! crates/math_mentor_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on. The AI
//! collaborator and the local key-value storage both sit behind these
//! traits, so the core never knows which provider or which disk layout is
//! in use.

use async_trait::async_trait;
use crate::domain::Topic;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Best-effort persistence keyed by fixed string identifiers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Returns the stored value, or `None` when the key was never written.
    async fn load_item(&self, key: &str) -> PortResult<Option<String>>;

    async fn save_item(&self, key: &str, value: &str) -> PortResult<()>;
}

/// Turns photographed or scanned exam questions into record-shaped JSON.
///
/// Implementations return the collaborator's raw reply text; parsing and
/// sanitization happen in the core.
#[async_trait]
pub trait ErrorExtractionService: Send + Sync {
    /// Analyzes a single photographed question.
    async fn analyze_image(&self, image: &[u8], mime_type: &str) -> PortResult<String>;

    /// Extracts one record per requested question number from a PDF exam.
    async fn extract_document(&self, document: &[u8], question_numbers: &[u32])
        -> PortResult<String>;
}

#[async_trait]
pub trait RecallGenerationService: Send + Sync {
    /// Generates active-recall questions covering the given topics.
    async fn generate_recall_questions(&self, topics: &[Topic]) -> PortResult<String>;
}

#[async_trait]
pub trait StudyPlanService: Send + Sync {
    /// Generates a 24h schedule around the student's availability.
    async fn generate_study_plan(
        &self,
        weak_topics: &[Topic],
        availability: &str,
    ) -> PortResult<String>;
}
