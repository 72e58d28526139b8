//! crates/math_mentor_core/src/recall.rs
//!
//! Requests active-recall questions for the weakest topics.

use crate::domain::{RecallQuestion, Topic};
use crate::ports::{PortError, RecallGenerationService};
use crate::reply::{parse_recall_reply, ReplyError};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    #[error("There are no recorded mistakes to build review material from yet.")]
    NoWeakTopics,
    #[error("The assistant could not be reached: {0}")]
    Collaborator(#[from] PortError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error("The assistant returned no review questions.")]
    NothingGenerated,
}

#[derive(Clone)]
pub struct RecallGenerator {
    service: Arc<dyn RecallGenerationService>,
}

impl RecallGenerator {
    pub fn new(service: Arc<dyn RecallGenerationService>) -> Self {
        Self { service }
    }

    pub async fn generate(
        &self,
        weak_topics: &[Topic],
    ) -> Result<Vec<RecallQuestion>, RecallError> {
        if weak_topics.is_empty() {
            return Err(RecallError::NoWeakTopics);
        }
        let reply = self.service.generate_recall_questions(weak_topics).await?;
        let questions = parse_recall_reply(&reply).into_result()?;
        if questions.is_empty() {
            return Err(RecallError::NothingGenerated);
        }
        info!("Generated {} recall questions.", questions.len());
        Ok(questions)
    }
}
