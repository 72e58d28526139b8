//! crates/math_mentor_core/src/planner.rs
//!
//! Requests a daily study schedule around the student's weak topics and
//! availability. The system alone decides completion state, so every
//! returned task starts out not completed.

use crate::domain::{DailyTask, Topic};
use crate::ports::{PortError, StudyPlanService};
use crate::reply::{parse_plan_reply, ReplyError};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("The assistant could not be reached: {0}")]
    Collaborator(#[from] PortError),
    #[error(transparent)]
    Reply(#[from] ReplyError),
    #[error("The assistant returned an empty schedule.")]
    EmptySchedule,
}

#[derive(Clone)]
pub struct StudyPlanner {
    service: Arc<dyn StudyPlanService>,
}

impl StudyPlanner {
    pub fn new(service: Arc<dyn StudyPlanService>) -> Self {
        Self { service }
    }

    /// An empty schedule counts as a failure so the caller keeps the
    /// existing task list.
    pub async fn generate_plan(
        &self,
        weak_topics: &[Topic],
        availability: &str,
    ) -> Result<Vec<DailyTask>, PlanError> {
        let reply = self
            .service
            .generate_study_plan(weak_topics, availability)
            .await?;
        let mut tasks = parse_plan_reply(&reply).into_result()?;
        if tasks.is_empty() {
            return Err(PlanError::EmptySchedule);
        }
        for task in &mut tasks {
            task.completed = false;
        }
        info!("Generated a study plan with {} tasks.", tasks.len());
        Ok(tasks)
    }
}
