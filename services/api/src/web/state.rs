//! services/api/src/web/state.rs
//!
//! Defines the application's shared state: the record store, the transient
//! document and recall state, and the core services built over the adapters.

use crate::config::Config;
use math_mentor_core::{
    extraction::{DocumentFlow, ExtractionOrchestrator},
    planner::StudyPlanner,
    ports::{ErrorExtractionService, RecallGenerationService, StorageService, StudyPlanService},
    recall::RecallGenerator,
    RecallQuestion, RecordStore,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// Busy Flags
//=========================================================================================

/// Marks one AI-backed action as in flight. A second identical request is
/// turned away instead of queued; different actions do not block each other.
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    /// Returns a guard if the action was idle. The flag clears when the guard drops.
    pub fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.0))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct BusyFlags {
    pub image: BusyFlag,
    pub document: BusyFlag,
    pub recall: BusyFlag,
    pub plan: BusyFlag,
}

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Mutex<RecordStore>,
    pub documents: Mutex<DocumentFlow>,
    /// The last generated recall set. Not persisted.
    pub recall_questions: Mutex<Vec<RecallQuestion>>,
    pub extraction: ExtractionOrchestrator,
    pub recall: RecallGenerator,
    pub planner: StudyPlanner,
    pub busy: BusyFlags,
}

impl AppState {
    /// Loads the persisted store and wires the core services to their adapters.
    pub async fn new(
        config: Arc<Config>,
        storage: Arc<dyn StorageService>,
        extraction_adapter: Arc<dyn ErrorExtractionService>,
        recall_adapter: Arc<dyn RecallGenerationService>,
        plan_adapter: Arc<dyn StudyPlanService>,
    ) -> Self {
        let store = RecordStore::load(storage).await;
        Self {
            config,
            store: Mutex::new(store),
            documents: Mutex::new(DocumentFlow::default()),
            recall_questions: Mutex::new(Vec::new()),
            extraction: ExtractionOrchestrator::new(extraction_adapter),
            recall: RecallGenerator::new(recall_adapter),
            planner: StudyPlanner::new(plan_adapter),
            busy: BusyFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_flag_releases_on_drop() {
        let flag = BusyFlag::default();
        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }
}
