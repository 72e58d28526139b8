pub mod analytics;
pub mod document;
pub mod domain;
pub mod extraction;
pub mod filter;
pub mod planner;
pub mod ports;
pub mod recall;
pub mod reply;
pub mod sanitize;
pub mod store;

pub use domain::{
    DailyTask, Difficulty, ErrorRecord, Part, RecallQuestion, RecordDraft, TaskKind, Topic,
};
pub use ports::{
    ErrorExtractionService, PortError, PortResult, RecallGenerationService, StorageService,
    StudyPlanService,
};
pub use store::RecordStore;
