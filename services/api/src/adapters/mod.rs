pub mod extraction_llm;
pub mod plan_llm;
pub mod recall_llm;
pub mod storage;

pub use extraction_llm::OpenAiExtractionAdapter;
pub use plan_llm::OpenAiPlanAdapter;
pub use recall_llm::OpenAiRecallAdapter;
pub use storage::FileStorageAdapter;
