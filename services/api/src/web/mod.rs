pub mod analytics;
pub mod documents;
pub mod error;
pub mod plan;
pub mod recall;
pub mod records;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the router builder so the binary and the integration tests
// assemble the exact same application.
pub use router::build_router;
pub use state::AppState;
