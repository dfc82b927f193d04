pub mod orchestrator;
pub mod session_store;
pub mod workflow_client;

pub use orchestrator::{BeginValidation, CompletedValidation, Orchestrator};
pub use session_store::{SessionStore, SessionStoreError};
pub use workflow_client::WorkflowClient;
