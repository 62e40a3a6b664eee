//! Assistant service abstraction
//!
//! The orchestration loop only needs three operation families from the
//! remote service: create-or-retrieve for top-level entities, start a
//! long-running operation, and fetch status / list results for a handle.
//! Any concrete API satisfying these shapes is substitutable.

use async_trait::async_trait;

use crate::core::{Assistant, Result, Run, ThreadMessage};

/// Parameters for creating a new agent on the service
#[derive(Debug, Clone)]
pub struct CreateAssistant {
    /// Human-facing name
    pub name: String,
    /// System instructions
    pub instructions: String,
    /// Model the agent runs on
    pub model: String,
}

/// Trait for assistant service backends
#[async_trait]
pub trait AssistantService: Send + Sync + 'static {
    /// Fetch an agent by id.
    ///
    /// Returns [`TandemError::NotFound`](crate::core::TandemError::NotFound)
    /// when the id is unknown to the service; callers performing
    /// create-or-retrieve treat that as "must create".
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant>;

    /// Create a new agent
    async fn create_assistant(&self, request: CreateAssistant) -> Result<Assistant>;

    /// Create a thread and immediately start a run on it
    async fn create_thread_and_run(&self, assistant_id: &str) -> Result<Run>;

    /// Fetch the current status of a run
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List messages on a thread, oldest first, after the given cursor
    async fn list_messages(
        &self,
        thread_id: &str,
        after: Option<&str>,
    ) -> Result<Vec<ThreadMessage>>;

    /// Upload a file for retrieval use; returns the file id
    async fn upload_file(&self, filename: &str, bytes: Vec<u8>) -> Result<String>;

    /// Attach an uploaded file to an agent; returns the updated agent
    async fn attach_file(&self, assistant_id: &str, file_id: &str) -> Result<Assistant>;

    /// Append a user message to a thread
    async fn create_message(&self, thread_id: &str, text: &str) -> Result<ThreadMessage>;
}
