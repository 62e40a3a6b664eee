//! Pluggable handling for appended messages
//!
//! What should happen to a user message appended to an existing thread is
//! unresolved upstream, so the loop routes it through a hook instead of
//! hard-coding a behavior. The default hook drops the message.

use async_trait::async_trait;
use tracing::debug;

use crate::core::Result;
use crate::service::AssistantService;

/// Handles `AppendMessage` actions on behalf of the orchestration loop
#[async_trait]
pub trait AppendHook: Send + Sync {
    /// Handle a user message destined for a thread
    async fn append(
        &self,
        service: &dyn AssistantService,
        thread_id: &str,
        text: &str,
    ) -> Result<()>;
}

/// Default hook: drop appended messages
pub struct DropAppends;

#[async_trait]
impl AppendHook for DropAppends {
    async fn append(
        &self,
        _service: &dyn AssistantService,
        thread_id: &str,
        _text: &str,
    ) -> Result<()> {
        debug!(thread_id = %thread_id, "dropping appended message");
        Ok(())
    }
}

/// Forward appended messages to the service as user messages
pub struct ForwardAppends;

#[async_trait]
impl AppendHook for ForwardAppends {
    async fn append(
        &self,
        service: &dyn AssistantService,
        thread_id: &str,
        text: &str,
    ) -> Result<()> {
        service.create_message(thread_id, text).await?;
        Ok(())
    }
}
