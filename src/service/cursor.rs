//! Resumable message listing
//!
//! A cursor over a thread's messages, advanced one item at a time. The
//! orchestration loop re-arms the cursor after every item; a new page is
//! fetched only when the buffered one is exhausted.

use std::collections::VecDeque;

use crate::core::{Result, ThreadMessage};
use crate::service::traits::AssistantService;

/// Position within a thread's message sequence
#[derive(Debug)]
pub struct MessageCursor {
    thread_id: String,
    buffered: VecDeque<ThreadMessage>,
    last_seen: Option<String>,
}

impl MessageCursor {
    /// Create a cursor at the start of a thread
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            buffered: VecDeque::new(),
            last_seen: None,
        }
    }

    /// Thread this cursor reads from
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Yield the next message, fetching a page when the buffer is empty.
    ///
    /// Returns `(None, cursor)` once the service has no messages past the
    /// last seen one; callers decide whether to re-arm later.
    pub async fn advance<S>(mut self, service: &S) -> Result<(Option<ThreadMessage>, Self)>
    where
        S: AssistantService + ?Sized,
    {
        if self.buffered.is_empty() {
            let page = service
                .list_messages(&self.thread_id, self.last_seen.as_deref())
                .await?;
            self.buffered.extend(page);
        }

        let item = self.buffered.pop_front();
        if let Some(message) = &item {
            self.last_seen = Some(message.id.clone());
        }
        Ok((item, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_starts_at_thread_head() {
        let cursor = MessageCursor::new("thread_1");
        assert_eq!(cursor.thread_id(), "thread_1");
        assert!(cursor.last_seen.is_none());
    }
}
