//! Shared types used across Tandem modules
//!
//! Contains the action/event unions and the assistant service data model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A request produced upstream for the orchestration loop to consume.
///
/// Actions are immutable: created by an action source, consumed exactly
/// once by the loop, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Create a new agent, or retrieve it when an id is already known
    CreateAgent {
        /// Known id from a previous session, if any
        agent_id: Option<String>,
        /// Human-facing name for the agent
        name: String,
        /// System instructions the agent is created with
        instructions: String,
    },
    /// Start a new conversation thread (and its first run) for an agent
    StartThread { agent_id: String },
    /// Append a user message to an existing thread
    AppendMessage { thread_id: String, text: String },
    /// Upload a local file and attach it to an agent
    IngestFile { agent_id: String, path: PathBuf },
}

/// A domain event emitted by the orchestration loop.
///
/// Emitted at most once per underlying occurrence and consumed in
/// emission order by the event sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A brand-new agent was created on the service
    AgentCreated { agent_id: String, name: String },
    /// An agent known from a previous session was retrieved
    AgentRetrieved { agent_id: String, name: String },
    /// A conversation thread was created
    ThreadCreated { agent_id: String, thread_id: String },
    /// A run was started on a thread
    RunCreated {
        agent_id: String,
        thread_id: String,
        run_id: String,
    },
    /// A run reached its terminal success state
    RunCompleted {
        agent_id: String,
        thread_id: String,
        run_id: String,
        status: RunStatus,
    },
    /// A run reported a status the loop does not act on
    RunStatusUnknown {
        agent_id: String,
        thread_id: String,
        run_id: String,
        status: RunStatus,
    },
    /// A message was observed on a thread
    MessageReceived {
        agent_id: String,
        thread_id: String,
        role: String,
        text: String,
    },
}

/// A thread as remembered by the driver, keyed to the agent that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    pub agent_id: String,
    pub thread_id: String,
}

/// An agent as known to the remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Files attached for retrieval, accumulated across ingests
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// A long-running operation executing an agent against a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub status: RunStatus,
}

/// Status reported by the service for a run.
///
/// Only `Completed` and `InProgress` drive the loop; everything else is
/// surfaced as [`Event::RunStatusUnknown`] and not polled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// Catch-all for statuses this crate does not know about
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A message on a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub assistant_id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// One content element of a message.
///
/// The service may introduce content kinds the loop does not recognize;
/// those deserialize with `text: None` and are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
}

/// Text payload within a message content element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
}

impl ThreadMessage {
    /// Iterate the text values of this message, skipping other content kinds
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|c| {
            if c.kind == "text" {
                c.text.as_ref().map(|t| t.value.as_str())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_wire_format() {
        let status: RunStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(status, RunStatus::InProgress);
        assert_eq!(status.to_string(), "in_progress");
    }

    #[test]
    fn test_message_text_parts_skip_unknown_kinds() {
        let msg: ThreadMessage = serde_json::from_value(serde_json::json!({
            "id": "msg_1",
            "thread_id": "thread_1",
            "role": "assistant",
            "content": [
                {"type": "image_file", "image_file": {"file_id": "file_1"}},
                {"type": "text", "text": {"value": "hello"}},
            ],
        }))
        .unwrap();

        let parts: Vec<&str> = msg.text_parts().collect();
        assert_eq!(parts, vec!["hello"]);
    }

    #[test]
    fn test_action_round_trip() {
        let action = Action::CreateAgent {
            agent_id: None,
            name: "alice".to_string(),
            instructions: "be helpful".to_string(),
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("create_agent"));
    }
}
