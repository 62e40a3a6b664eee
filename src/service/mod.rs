//! Service module - assistant service backends
//!
//! Provides the service abstraction with the OpenAI Assistants API as the
//! primary implementation.

pub mod cursor;
pub mod openai;
pub mod traits;

pub use cursor::MessageCursor;
pub use openai::OpenAiService;
pub use traits::{AssistantService, CreateAssistant};
