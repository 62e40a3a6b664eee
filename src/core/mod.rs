//! Core module - shared types, configuration, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, Config, ServiceConfig, StoreConfig};
pub use error::{Result, TandemError};
pub use types::{
    Action, Assistant, Event, MessageContent, Run, RunStatus, TextContent, ThreadMessage, ThreadRef,
};
