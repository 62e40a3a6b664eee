//! Tandem - Multiplexed Assistant Runtime
//!
//! A Rust runtime that drives a remote assistant service through a
//! completion-order work multiplexer: one loop pulls actions, fans out
//! service operations, polls runs until they settle, and streams the
//! resulting messages back as domain events.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Work**: The fan-in primitive merging in-flight operations
//! - **Service**: Assistant service abstraction with the OpenAI backend
//! - **Agent**: Orchestration loop, entity registries, and hooks
//! - **Store**: Key-value persistence for entity ids
//! - **CLI**: Interactive REPL driver
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tandem::agent::{ActionStream, Orchestrator};
//! use tandem::core::{Action, Config};
//! use tandem::service::OpenAiService;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> tandem::Result<()> {
//!     let config = Config::load();
//!     let service = Arc::new(OpenAiService::from_config(&config, "sk-..."));
//!     let (events, mut sink) = mpsc::channel(32);
//!
//!     let actions: ActionStream = Box::pin(futures::stream::iter([Action::CreateAgent {
//!         agent_id: None,
//!         name: "alice".to_string(),
//!         instructions: "be helpful".to_string(),
//!     }]));
//!
//!     let orchestrator = Orchestrator::new(service, config, events);
//!     tokio::spawn(async move {
//!         while let Some(event) = sink.recv().await {
//!             println!("{:?}", event);
//!         }
//!     });
//!     orchestrator.run(actions).await
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod service;
pub mod store;
pub mod work;

// Re-export commonly used items
pub use agent::Orchestrator;
pub use cli::Repl;
pub use core::{Config, Result, TandemError};
pub use work::{ErrorPolicy, WorkSet};
