//! CLI module - interactive driver around the orchestration loop

pub mod repl;

pub use repl::Repl;
