//! Work module - the completion-order fan-in primitive

pub mod multiplexer;

pub use multiplexer::{ErrorPolicy, WorkSet};
