//! Store module - key-value persistence
//!
//! Remembers entity ids across restarts. The file backend is the default;
//! the trait keeps other backends substitutable.

pub mod file;

use async_trait::async_trait;

use crate::core::Result;

pub use file::FileStore;

/// Trait for key-value persistence backends
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under a key
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
