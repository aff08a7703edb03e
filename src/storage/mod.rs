//! Per-file monitoring state and the backends that hold it
//!
//! Every watched file owns one [`MonitorState`] keyed by its path. Backends
//! implement [`StateStore`] and are selected by name through the
//! [`BackendRegistry`].

pub mod file;
pub mod memory;
pub mod registry;
pub mod state;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use registry::BackendRegistry;
pub use state::MonitorState;

/// Capability set every state backend provides
///
/// A `get` that follows a `set` for the same key in the same process must
/// observe the written value. Calls for different keys must not block each
/// other; calls for the same key are serialized by the backend.
pub trait StateStore: Send + Sync {
    /// Read the state stored for a file, if any
    fn get(&self, key: &str) -> Result<Option<MonitorState>, StoreError>;

    /// Write the state for a file, replacing any previous value
    fn set(&self, key: &str, state: &MonitorState) -> Result<(), StoreError>;

    /// Remove the state for a file. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// List all stored keys
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Backend identity, used in diagnostics
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error for '{key}': {reason}")]
    Deserialization { key: String, reason: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
