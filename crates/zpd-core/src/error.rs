//! Error types for the engine core
//!
//! Expected conditions (missing patch file, stale handle, list index out of
//! range) and violated calling conventions (perform before prepare, freeing a
//! selected instance) each get their own variant so hosts can match on them.
//! Sending through an unbound tie is never an error.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during engine operations
#[derive(Debug, Error)]
pub enum ZpdError {
    /// List access past the current size
    #[error("Index {index} out of range for list of size {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Patch file could not be resolved through the search path
    #[error("Patch '{name}' not found (search dir: '{search_dir}')")]
    PatchNotFound { name: String, search_dir: String },

    /// Patch file exists but could not be read
    #[error("Failed to open patch '{path}': {reason}")]
    PatchOpenFailed { path: PathBuf, reason: String },

    /// Patch file is not in the expected text format
    #[error("Invalid patch '{path}' at record {line}: {reason}")]
    InvalidPatch {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Patch handle refers to a patch that has been closed
    #[error("Patch handle is stale (patch was closed)")]
    StalePatch,

    /// perform called without a matching prepare
    #[error("DSP is not prepared on this instance")]
    DspNotPrepared,

    /// perform called with a sample count different from the prepared block size
    #[error("Block size mismatch: prepared for {expected} samples, got {actual}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    /// Caller buffer shorter than the block
    #[error("Buffer for channel {channel} holds {actual} samples, expected {expected}")]
    BufferTooShort {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    /// Rejected DSP configuration
    #[error("Invalid DSP configuration: {0}")]
    InvalidDspConfig(String),

    /// Instance is the current selection and cannot be freed
    #[error("Instance is selected as current and cannot be freed")]
    InstanceSelected,

    /// Instance is still referenced or locked by an in-flight call
    #[error("Instance is still in use")]
    InstanceBusy,

    /// Command queue has no room left
    #[error("Command queue is full")]
    QueueFull,
}

/// Result type for engine operations
pub type ZpdResult<T> = Result<T, ZpdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ZpdError::PatchNotFound {
            name: "test.pd".to_string(),
            search_dir: "/home/maison".to_string(),
        };
        assert!(err.to_string().contains("test.pd"));
        assert!(err.to_string().contains("/home/maison"));

        let err = ZpdError::BlockSizeMismatch {
            expected: 64,
            actual: 128,
        };
        assert!(err.to_string().contains("64"));
        assert!(err.to_string().contains("128"));
    }

    #[test]
    fn test_index_error_is_distinct_from_none_atom() {
        let err = ZpdError::IndexOutOfRange { index: 3, len: 2 };
        assert!(matches!(err, ZpdError::IndexOutOfRange { index: 3, len: 2 }));
    }
}
