//! Recoverable error types
//!
//! Only resource exhaustion and configuration/loading problems are errors.
//! Contract violations (double release, foreign pointers, use after uninit)
//! are assertions and never show up here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Allocation failures surfaced to the caller
///
/// The C ABI maps every variant to a null pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// `count * size` plus the header does not fit in `usize`
    #[error("allocation size overflow: {count} elements of {size} bytes")]
    SizeOverflow { count: usize, size: usize },

    /// The raw allocator returned no memory
    #[error("out of memory: raw allocator refused {requested} bytes")]
    OutOfMemory { requested: usize },
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Plugin loader errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// Path contains an interior nul byte or is not valid UTF-8
    #[error("invalid plugin path")]
    InvalidPath,

    #[error("failed to open plugin: {0}")]
    Open(String),

    #[error("plugin entry symbol `{symbol}` not found")]
    MissingSymbol { symbol: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_error_messages_carry_sizes() {
        let err = AllocError::SizeOverflow { count: 3, size: usize::MAX };
        assert!(err.to_string().contains("3 elements"));

        let err = AllocError::OutOfMemory { requested: 4096 };
        assert_eq!(err.to_string(), "out of memory: raw allocator refused 4096 bytes");
    }

    #[test]
    fn missing_symbol_names_symbol() {
        let err = PluginError::MissingSymbol { symbol: "GetPjrtApi".into() };
        assert!(err.to_string().contains("GetPjrtApi"));
    }
}
