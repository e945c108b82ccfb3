//! Error definitions for the mapping module

use thiserror::Error;

/// Errors raised while editing or applying button mappings
#[derive(Debug, Error)]
pub enum MappingError {
    /// A bind call without any button bits
    #[error("Cannot bind key '{0}' to an empty button mask")]
    EmptyBinding(String),

    /// Key identifier could not be used as a binding target
    #[error("Invalid key identifier: {0}")]
    InvalidKey(String),

    /// Raw bits outside the known button set
    #[error("Unknown button bits: {0:#04x}")]
    UnknownBits(u8),

    /// Unknown discrete event name
    #[error("Unknown event name: {0}")]
    UnknownEvent(String),
}
