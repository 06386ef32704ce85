//! # Error Types
//!
//! Defines error types used across subsystems.

use thiserror::Error;

/// Errors raised while encoding or decoding fixed-layout binary data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// An identifier was built from a byte slice of the wrong width.
    #[error("Malformed {kind}: expected {expected} bytes, got {actual}")]
    MalformedIdentifier {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A fixed-width field could not be read in full.
    #[error("Truncated message: needed {needed} bytes, {remaining} remaining")]
    TruncatedMessage { needed: usize, remaining: usize },

    /// A collection or byte string does not fit its 16-bit length prefix.
    #[error("Length {len} does not fit a 16-bit prefix")]
    TooLong { len: usize },

    /// Bytes were left over after a complete message was decoded.
    #[error("Trailing bytes after message: {count}")]
    TrailingBytes { count: usize },

    /// The transport envelope carried a message type nobody decodes.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    /// An enumerated field carried a tag outside its range.
    #[error("Invalid {field} tag: {tag}")]
    InvalidTag { field: &'static str, tag: u8 },
}

/// Errors parsing the external (hex) representation of an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Wrong address length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Unknown address kind: {0}")]
    UnknownKind(u8),
}

impl From<WireError> for AddressParseError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InvalidTag { tag, .. } => AddressParseError::UnknownKind(tag),
            WireError::MalformedIdentifier {
                expected, actual, ..
            } => AddressParseError::WrongLength { expected, actual },
            other => AddressParseError::InvalidHex(other.to_string()),
        }
    }
}
