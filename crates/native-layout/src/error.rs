//! Layout error types

use thiserror::Error;

/// Upper bound on a single structure descriptor's encoded length.
///
/// Native records are small; anything larger is a malformed descriptor.
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// Structure encoding/decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Buffer shorter than the descriptor's total length
    #[error("buffer too short for {structure}: needed {needed} bytes, have {have}")]
    TooShort {
        structure: &'static str,
        needed: usize,
        have: usize,
    },

    /// Variable-length value does not fit its fixed-width field
    #[error("field {field} overflows: capacity {capacity} units, value needs {actual}")]
    FieldOverflow {
        field: &'static str,
        capacity: usize,
        actual: usize,
    },

    /// Fixed-length byte value is shorter or longer than its field
    #[error("field {field}: expected exactly {expected} bytes, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Text contains a terminator before its end
    #[error("field {field}: embedded terminator at unit {position}")]
    EmbeddedTerminator { field: &'static str, position: usize },

    /// Record lacks a value for a descriptor field
    #[error("missing value for field {0}")]
    MissingField(&'static str),

    /// Record value kind does not match the descriptor field kind
    #[error("field {field}: expected {expected}, got {got}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    /// Integer value does not fit the declared field width
    #[error("field {field}: value {value:#x} does not fit in {width} bytes")]
    ValueOutOfRange {
        field: &'static str,
        value: u64,
        width: usize,
    },

    /// Fixed-width text could not be decoded
    #[error("field {field}: invalid {encoding} text")]
    InvalidText {
        field: &'static str,
        encoding: &'static str,
    },

    /// Descriptor could not be built
    #[error("invalid descriptor {structure}: {reason}")]
    InvalidDescriptor {
        structure: &'static str,
        reason: String,
    },
}

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
