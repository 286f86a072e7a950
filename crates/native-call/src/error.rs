//! Error types for native calls

use crate::status::StatusCode;
use native_layout::LayoutError;
use thiserror::Error;

/// Classification of a native failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Output buffer too small; the only kind retried automatically
    InsufficientBuffer,
    NotFound,
    AccessDenied,
    InvalidHandle,
    Aborted,
    Unknown,
}

/// Classified failure of a native operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed: {message} ({status})")]
pub struct NativeError {
    kind: ErrorKind,
    status: StatusCode,
    message: String,
    operation: String,
}

impl NativeError {
    pub fn new(
        kind: ErrorKind,
        status: StatusCode,
        message: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Raw numeric code, meaningful together with `status().space()`
    pub fn raw_code(&self) -> u32 {
        self.status.raw()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

/// Any failure surfaced by the marshalling layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Native(#[from] NativeError),

    /// Primary failure plus a failed cleanup that happened while unwinding it
    #[error("{primary} (cleanup also failed: {cleanup})")]
    WithCleanup {
        primary: Box<MarshalError>,
        cleanup: NativeError,
    },
}

impl MarshalError {
    /// Attach a cleanup failure without replacing this error
    pub fn with_cleanup(self, cleanup: NativeError) -> Self {
        MarshalError::WithCleanup {
            primary: Box::new(self),
            cleanup,
        }
    }

    /// The error that caused the operation to fail
    pub fn primary(&self) -> &MarshalError {
        match self {
            MarshalError::WithCleanup { primary, .. } => primary.primary(),
            other => other,
        }
    }

    pub fn cleanup(&self) -> Option<&NativeError> {
        match self {
            MarshalError::WithCleanup { cleanup, .. } => Some(cleanup),
            _ => None,
        }
    }

    /// Kind of the primary error, if it is a native failure
    pub fn native_kind(&self) -> Option<ErrorKind> {
        match self.primary() {
            MarshalError::Native(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Result type for marshalling operations
pub type Result<T> = std::result::Result<T, MarshalError>;
