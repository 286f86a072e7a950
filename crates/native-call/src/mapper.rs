//! Status classification
//!
//! `ErrorMapper` turns a space-tagged status code into a `NativeError`. The
//! kind comes from a static table per space; the message from a
//! `MessageSource`.

use crate::call::Outcome;
use crate::error::{ErrorKind, NativeError};
use crate::message::{fallback_message, DefaultMessages, MessageSource};
use crate::status::{codes, HResult, StatusCode, StatusSpace};
use std::fmt;
use std::sync::Arc;

/// Kind for a Win32 error code
fn classify_win32(code: u32) -> ErrorKind {
    match code {
        codes::ERROR_INSUFFICIENT_BUFFER | codes::ERROR_MORE_DATA => ErrorKind::InsufficientBuffer,
        codes::ERROR_FILE_NOT_FOUND
        | codes::ERROR_PATH_NOT_FOUND
        | codes::ERROR_NO_MORE_FILES
        | codes::ERROR_MOD_NOT_FOUND
        | codes::ERROR_PROC_NOT_FOUND
        | codes::ERROR_NO_MORE_ITEMS
        | codes::ERROR_SERVICE_DOES_NOT_EXIST
        | codes::ERROR_NOT_FOUND
        | codes::ERROR_RESOURCE_TYPE_NOT_FOUND => ErrorKind::NotFound,
        codes::ERROR_ACCESS_DENIED => ErrorKind::AccessDenied,
        codes::ERROR_INVALID_HANDLE => ErrorKind::InvalidHandle,
        codes::ERROR_OPERATION_ABORTED | codes::ERROR_CANCELLED | codes::ERROR_TIMEOUT => {
            ErrorKind::Aborted
        }
        _ => ErrorKind::Unknown,
    }
}

/// Kind for a failure HRESULT
fn classify_hresult(hr: HResult) -> ErrorKind {
    if hr.facility() == HResult::FACILITY_WIN32 {
        return classify_win32(hr.code() as u32);
    }
    match hr.0 {
        codes::DISP_E_BUFFERTOOSMALL => ErrorKind::InsufficientBuffer,
        codes::TYPE_E_ELEMENTNOTFOUND | codes::STG_E_FILENOTFOUND | codes::REGDB_E_CLASSNOTREG => {
            ErrorKind::NotFound
        }
        codes::STG_E_ACCESSDENIED => ErrorKind::AccessDenied,
        codes::E_ABORT | codes::RPC_E_CALL_CANCELED => ErrorKind::Aborted,
        _ => ErrorKind::Unknown,
    }
}

/// Kind for an errno value
fn classify_errno(code: i32) -> ErrorKind {
    match code {
        codes::ERANGE => return ErrorKind::InsufficientBuffer,
        codes::EBADF => return ErrorKind::InvalidHandle,
        _ => {}
    }
    match std::io::Error::from_raw_os_error(code).kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound,
        std::io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied,
        std::io::ErrorKind::Interrupted => ErrorKind::Aborted,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a failing status; the space decides which table applies
pub fn classify(status: StatusCode) -> ErrorKind {
    match status.space() {
        StatusSpace::Win32 => classify_win32(status.raw()),
        StatusSpace::HResult => classify_hresult(HResult(status.raw())),
        StatusSpace::Errno => classify_errno(status.raw() as i32),
    }
}

/// Converts native status codes into `NativeError`s
#[derive(Clone)]
pub struct ErrorMapper {
    messages: Arc<dyn MessageSource>,
}

impl ErrorMapper {
    /// Mapper using system messages with the built-in table as fallback
    pub fn new() -> Self {
        Self::with_messages(DefaultMessages)
    }

    pub fn with_messages<M: MessageSource + 'static>(messages: M) -> Self {
        Self {
            messages: Arc::new(messages),
        }
    }

    /// Resolve the message text for `status`
    pub fn message(&self, status: StatusCode) -> String {
        self.messages
            .lookup(status)
            .map(|text| text.trim().to_string())
            .unwrap_or_else(|| fallback_message(status))
    }

    /// Build the error for a status already known to be a failure
    pub fn from_status(&self, operation: &str, status: StatusCode) -> NativeError {
        let kind = if status.is_success() {
            ErrorKind::Unknown
        } else {
            classify(status)
        };
        NativeError::new(kind, status, self.message(status), operation)
    }

    /// `Ok` for any success status, the mapped error otherwise
    pub fn check(&self, operation: &str, status: StatusCode) -> Result<(), NativeError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(self.from_status(operation, status))
        }
    }

    /// Build the error from the last-error value captured with the call
    ///
    /// A zero last error after a failed call still yields an error, of kind
    /// `Unknown`, since the call itself reported failure.
    pub fn from_last_error<T>(&self, operation: &str, outcome: &Outcome<T>) -> NativeError {
        self.from_status(operation, outcome.last_error)
    }

    /// For calls that return a success flag and report details through the
    /// last-error channel
    pub fn check_flag(&self, operation: &str, outcome: Outcome<bool>) -> Result<(), NativeError> {
        if outcome.value {
            Ok(())
        } else {
            Err(self.from_last_error(operation, &outcome))
        }
    }
}

impl Default for ErrorMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMapper").finish_non_exhaustive()
    }
}
