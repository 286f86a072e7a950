//! Human-readable status messages
//!
//! Message text comes from the operating system's message-formatting facility
//! when one is available (`FormatMessageW` on Windows, `strerror` via
//! `std::io::Error` for errno), with a built-in table as fallback.

use crate::status::{codes, StatusCode, StatusSpace};

/// Source of descriptive text for status codes
pub trait MessageSource: Send + Sync {
    /// Text for `status`, or `None` if this source does not know it
    fn lookup(&self, status: StatusCode) -> Option<String>;
}

/// Fixed English texts for the codes this crate classifies
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinMessages;

impl MessageSource for BuiltinMessages {
    fn lookup(&self, status: StatusCode) -> Option<String> {
        let text = match (status.space(), status.raw()) {
            (StatusSpace::Win32, codes::ERROR_SUCCESS) => "The operation completed successfully.",
            (StatusSpace::Win32, codes::ERROR_FILE_NOT_FOUND) => "The system cannot find the file specified.",
            (StatusSpace::Win32, codes::ERROR_PATH_NOT_FOUND) => "The system cannot find the path specified.",
            (StatusSpace::Win32, codes::ERROR_ACCESS_DENIED) => "Access is denied.",
            (StatusSpace::Win32, codes::ERROR_INVALID_HANDLE) => "The handle is invalid.",
            (StatusSpace::Win32, codes::ERROR_NO_MORE_FILES) => "There are no more files.",
            (StatusSpace::Win32, codes::ERROR_INVALID_PARAMETER) => "The parameter is incorrect.",
            (StatusSpace::Win32, codes::ERROR_INSUFFICIENT_BUFFER) => {
                "The data area passed to a system call is too small."
            }
            (StatusSpace::Win32, codes::ERROR_MORE_DATA) => "More data is available.",
            (StatusSpace::Win32, codes::ERROR_NO_MORE_ITEMS) => "No more data is available.",
            (StatusSpace::Win32, codes::ERROR_OPERATION_ABORTED) => {
                "The I/O operation has been aborted because of either a thread exit or an application request."
            }
            (StatusSpace::Win32, codes::ERROR_NOT_FOUND) => "Element not found.",
            (StatusSpace::Win32, codes::ERROR_CANCELLED) => "The operation was canceled by the user.",
            (StatusSpace::Win32, codes::ERROR_TIMEOUT) => "This operation returned because the timeout period expired.",
            (StatusSpace::Win32, codes::ERROR_UNSUPPORTED_TYPE) => "Data of this type is not supported.",
            (StatusSpace::HResult, codes::S_OK) => "The operation completed successfully.",
            (StatusSpace::HResult, codes::E_ABORT) => "Operation aborted",
            (StatusSpace::HResult, codes::E_FAIL) => "Unspecified error",
            (StatusSpace::HResult, codes::E_POINTER) => "Invalid pointer",
            (StatusSpace::HResult, codes::E_ACCESSDENIED) => "Access is denied.",
            (StatusSpace::HResult, codes::E_HANDLE) => "The handle is invalid.",
            (StatusSpace::HResult, codes::E_NOT_SUFFICIENT_BUFFER) => {
                "The data area passed to a system call is too small."
            }
            (StatusSpace::HResult, codes::TYPE_E_ELEMENTNOTFOUND) => "Element not found.",
            (StatusSpace::HResult, codes::REGDB_E_CLASSNOTREG) => "Class not registered",
            (StatusSpace::Errno, 0) => "Success",
            _ => return None,
        };
        Some(text.to_string())
    }
}

/// The operating system's own message table
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMessages;

impl MessageSource for SystemMessages {
    fn lookup(&self, status: StatusCode) -> Option<String> {
        match status.space() {
            StatusSpace::Errno => {
                let text = std::io::Error::from_raw_os_error(status.raw() as i32).to_string();
                // std appends " (os error N)"
                let text = text
                    .rsplit_once(" (os error")
                    .map(|(msg, _)| msg.to_string())
                    .unwrap_or(text);
                Some(text)
            }
            #[cfg(windows)]
            StatusSpace::Win32 | StatusSpace::HResult => crate::platform::format_message(status.raw()),
            #[cfg(not(windows))]
            StatusSpace::Win32 | StatusSpace::HResult => None,
        }
    }
}

/// System messages first, built-in table second
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl MessageSource for DefaultMessages {
    fn lookup(&self, status: StatusCode) -> Option<String> {
        SystemMessages
            .lookup(status)
            .or_else(|| BuiltinMessages.lookup(status))
    }
}

/// Last-resort text when no source knows a code
pub fn fallback_message(status: StatusCode) -> String {
    format!("unknown status ({})", status)
}
