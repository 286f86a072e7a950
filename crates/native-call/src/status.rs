//! Native status codes
//!
//! The same integer means different things depending on which API produced
//! it: `5` is `ERROR_ACCESS_DENIED` from a Win32 call, a success value as an
//! HRESULT, and `EIO` as an errno. A `StatusCode` therefore always carries the
//! space it came from, supplied by the caller, never guessed from the bits.
//!
//! HRESULT bit layout (four packed fields):
//!
//! ```text
//!  31  30  29  28  27  26 ........ 16  15 ............. 0
//! | S | R | C | N | X |   facility    |       code       |
//! ```

use std::fmt;

/// Numeric space a status code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusSpace {
    /// Generic numeric error codes (`GetLastError`, `LSTATUS`)
    Win32,
    /// Packed severity/customer/facility/code result codes
    HResult,
    /// POSIX `errno`
    Errno,
}

/// Raw native status tagged with its space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode {
    space: StatusSpace,
    raw: u32,
}

impl StatusCode {
    pub const fn new(space: StatusSpace, raw: u32) -> Self {
        Self { space, raw }
    }

    pub const fn win32(code: u32) -> Self {
        Self::new(StatusSpace::Win32, code)
    }

    pub const fn hresult(code: u32) -> Self {
        Self::new(StatusSpace::HResult, code)
    }

    pub const fn errno(code: i32) -> Self {
        Self::new(StatusSpace::Errno, code as u32)
    }

    /// Success in the space the host's last-error channel uses
    pub const fn success() -> Self {
        Self::new(last_error_space(), 0)
    }

    /// Value read from the host's last-error channel
    pub const fn last_error(code: i32) -> Self {
        Self::new(last_error_space(), code as u32)
    }

    pub fn space(&self) -> StatusSpace {
        self.space
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Zero is success in every space; HRESULTs also succeed with the
    /// severity bit clear (`S_FALSE` and friends)
    pub fn is_success(&self) -> bool {
        match self.space {
            StatusSpace::Win32 | StatusSpace::Errno => self.raw == 0,
            StatusSpace::HResult => !HResult(self.raw).is_failure(),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.space {
            StatusSpace::Win32 => write!(f, "Win32 error {}", self.raw),
            StatusSpace::HResult => write!(f, "HRESULT 0x{:08X}", self.raw),
            StatusSpace::Errno => write!(f, "errno {}", self.raw as i32),
        }
    }
}

/// Space of the host's ambient last-error channel
pub const fn last_error_space() -> StatusSpace {
    if cfg!(windows) {
        StatusSpace::Win32
    } else {
        StatusSpace::Errno
    }
}

/// Field view of a packed HRESULT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HResult(pub u32);

impl HResult {
    /// `FACILITY_WIN32`
    pub const FACILITY_WIN32: u16 = 7;

    /// `HRESULT_FROM_WIN32`: wrap a Win32 code as a failure HRESULT
    pub const fn from_win32(code: u32) -> Self {
        if code as i32 <= 0 {
            Self(code)
        } else {
            Self((code & 0xFFFF) | ((Self::FACILITY_WIN32 as u32) << 16) | 0x8000_0000)
        }
    }

    /// Severity bit
    pub const fn is_failure(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Customer-defined bit
    pub const fn is_customer(&self) -> bool {
        self.0 & 0x2000_0000 != 0
    }

    pub const fn facility(&self) -> u16 {
        ((self.0 >> 16) & 0x7FF) as u16
    }

    pub const fn code(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::hresult(self.0)
    }
}

/// Well-known status values
pub mod codes {
    pub const ERROR_SUCCESS: u32 = 0;
    pub const ERROR_FILE_NOT_FOUND: u32 = 2;
    pub const ERROR_PATH_NOT_FOUND: u32 = 3;
    pub const ERROR_ACCESS_DENIED: u32 = 5;
    pub const ERROR_INVALID_HANDLE: u32 = 6;
    pub const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
    pub const ERROR_NO_MORE_FILES: u32 = 18;
    pub const ERROR_INVALID_PARAMETER: u32 = 87;
    pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
    pub const ERROR_MOD_NOT_FOUND: u32 = 126;
    pub const ERROR_PROC_NOT_FOUND: u32 = 127;
    pub const ERROR_MORE_DATA: u32 = 234;
    pub const ERROR_NO_MORE_ITEMS: u32 = 259;
    pub const ERROR_OPERATION_ABORTED: u32 = 995;
    pub const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
    pub const ERROR_NOT_FOUND: u32 = 1168;
    pub const ERROR_CANCELLED: u32 = 1223;
    pub const ERROR_TIMEOUT: u32 = 1460;
    pub const ERROR_UNSUPPORTED_TYPE: u32 = 1630;
    pub const ERROR_RESOURCE_TYPE_NOT_FOUND: u32 = 1813;

    pub const S_OK: u32 = 0;
    pub const S_FALSE: u32 = 1;
    pub const E_ABORT: u32 = 0x8000_4004;
    pub const E_FAIL: u32 = 0x8000_4005;
    pub const E_POINTER: u32 = 0x8000_4003;
    pub const E_ACCESSDENIED: u32 = 0x8007_0005;
    pub const E_HANDLE: u32 = 0x8007_0006;
    pub const E_OUTOFMEMORY: u32 = 0x8007_000E;
    pub const E_NOT_SUFFICIENT_BUFFER: u32 = 0x8007_007A;
    pub const RPC_E_CALL_CANCELED: u32 = 0x8001_0002;
    pub const DISP_E_BUFFERTOOSMALL: u32 = 0x8002_0013;
    pub const TYPE_E_ELEMENTNOTFOUND: u32 = 0x8002_802B;
    pub const STG_E_FILENOTFOUND: u32 = 0x8003_0002;
    pub const STG_E_ACCESSDENIED: u32 = 0x8003_0005;
    pub const REGDB_E_CLASSNOTREG: u32 = 0x8004_0154;

    /// errno values shared by Linux, macOS and the BSDs
    pub const EBADF: i32 = 9;
    pub const ERANGE: i32 = 34;
}
