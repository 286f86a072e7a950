//! Bindings to real operating system entry points
//!
//! Everything here is built from the portable pieces of this crate: structure
//! codecs for the records, `BufferProtocol` for variable-size results and
//! `HandleGuard` for every handle opened along the way.

use crate::call::Fill;
use crate::status::{codes, StatusCode};

#[cfg(windows)]
mod win32;

#[cfg(windows)]
pub use win32::{
    enum_process_ids, file_version_info, format_message, process_snapshot, registry_string,
    RegistryRoot,
};

/// `REG_SZ` value type
pub const REG_SZ: u32 = 1;
/// `REG_EXPAND_SZ` value type
pub const REG_EXPAND_SZ: u32 = 2;
/// `REG_DWORD` value type
pub const REG_DWORD: u32 = 4;

/// Fill report for one `RegQueryValueExW` call made for a string value
///
/// `len` is the byte count the call reported. Values of any type other than
/// `REG_SZ` or `REG_EXPAND_SZ` fail with `ERROR_UNSUPPORTED_TYPE` and are
/// never decoded as text.
pub fn registry_string_fill(status: StatusCode, value_type: u32, len: usize) -> Fill {
    if !status.is_success() {
        return Fill::needs(status, len);
    }
    if value_type != REG_SZ && value_type != REG_EXPAND_SZ {
        return Fill::failed(StatusCode::win32(codes::ERROR_UNSUPPORTED_TYPE));
    }
    // a null data pointer succeeds and only reports the size
    Fill::ok(len).with_required(len)
}
