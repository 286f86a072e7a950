//! Win32 entry points
//!
//! `windows` crate calls that surface a `windows::core::Error` are mapped from
//! its HRESULT; registry calls return a plain Win32 code.

use crate::buffer::{BufferProtocol, Sizing};
use crate::call::{capture_last_error, operation, Fill, MarshalledArg, Passing};
use crate::error::{NativeError, Result};
use crate::handle::{HandleGuard, NativeHandle};
use crate::mapper::ErrorMapper;
use crate::platform::registry_string_fill;
use crate::status::{codes, HResult, StatusCode};
use native_layout::{
    from_wide_units, to_wide_null, FixedFileInfo, ProcessEntry, RawBuffer, StructCodec, TextMode,
};
use std::ffi::c_void;
use tracing::debug;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Storage::FileSystem::{
    GetFileVersionInfoSizeW, GetFileVersionInfoW, VerQueryValueW,
};
use windows::Win32::System::Diagnostics::Debug::{
    FormatMessageW, FORMAT_MESSAGE_FROM_SYSTEM, FORMAT_MESSAGE_IGNORE_INSERTS,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::ProcessStatus::EnumProcesses;
use windows::Win32::System::Registry::{
    RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_USER,
    HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_READ, REG_VALUE_TYPE,
};

/// Message buffer size in UTF-16 units
const MESSAGE_UNITS: usize = 512;

fn hresult_of(err: &windows::core::Error) -> StatusCode {
    StatusCode::hresult(err.code().0 as u32)
}

/// System message text for a Win32 code or HRESULT
pub fn format_message(code: u32) -> Option<String> {
    let mut units = [0u16; MESSAGE_UNITS];
    let len = unsafe {
        FormatMessageW(
            FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS,
            None,
            code,
            0,
            PWSTR(units.as_mut_ptr()),
            MESSAGE_UNITS as u32,
            None,
        )
    };
    if len == 0 {
        return None;
    }
    from_wide_units(&units[..len as usize]).map(|text| text.trim_end().to_string())
}

fn close_handle(mapper: ErrorMapper) -> impl FnMut(NativeHandle) -> std::result::Result<(), NativeError> {
    move |handle: NativeHandle| {
        let result = unsafe { CloseHandle(HANDLE(handle.into_raw() as *mut c_void)) };
        result.map_err(|err| mapper.from_status("CloseHandle", hresult_of(&err)))
    }
}

fn close_key(mapper: ErrorMapper) -> impl FnMut(NativeHandle) -> std::result::Result<(), NativeError> {
    move |handle: NativeHandle| {
        let status = unsafe { RegCloseKey(HKEY(handle.into_raw() as *mut c_void)) };
        mapper.check("RegCloseKey", StatusCode::win32(status.0))
    }
}

/// Every running process, from a toolhelp snapshot
pub fn process_snapshot(protocol: &BufferProtocol) -> Result<Vec<ProcessEntry>> {
    let mapper = protocol.mapper();
    let codec = StructCodec::<ProcessEntry>::native()?;
    let end_of_list = HResult::from_win32(codes::ERROR_NO_MORE_FILES).status();

    let guard = HandleGuard::acquire(
        "toolhelp snapshot",
        || {
            let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
                .map_err(|err| mapper.from_status("CreateToolhelp32Snapshot", hresult_of(&err)))?;
            Ok(NativeHandle::from_raw(snapshot.0 as usize))
        },
        close_handle(mapper.clone()),
    )?;

    guard.scope(|snapshot| {
        let snapshot = HANDLE(snapshot.as_raw() as *mut c_void);
        let mut arg = MarshalledArg::new(&codec, &ProcessEntry::default(), Passing::ByReference)?;
        let mut entries = Vec::new();

        loop {
            let entry = arg
                .as_mut_ptr()
                .unwrap_or(std::ptr::null_mut())
                .cast::<PROCESSENTRY32W>();
            let (name, result) = if entries.is_empty() {
                ("Process32FirstW", unsafe { Process32FirstW(snapshot, entry) })
            } else {
                ("Process32NextW", unsafe { Process32NextW(snapshot, entry) })
            };

            match result {
                Ok(()) => entries.push(arg.read_back(&codec)?),
                Err(err) if hresult_of(&err) == end_of_list => break,
                Err(err) => return Err(mapper.from_status(name, hresult_of(&err)).into()),
            }
        }

        debug!(count = entries.len(), "process snapshot walked");
        Ok(entries)
    })
}

/// Ids of every running process
pub fn enum_process_ids(protocol: &BufferProtocol) -> Result<Vec<u32>> {
    let codec = StructCodec::<u32>::native()?;
    let mut op = operation("EnumProcesses", |buf: &mut RawBuffer| {
        let mut needed = 0u32;
        let result = unsafe { EnumProcesses(buf.as_mut_ptr().cast::<u32>(), buf.len() as u32, &mut needed) };
        match result {
            Ok(()) => Fill::ok(needed as usize),
            Err(err) => Fill::failed(hresult_of(&err)),
        }
    });

    protocol.query_then_fetch(&mut op, Sizing::grow(1024), &codec)
}

/// Root block of the version resource of the file at `path`
pub fn file_version_info(protocol: &BufferProtocol, path: &str) -> Result<FixedFileInfo> {
    let mapper = protocol.mapper();
    let wide = to_wide_null(path);
    let file = PCWSTR(wide.as_ptr());

    let size = capture_last_error(|| unsafe { GetFileVersionInfoSizeW(file, None) });
    if size.value == 0 {
        return Err(mapper.from_last_error("GetFileVersionInfoSizeW", &size).into());
    }

    let mut op = operation("GetFileVersionInfoW", |buf: &mut RawBuffer| {
        let result =
            unsafe { GetFileVersionInfoW(file, 0, buf.len() as u32, buf.as_mut_ptr().cast::<c_void>()) };
        match result {
            Ok(()) => Fill::ok(buf.len()),
            Err(err) => Fill::failed(hresult_of(&err)),
        }
    });
    let block = protocol.fetch_with(&mut op, Sizing::Guess(size.value as usize), 1, |valid| {
        Ok(RawBuffer::from_bytes(valid))
    })?;

    let root = to_wide_null("\\");
    let mut value: *mut c_void = std::ptr::null_mut();
    let mut len = 0u32;
    let found = unsafe {
        VerQueryValueW(
            block.as_bytes().as_ptr().cast::<c_void>(),
            PCWSTR(root.as_ptr()),
            &mut value,
            &mut len,
        )
    };
    if !found.as_bool() || value.is_null() {
        let status = StatusCode::win32(codes::ERROR_RESOURCE_TYPE_NOT_FOUND);
        return Err(mapper.from_status("VerQueryValueW", status).into());
    }

    // SAFETY: the value points into `block`, which is alive for this borrow.
    let bytes = unsafe { std::slice::from_raw_parts(value.cast::<u8>(), len as usize) };
    let codec = StructCodec::<FixedFileInfo>::native()?;
    Ok(codec.decode(bytes)?)
}

/// Predefined registry roots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryRoot {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
}

impl RegistryRoot {
    fn hkey(self) -> HKEY {
        match self {
            RegistryRoot::ClassesRoot => HKEY_CLASSES_ROOT,
            RegistryRoot::CurrentUser => HKEY_CURRENT_USER,
            RegistryRoot::LocalMachine => HKEY_LOCAL_MACHINE,
            RegistryRoot::Users => HKEY_USERS,
        }
    }
}

/// String value `value` of key `root\subkey`
///
/// Only `REG_SZ` and `REG_EXPAND_SZ` values are read; other types fail with
/// `ERROR_UNSUPPORTED_TYPE`.
pub fn registry_string(
    protocol: &BufferProtocol,
    root: RegistryRoot,
    subkey: &str,
    value: &str,
) -> Result<String> {
    let mapper = protocol.mapper();
    let subkey = to_wide_null(subkey);
    let value = to_wide_null(value);

    let guard = HandleGuard::acquire(
        "registry key",
        || {
            let mut key = HKEY::default();
            let status =
                unsafe { RegOpenKeyExW(root.hkey(), PCWSTR(subkey.as_ptr()), 0, KEY_READ, &mut key) };
            mapper.check("RegOpenKeyExW", StatusCode::win32(status.0))?;
            Ok(NativeHandle::from_raw(key.0 as usize))
        },
        close_key(mapper.clone()),
    )?;

    guard.scope(|key| {
        let key = HKEY(key.as_raw() as *mut c_void);
        let mut op = operation("RegQueryValueExW", |buf: &mut RawBuffer| {
            let mut len = buf.len() as u32;
            let mut value_type = REG_VALUE_TYPE::default();
            let data = if buf.is_empty() {
                None
            } else {
                Some(buf.as_mut_ptr())
            };
            let status = unsafe {
                RegQueryValueExW(
                    key,
                    PCWSTR(value.as_ptr()),
                    None,
                    Some(&mut value_type),
                    data,
                    Some(&mut len),
                )
            };
            registry_string_fill(StatusCode::win32(status.0), value_type.0, len as usize)
        });
        protocol.fetch_text(&mut op, Sizing::Probe, TextMode::Wide)
    })
}
