//! Handle Tests - Guarded Resource Scenarios
//!
//! These tests walk mock snapshots and keys through `HandleGuard`:
//! - Exactly one close per successful open
//! - No close when the open fails
//! - Cleanup failures attached to, never replacing, the primary error

mod common;

use common::*;
use native_call::{
    codes, ErrorKind, HandleGuard, HResult, MarshalError, MarshalledArg, NativeError, NativeHandle, Passing,
    StatusCode,
};
use native_layout::{LayoutOptions, ProcessEntry, StructCodec};

/// Walk a snapshot the way toolhelp callers do: `first`, then `next` until
/// the end-of-list status, all inside one guarded scope
fn walk(
    handles: &MockHandles,
    snapshot: &MockProcessSnapshot,
) -> Result<Vec<ProcessEntry>, MarshalError> {
    let codec = StructCodec::<ProcessEntry>::new(&LayoutOptions::native())?;
    let guard = HandleGuard::acquire(
        "toolhelp snapshot",
        || handles.open(),
        |handle: NativeHandle| handles.close(handle),
    )?;

    guard.scope(|_| {
        let mut arg = MarshalledArg::new(&codec, &ProcessEntry::default(), Passing::ByReference)?;
        let mut entries = Vec::new();
        loop {
            let len = codec.element_size();
            let record = arg.as_mut_ptr().expect("by-reference argument");
            // SAFETY: the argument owns `len` writable bytes.
            let record = unsafe { std::slice::from_raw_parts_mut(record, len) };
            if !snapshot.step(entries.is_empty(), record)? {
                break;
            }
            entries.push(arg.read_back(&codec)?);
        }
        Ok(entries)
    })
}

/// Test: Snapshot walk closes its handle exactly once
#[test]
fn test_snapshot_walk_closes_once() {
    init_logging();

    let handles = MockHandles::new();
    let snapshot = MockProcessSnapshot::new(&["System", "smss.exe", "csrss.exe", "explorer.exe"]);

    let entries = walk(&handles, &snapshot).unwrap();

    println!("\n=== Snapshot Walk ===");
    for entry in &entries {
        println!("{:>6} {}", entry.process_id, entry.exe_file);
    }

    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3].exe_file, "explorer.exe");
    assert_eq!(entries[1].process_id, snapshot.entries()[1].process_id);
    assert_eq!(entries[0].size as usize, StructCodec::<ProcessEntry>::native().unwrap().element_size());
    assert_eq!(handles.opened().len(), 1);
    assert_eq!(handles.closed(), handles.opened());
}

/// Test: Empty snapshot still closes
#[test]
fn test_empty_snapshot_closes() {
    init_logging();

    let handles = MockHandles::new();
    let snapshot = MockProcessSnapshot::new(&[]);

    let entries = walk(&handles, &snapshot).unwrap();

    assert!(entries.is_empty());
    assert_eq!(handles.closed().len(), 1);
}

/// Test: Failed open yields no guard and no close
#[test]
fn test_failed_open_never_closes() {
    init_logging();

    let handles = MockHandles::new();
    let result = HandleGuard::acquire("process", || handles.deny(), |handle: NativeHandle| handles.close(handle));

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    assert_eq!(err.raw_code(), codes::ERROR_ACCESS_DENIED);
    assert!(handles.closed().is_empty());
}

/// Test: A body failure plus a close failure keeps the body failure primary
#[test]
fn test_close_failure_attached_to_primary() {
    init_logging();

    let handles = MockHandles::new();
    handles.fail_closes();
    let guard =
        HandleGuard::acquire("registry key", || handles.open(), |handle: NativeHandle| handles.close(handle)).unwrap();

    let err = guard
        .scope(|_| -> Result<(), MarshalError> {
            let status = HResult::from_win32(codes::ERROR_FILE_NOT_FOUND).status();
            Err(test_mapper().from_status("RegQueryValueExW", status).into())
        })
        .unwrap_err();

    println!("Combined error: {}", err);
    assert_eq!(err.native_kind(), Some(ErrorKind::NotFound));
    let cleanup = err.cleanup().expect("cleanup error attached");
    assert_eq!(cleanup.operation(), "CloseHandle");
    assert_eq!(cleanup.kind(), ErrorKind::InvalidHandle);
    assert_eq!(handles.closed().len(), 1);
}

/// Test: Close failure alone surfaces as the error of a successful body
#[test]
fn test_close_failure_after_success() {
    init_logging();

    let handles = MockHandles::new();
    handles.fail_closes();
    let guard =
        HandleGuard::acquire("registry key", || handles.open(), |handle: NativeHandle| handles.close(handle)).unwrap();

    let err = guard.scope(|handle| Ok(handle.as_raw())).unwrap_err();

    assert_eq!(err.native_kind(), Some(ErrorKind::InvalidHandle));
    assert!(err.cleanup().is_none());
}

/// Test: Early return through `?` still releases every guard
#[test]
fn test_early_return_releases_nested_guards() {
    init_logging();

    let handles = MockHandles::new();

    let run = || -> Result<(), NativeError> {
        let _outer =
            HandleGuard::acquire("outer", || handles.open(), |handle: NativeHandle| handles.close(handle))?;
        let _inner =
            HandleGuard::acquire("inner", || handles.open(), |handle: NativeHandle| handles.close(handle))?;
        let _denied =
            HandleGuard::acquire("denied", || handles.deny(), |handle: NativeHandle| handles.close(handle))?;
        Ok(())
    };

    let err = run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    let opened = handles.opened();
    let mut closed = handles.closed();
    assert_eq!(opened.len(), 2);
    // inner drops before outer
    assert_eq!(closed, vec![opened[1], opened[0]]);
    closed.sort_unstable();
    assert_eq!(closed, opened);
}

/// Test: Released guards refuse to lend their handle
#[test]
fn test_released_guard_reports_invalid_handle() {
    init_logging();

    let handles = MockHandles::new();
    let mut guard =
        HandleGuard::acquire("module", || handles.open(), |handle: NativeHandle| handles.close(handle)).unwrap();

    assert!(guard.handle().is_some());
    guard.release().unwrap();
    guard.release().unwrap();

    assert!(guard.handle().is_none());
    let err = guard.get().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    assert_eq!(err.operation(), "module");
    assert_eq!(handles.closed().len(), 1);
}

/// Test: Statuses from the close path keep their space
#[test]
fn test_close_status_space() {
    let status = StatusCode::win32(codes::ERROR_INVALID_HANDLE);
    let err = test_mapper().from_status("CloseHandle", status);
    assert_eq!(err.status(), status);
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
}
