//! Shared fixtures for the integration tests
//!
//! Mock native entry points that behave like the real ones: an enumeration
//! call that silently truncates, a registry-style value query that reports
//! `ERROR_MORE_DATA`, and a handle table that records every open and close.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;
use std::time::Duration;

use parking_lot::Mutex;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use native_call::{
    codes, operation, platform, BufferProtocol, ErrorMapper, Fill, NativeError, NativeHandle,
    NativeOperation, StatusCode,
};
use native_layout::{LayoutOptions, ProcessEntry, RawBuffer, StructCodec};

static INIT: Once = Once::new();

/// Install a tracing subscriber once per test binary; honours `RUST_LOG`
pub fn init_logging() {
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Protocol with the built-in message table, independent of the host
pub fn test_protocol() -> BufferProtocol {
    BufferProtocol::new().with_mapper(test_mapper())
}

pub fn test_mapper() -> ErrorMapper {
    ErrorMapper::with_messages(native_call::BuiltinMessages)
}

/// Enumeration that behaves like `EnumProcesses`: fills as many ids as fit
/// and reports only the bytes written
pub struct MockEnumeration {
    ids: Vec<u32>,
    calls: Mutex<Vec<usize>>,
}

impl MockEnumeration {
    pub fn new(count: usize) -> Self {
        Self {
            ids: (0..count as u32).map(|i| 4 + i * 4).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Capacities (in ids) of every call so far
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }

    pub fn operation(&self) -> impl NativeOperation + '_ {
        operation("EnumProcesses", move |buf: &mut RawBuffer| {
            let capacity = buf.len() / 4;
            self.calls.lock().push(capacity);
            let count = capacity.min(self.ids.len());
            for (slot, id) in buf.as_mut_bytes().chunks_exact_mut(4).zip(&self.ids[..count]) {
                slot.copy_from_slice(&id.to_le_bytes());
            }
            Fill::ok(count * 4)
        })
    }
}

/// Registry-style string store answering with `ERROR_MORE_DATA`
pub struct MockRegistry {
    values: Mutex<HashMap<String, (u32, Vec<u8>)>>,
    calls: AtomicU64,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Store a `REG_SZ` value, UTF-16LE with its terminator
    pub fn set(&self, name: &str, value: &str) {
        let bytes = value
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        self.set_raw(name, platform::REG_SZ, bytes);
    }

    pub fn set_raw(&self, name: &str, value_type: u32, bytes: Vec<u8>) {
        self.values.lock().insert(name.to_string(), (value_type, bytes));
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Query for `name` the way `RegQueryValueExW` answers: an empty buffer
    /// reports the size, a short one `ERROR_MORE_DATA`. Each call reads the
    /// current value, so one that grows between probe and fetch is retried.
    pub fn query<'a>(&'a self, name: &'a str) -> impl NativeOperation + 'a {
        operation("RegQueryValueExW", move |buf: &mut RawBuffer| {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let Some((value_type, bytes)) = self.values.lock().get(name).cloned() else {
                return Fill::failed(StatusCode::win32(codes::ERROR_FILE_NOT_FOUND));
            };
            let status = if buf.is_empty() {
                StatusCode::success()
            } else if buf.len() < bytes.len() {
                StatusCode::win32(codes::ERROR_MORE_DATA)
            } else {
                buf.as_mut_bytes()[..bytes.len()].copy_from_slice(&bytes);
                StatusCode::success()
            };
            platform::registry_string_fill(status, value_type, bytes.len())
        })
    }
}

/// Handle table recording opens and closes
#[derive(Default)]
pub struct MockHandles {
    next: AtomicU64,
    open: Mutex<Vec<usize>>,
    closed: Mutex<Vec<usize>>,
    fail_close: Mutex<bool>,
}

impl MockHandles {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0x100),
            ..Self::default()
        }
    }

    pub fn open(&self) -> Result<NativeHandle, NativeError> {
        let raw = self.next.fetch_add(4, Ordering::Relaxed) as usize;
        self.open.lock().push(raw);
        Ok(NativeHandle::from_raw(raw))
    }

    pub fn deny(&self) -> Result<NativeHandle, NativeError> {
        Err(test_mapper().from_status("OpenProcess", StatusCode::win32(codes::ERROR_ACCESS_DENIED)))
    }

    pub fn close(&self, handle: NativeHandle) -> Result<(), NativeError> {
        let raw = handle.into_raw();
        self.closed.lock().push(raw);
        if *self.fail_close.lock() {
            return Err(test_mapper().from_status("CloseHandle", StatusCode::win32(codes::ERROR_INVALID_HANDLE)));
        }
        Ok(())
    }

    pub fn fail_closes(&self) {
        *self.fail_close.lock() = true;
    }

    pub fn opened(&self) -> Vec<usize> {
        self.open.lock().clone()
    }

    pub fn closed(&self) -> Vec<usize> {
        self.closed.lock().clone()
    }
}

/// `PROCESSENTRY32W`-style snapshot: `first`/`next` calls that fill a
/// caller-supplied record and fail with `ERROR_NO_MORE_FILES` at the end
pub struct MockProcessSnapshot {
    codec: StructCodec<ProcessEntry>,
    entries: Vec<ProcessEntry>,
    cursor: Mutex<usize>,
}

impl MockProcessSnapshot {
    pub fn new(names: &[&str]) -> Self {
        let entries = names
            .iter()
            .enumerate()
            .map(|(i, name)| ProcessEntry {
                process_id: 1000 + i as u32 * 4,
                parent_process_id: 4,
                threads: i as u32 + 1,
                pri_class_base: 8,
                exe_file: name.to_string(),
                ..ProcessEntry::default()
            })
            .collect();
        Self {
            codec: StructCodec::new(&LayoutOptions::native()).expect("process entry descriptor"),
            entries,
            cursor: Mutex::new(0),
        }
    }

    pub fn entries(&self) -> &[ProcessEntry] {
        &self.entries
    }

    /// One `Process32FirstW`/`Process32NextW` step writing into `record`
    pub fn step(&self, first: bool, record: &mut [u8]) -> Result<bool, NativeError> {
        let mut cursor = self.cursor.lock();
        if first {
            *cursor = 0;
        }
        let declared = u32::from_le_bytes([record[0], record[1], record[2], record[3]]) as usize;
        if declared != self.codec.element_size() {
            return Err(test_mapper().from_status("Process32NextW", StatusCode::win32(codes::ERROR_INVALID_PARAMETER)));
        }
        let Some(entry) = self.entries.get(*cursor) else {
            return Ok(false);
        };
        self.codec
            .encode_into(entry, record)
            .map_err(|_| test_mapper().from_status("Process32NextW", StatusCode::win32(codes::ERROR_INSUFFICIENT_BUFFER)))?;
        *cursor += 1;
        Ok(true)
    }
}

/// Concurrent statistics tracker
pub struct ConcurrentStats {
    success: AtomicU64,
    failure: AtomicU64,
    latencies: Mutex<Vec<Duration>>,
}

impl ConcurrentStats {
    pub fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn record_success(&self, latency: Duration) {
        self.success.fetch_add(1, Ordering::Relaxed);
        self.latencies.lock().push(latency);
    }

    pub fn record_failure(&self) {
        self.failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn success_count(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure.load(Ordering::Relaxed)
    }

    pub fn avg_latency(&self) -> Duration {
        let latencies = self.latencies.lock();
        if latencies.is_empty() {
            return Duration::ZERO;
        }
        latencies.iter().sum::<Duration>() / latencies.len() as u32
    }

    pub fn max_latency(&self) -> Duration {
        self.latencies.lock().iter().max().copied().unwrap_or(Duration::ZERO)
    }
}

