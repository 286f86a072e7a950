//! Caller-allocated buffer protocol
//!
//! Native entry points that return variable-size data want the caller to
//! supply the output buffer. They come in three flavours:
//!
//! - probe: call with no buffer, get told the required size, call again
//! - guess: call with a reasonable buffer, retry with the size reported back
//! - grow: enumeration calls that silently fill the whole buffer; a full
//!   buffer means "there may be more", so grow and call again
//!
//! `BufferProtocol` runs all three as one bounded loop, decodes only the bytes
//! the callee reports as valid, and classifies failures with `ErrorMapper`.

use crate::call::{Fill, NativeOperation};
use crate::error::{ErrorKind, MarshalError, NativeError, Result};
use crate::mapper::ErrorMapper;
use crate::status::{codes, last_error_space, StatusCode, StatusSpace};
use native_layout::{
    decode_fixed_text, ByteOrder, LayoutError, NativeStruct, RawBuffer, StructCodec, TextMode,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Initial sizing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    /// Start with a zero-capacity call to learn the required size
    Probe,
    /// Start with this many bytes
    Guess(usize),
    /// Enumeration: start with `initial` elements, add `increment` whenever
    /// the callee fills the buffer exactly
    Grow { initial: usize, increment: usize },
}

impl Sizing {
    /// `Grow` with the configured default increment
    pub fn grow(initial: usize) -> Self {
        Sizing::Grow {
            initial,
            increment: 0,
        }
    }
}

/// Buffer protocol limits
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// Capacity in bytes for `Guess(0)` and for retries with no reported size
    pub default_guess: usize,
    /// Growth step in bytes when the callee gives no size hint, and in
    /// elements for `Grow { increment: 0, .. }`
    pub default_increment: usize,
    /// Largest buffer ever allocated, in bytes
    pub max_capacity: usize,
    /// Most invocations of the native operation per fetch
    pub max_attempts: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            default_guess: 1024,
            default_increment: 1024,
            max_capacity: 64 * 1024 * 1024,
            max_attempts: 64,
        }
    }
}

/// Protocol counters
#[derive(Debug, Default)]
pub struct ProtocolStats {
    pub calls: AtomicU64,
    pub growths: AtomicU64,
    pub bytes_allocated: AtomicU64,
    pub failures: AtomicU64,
}

impl ProtocolStats {
    pub fn snapshot(&self) -> ProtocolStatsSnapshot {
        ProtocolStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            growths: self.growths.load(Ordering::Relaxed),
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of protocol statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolStatsSnapshot {
    pub calls: u64,
    pub growths: u64,
    pub bytes_allocated: u64,
    pub failures: u64,
}

/// Runs the probe / allocate / fill / retry loop
#[derive(Debug, Clone, Default)]
pub struct BufferProtocol {
    config: ProtocolConfig,
    mapper: ErrorMapper,
    stats: Arc<ProtocolStats>,
}

impl BufferProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ProtocolConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_mapper(mut self, mapper: ErrorMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn mapper(&self) -> &ErrorMapper {
        &self.mapper
    }

    pub fn stats(&self) -> Arc<ProtocolStats> {
        Arc::clone(&self.stats)
    }

    /// Fetch a sequence of `T` from `operation`
    ///
    /// The element count is the callee's reported item count, or the valid
    /// byte count divided by the element size.
    pub fn query_then_fetch<T, O>(
        &self,
        operation: &mut O,
        sizing: Sizing,
        codec: &StructCodec<T>,
    ) -> Result<Vec<T>>
    where
        T: NativeStruct,
        O: NativeOperation + ?Sized,
    {
        let element_size = codec.element_size();
        let (buffer, fill) = self.run(operation, sizing, element_size)?;

        let count = match fill.items {
            Some(items) => items,
            None => {
                buffer.valid(fill.written)?;
                if fill.written % element_size != 0 {
                    return Err(LayoutError::TooShort {
                        structure: codec.descriptor().name(),
                        needed: (fill.written / element_size + 1).saturating_mul(element_size),
                        have: fill.written,
                    }
                    .into());
                }
                fill.written / element_size
            }
        };

        let needed = count.checked_mul(element_size).ok_or(LayoutError::TooShort {
            structure: codec.descriptor().name(),
            needed: usize::MAX,
            have: buffer.len(),
        })?;
        let valid = buffer.valid(needed)?;
        debug!(operation = operation.name(), count, "decoding elements");
        Ok(codec.decode_all(valid, count)?)
    }

    /// Fetch and hand the valid bytes to `decode`
    ///
    /// `element_size` scales `Sizing::Grow`; use 1 for byte-sized data.
    pub fn fetch_with<R, O, D>(
        &self,
        operation: &mut O,
        sizing: Sizing,
        element_size: usize,
        decode: D,
    ) -> Result<R>
    where
        O: NativeOperation + ?Sized,
        D: FnOnce(&[u8]) -> std::result::Result<R, LayoutError>,
    {
        let (buffer, fill) = self.run(operation, sizing, element_size)?;
        let valid = buffer.valid(fill.written)?;
        Ok(decode(valid)?)
    }

    /// Fetch a string value; trailing terminators are dropped
    pub fn fetch_text<O>(&self, operation: &mut O, sizing: Sizing, mode: TextMode) -> Result<String>
    where
        O: NativeOperation + ?Sized,
    {
        let unit = mode.unit_size();
        let order = if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        };
        self.fetch_with(operation, sizing, unit, |valid| {
            decode_fixed_text("value", valid, mode, order)
        })
    }

    /// The loop itself; returns the last buffer with the fill that ended it
    fn run<O>(&self, operation: &mut O, sizing: Sizing, element_size: usize) -> Result<(RawBuffer, Fill)>
    where
        O: NativeOperation + ?Sized,
    {
        let element_size = element_size.max(1);
        let step = match sizing {
            Sizing::Grow { increment, .. } => {
                let elements = if increment == 0 {
                    self.config.default_increment
                } else {
                    increment
                };
                elements.max(1).saturating_mul(element_size)
            }
            _ => self.config.default_increment.max(1),
        };
        let mut capacity = match sizing {
            Sizing::Probe => 0,
            Sizing::Guess(0) => self.config.default_guess,
            Sizing::Guess(bytes) => bytes,
            Sizing::Grow { initial, .. } => initial.max(1).saturating_mul(element_size),
        };

        let mut attempts = 0u32;
        loop {
            if attempts >= self.config.max_attempts || capacity > self.config.max_capacity {
                return Err(self.limit_error(operation.name(), capacity, attempts));
            }
            attempts += 1;

            let mut buffer = RawBuffer::zeroed(capacity);
            self.stats.bytes_allocated.fetch_add(capacity as u64, Ordering::Relaxed);
            self.stats.calls.fetch_add(1, Ordering::Relaxed);

            let fill = operation.invoke(&mut buffer);
            trace!(
                operation = operation.name(),
                attempt = attempts,
                capacity,
                status = %fill.status,
                written = fill.written,
                required = ?fill.required,
                items = ?fill.items,
                "native call returned"
            );

            let next = if fill.status.is_success() {
                match (fill.required, sizing) {
                    (Some(required), _) if required > capacity => required,
                    (_, Sizing::Grow { .. }) => {
                        let count = fill.items.unwrap_or(fill.written / element_size);
                        // a full buffer may have been truncated
                        if count == capacity / element_size {
                            capacity.saturating_add(step)
                        } else {
                            return Ok((buffer, fill));
                        }
                    }
                    _ => return Ok((buffer, fill)),
                }
            } else {
                let err = self.mapper.from_status(operation.name(), fill.status);
                if err.kind() != ErrorKind::InsufficientBuffer {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    debug!(operation = operation.name(), error = %err, "native call failed");
                    return Err(err.into());
                }
                match fill.required {
                    Some(required) if required > capacity => required,
                    _ if capacity == 0 => self.config.default_guess.max(1),
                    _ => capacity.saturating_add(step),
                }
            };

            debug!(operation = operation.name(), from = capacity, to = next, "growing buffer");
            self.stats.growths.fetch_add(1, Ordering::Relaxed);
            capacity = next;
        }
    }

    fn limit_error(&self, operation: &str, capacity: usize, attempts: u32) -> MarshalError {
        self.stats.failures.fetch_add(1, Ordering::Relaxed);
        let status = match last_error_space() {
            StatusSpace::Errno => StatusCode::errno(codes::ERANGE),
            _ => StatusCode::win32(codes::ERROR_INSUFFICIENT_BUFFER),
        };
        NativeError::new(
            ErrorKind::InsufficientBuffer,
            status,
            format!(
                "buffer limit reached after {} attempts (next capacity {} bytes, limit {} bytes)",
                attempts, capacity, self.config.max_capacity
            ),
            operation,
        )
        .into()
    }
}
