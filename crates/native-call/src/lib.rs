//! Native call marshalling
//!
//! Builds on `native-layout` to call fixed-ABI operating system entry points
//! safely:
//!
//! - `BufferProtocol` runs the probe / allocate / fill / retry loop for
//!   variable-size results and decodes only the bytes reported as valid
//! - `HandleGuard` owns a native handle and closes it exactly once
//! - `ErrorMapper` turns space-tagged status codes into classified
//!   `NativeError`s
//! - `run_blocking` moves a blocking call onto tokio's blocking pool under a
//!   timeout
//!
//! # Example
//!
//! ```
//! use native_call::{operation, BufferProtocol, Fill, Sizing};
//! use native_layout::{RawBuffer, StructCodec};
//!
//! let mut op = operation("EnumIds", |buf: &mut RawBuffer| {
//!     let count = (buf.len() / 4).min(3);
//!     for (i, chunk) in buf.as_mut_bytes().chunks_exact_mut(4).take(count).enumerate() {
//!         chunk.copy_from_slice(&(i as u32 + 100).to_le_bytes());
//!     }
//!     Fill::ok(count * 4)
//! });
//!
//! let codec = StructCodec::<u32>::native().unwrap();
//! let ids = BufferProtocol::new()
//!     .query_then_fetch(&mut op, Sizing::grow(16), &codec)
//!     .unwrap();
//! assert_eq!(ids, vec![100, 101, 102]);
//! ```

mod blocking;
mod buffer;
mod call;
mod error;
mod handle;
mod mapper;
mod message;
pub mod platform;
mod status;

pub use blocking::run_blocking;
pub use buffer::{BufferProtocol, ProtocolConfig, ProtocolStats, ProtocolStatsSnapshot, Sizing};
pub use call::{
    capture_last_error, operation, Fill, FnOperation, MarshalledArg, NativeOperation, Outcome,
    Passing,
};
pub use error::{ErrorKind, MarshalError, NativeError, Result};
pub use handle::{BorrowedHandle, Closer, HandleGuard, NativeHandle};
pub use mapper::{classify, ErrorMapper};
pub use message::{fallback_message, BuiltinMessages, DefaultMessages, MessageSource, SystemMessages};
pub use status::{codes, last_error_space, HResult, StatusCode, StatusSpace};
