//! Native call plumbing
//!
//! A native operation sees only a `RawBuffer` and reports back a `Fill`. The
//! last-error channel is read right after the call and carried in an
//! `Outcome`, so nothing in between can overwrite it.

use crate::status::{StatusCode, StatusSpace};
use native_layout::{LayoutError, NativeStruct, RawBuffer, StructCodec};

/// How a structure argument is handed to the native entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passing {
    /// The callee receives a copy; the caller's bytes are never written
    ByValue,
    /// The callee receives a pointer and may write through it
    ByReference,
}

/// An encoded structure argument together with its passing convention
#[derive(Debug)]
pub struct MarshalledArg {
    buffer: RawBuffer,
    passing: Passing,
}

impl MarshalledArg {
    pub fn new<T: NativeStruct>(
        codec: &StructCodec<T>,
        value: &T,
        passing: Passing,
    ) -> Result<Self, LayoutError> {
        Ok(Self {
            buffer: codec.encode(value)?,
            passing,
        })
    }

    pub fn passing(&self) -> Passing {
        self.passing
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_bytes().as_ptr()
    }

    /// Writable pointer, only for by-reference arguments
    pub fn as_mut_ptr(&mut self) -> Option<*mut u8> {
        match self.passing {
            Passing::ByReference => Some(self.buffer.as_mut_ptr()),
            Passing::ByValue => None,
        }
    }

    /// Decode the argument as the callee left it
    pub fn read_back<T: NativeStruct>(&self, codec: &StructCodec<T>) -> Result<T, LayoutError> {
        codec.decode(self.buffer.as_bytes())
    }
}

/// Return value of a native call plus the last error read right after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub last_error: StatusCode,
}

impl<T> Outcome<T> {
    pub fn new(value: T, last_error: StatusCode) -> Self {
        Self { value, last_error }
    }
}

/// Run `call` and read the host's last-error channel immediately after
pub fn capture_last_error<T>(call: impl FnOnce() -> T) -> Outcome<T> {
    let value = call();
    let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
    Outcome::new(value, StatusCode::last_error(code))
}

/// What a native operation reports about one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub status: StatusCode,
    /// Bytes the callee reports as valid
    pub written: usize,
    /// Bytes the callee asks for, when it reports one
    pub required: Option<usize>,
    /// Elements returned, for enumeration-style calls
    pub items: Option<usize>,
}

impl Fill {
    /// Success with `written` valid bytes
    pub fn ok(written: usize) -> Self {
        Self::with_status(StatusCode::success(), written)
    }

    /// Success returning `count` elements of `element_size` bytes each
    pub fn items(count: usize, element_size: usize) -> Self {
        Self {
            items: Some(count),
            ..Self::ok(count.saturating_mul(element_size))
        }
    }

    /// Any status, nothing known about sizes
    pub fn failed(status: StatusCode) -> Self {
        Self::with_status(status, 0)
    }

    /// Needs-bigger-buffer with the size the callee asked for
    pub fn needs(status: StatusCode, required: usize) -> Self {
        Self {
            required: Some(required),
            ..Self::failed(status)
        }
    }

    pub fn with_status(status: StatusCode, written: usize) -> Self {
        Self {
            status,
            written,
            required: None,
            items: None,
        }
    }

    pub fn with_required(mut self, required: usize) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_items(mut self, items: usize) -> Self {
        self.items = Some(items);
        self
    }

    /// Status space of the reported status
    pub fn space(&self) -> StatusSpace {
        self.status.space()
    }
}

/// A native entry point as seen by `BufferProtocol`
pub trait NativeOperation {
    /// Entry point name used in errors and logs
    fn name(&self) -> &str;

    /// Invoke the entry point once with `buffer` as its output region
    ///
    /// A zero-length buffer is a size probe; its pointer is null.
    fn invoke(&mut self, buffer: &mut RawBuffer) -> Fill;
}

/// `NativeOperation` backed by a closure
pub struct FnOperation<F> {
    name: String,
    f: F,
}

impl<F> NativeOperation for FnOperation<F>
where
    F: FnMut(&mut RawBuffer) -> Fill,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&mut self, buffer: &mut RawBuffer) -> Fill {
        (self.f)(buffer)
    }
}

/// Wrap a closure as a named native operation
pub fn operation<F>(name: impl Into<String>, f: F) -> FnOperation<F>
where
    F: FnMut(&mut RawBuffer) -> Fill,
{
    FnOperation {
        name: name.into(),
        f,
    }
}
