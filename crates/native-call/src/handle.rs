//! Scoped ownership of native handles
//!
//! A `HandleGuard` owns exactly one `NativeHandle` and closes it exactly once:
//! through `release()`, through `scope()`, or on drop. The raw value is only
//! lent out as a `BorrowedHandle` tied to the guard's lifetime.

use crate::error::{ErrorKind, MarshalError, NativeError};
use crate::status::{codes, last_error_space, StatusCode, StatusSpace};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Opaque platform-sized token returned by an open-style call
///
/// Not `Clone`: a value moves into exactly one guard.
#[derive(Debug, PartialEq, Eq)]
pub struct NativeHandle(usize);

impl NativeHandle {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Give up ownership without closing
    pub fn into_raw(self) -> usize {
        self.0
    }
}

/// Handle value lent out for the duration of a borrow of its guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowedHandle<'a> {
    raw: usize,
    _guard: PhantomData<&'a NativeHandle>,
}

impl BorrowedHandle<'_> {
    pub fn as_raw(&self) -> usize {
        self.raw
    }
}

/// Matching close call for a kind of handle
pub trait Closer {
    fn close(&mut self, handle: NativeHandle) -> Result<(), NativeError>;
}

impl<F> Closer for F
where
    F: FnMut(NativeHandle) -> Result<(), NativeError>,
{
    fn close(&mut self, handle: NativeHandle) -> Result<(), NativeError> {
        self(handle)
    }
}

/// Owns one native handle and its close call
pub struct HandleGuard<C: Closer> {
    handle: Option<NativeHandle>,
    closer: C,
    label: &'static str,
}

impl<C: Closer> HandleGuard<C> {
    /// Run `open` and wrap the handle it returns
    ///
    /// When `open` fails no guard exists and `closer` is never called.
    pub fn acquire<O>(label: &'static str, open: O, closer: C) -> Result<Self, NativeError>
    where
        O: FnOnce() -> Result<NativeHandle, NativeError>,
    {
        let handle = open()?;
        debug!(label, handle = handle.0, "handle acquired");
        Ok(Self {
            handle: Some(handle),
            closer,
            label,
        })
    }

    /// Borrow the handle; `None` once released
    pub fn handle(&self) -> Option<BorrowedHandle<'_>> {
        self.handle.as_ref().map(|handle| BorrowedHandle {
            raw: handle.0,
            _guard: PhantomData,
        })
    }

    /// Borrow the handle, failing with `InvalidHandle` once released
    pub fn get(&self) -> Result<BorrowedHandle<'_>, NativeError> {
        self.handle().ok_or_else(|| released(self.label))
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Close the handle; later calls do nothing
    ///
    /// A failing close is reported, but the guard counts as released anyway.
    pub fn release(&mut self) -> Result<(), NativeError> {
        match self.handle.take() {
            Some(handle) => {
                debug!(label = self.label, handle = handle.0, "closing handle");
                self.closer.close(handle)
            }
            None => Ok(()),
        }
    }

    /// Run `body` with the handle, then release it
    ///
    /// If both fail, the body's error is returned with the close error attached.
    pub fn scope<R, F>(mut self, body: F) -> Result<R, MarshalError>
    where
        F: FnOnce(BorrowedHandle<'_>) -> Result<R, MarshalError>,
    {
        let result = match self.get() {
            Ok(handle) => body(handle),
            Err(err) => Err(err.into()),
        };
        match (result, self.release()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(cleanup.into()),
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(cleanup)) => Err(primary.with_cleanup(cleanup)),
        }
    }
}

impl<C: Closer> Drop for HandleGuard<C> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(label = self.label, error = %err, "failed to close handle on drop");
        }
    }
}

impl<C: Closer> fmt::Debug for HandleGuard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleGuard")
            .field("label", &self.label)
            .field("handle", &self.handle)
            .finish()
    }
}

fn released(label: &'static str) -> NativeError {
    let status = match last_error_space() {
        StatusSpace::Errno => StatusCode::errno(codes::EBADF),
        _ => StatusCode::win32(codes::ERROR_INVALID_HANDLE),
    };
    NativeError::new(
        ErrorKind::InvalidHandle,
        status,
        "handle already released",
        label,
    )
}
