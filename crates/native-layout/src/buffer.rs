//! Owned byte region handed to native calls

use crate::error::{LayoutError, Result};
use std::fmt;

/// Owned, exact-length byte region
///
/// Backed by `u64` words so the start is 8-byte aligned and may be passed to
/// native code that expects a pointer to a structure. Only the first `len`
/// bytes are ever exposed.
pub struct RawBuffer {
    words: Vec<u64>,
    len: usize,
}

impl RawBuffer {
    /// Allocate `len` zeroed bytes
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(8)],
            len,
        }
    }

    /// Copy `bytes` into a new buffer
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = Self::zeroed(bytes.len());
        buf.as_mut_bytes().copy_from_slice(bytes);
        buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `words` owns at least `len` initialized bytes and u8 has no
        // alignment requirement.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.len) }
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.words.as_mut_ptr().cast::<u8>(), self.len) }
    }

    /// Pointer for the native call, null for a zero-capacity probe
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        if self.len == 0 {
            std::ptr::null_mut()
        } else {
            self.words.as_mut_ptr().cast::<u8>()
        }
    }

    /// The first `written` bytes, as reported valid by a native call
    pub fn valid(&self, written: usize) -> Result<&[u8]> {
        if written > self.len {
            return Err(LayoutError::TooShort {
                structure: "RawBuffer",
                needed: written,
                have: self.len,
            });
        }
        Ok(&self.as_bytes()[..written])
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer").field("len", &self.len).finish()
    }
}
