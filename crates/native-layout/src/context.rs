//! Layout options
//!
//! `LayoutOptions` fixes the three platform properties a descriptor depends on:
//! byte order, text code-unit width and pointer width. Descriptors resolve these
//! once when they are built, so encode/decode never consult the host layout.

use bytes::{Buf, BufMut};

/// Byte order of multi-byte integer fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    /// Calculate padding needed to align to the given boundary
    #[inline]
    pub fn align_padding(position: usize, alignment: usize) -> usize {
        if alignment == 0 || alignment == 1 {
            return 0;
        }
        let remainder = position % alignment;
        if remainder == 0 {
            0
        } else {
            alignment - remainder
        }
    }

    /// Put an unsigned integer using `width` bytes (1, 2, 4 or 8)
    pub fn put_uint<B: BufMut>(&self, buf: &mut B, value: u64, width: usize) {
        match self {
            ByteOrder::Little => buf.put_uint_le(value, width),
            ByteOrder::Big => buf.put_uint(value, width),
        }
    }

    /// Get an unsigned integer stored in `width` bytes (1, 2, 4 or 8)
    pub fn get_uint<B: Buf>(&self, buf: &mut B, width: usize) -> u64 {
        match self {
            ByteOrder::Little => buf.get_uint_le(width),
            ByteOrder::Big => buf.get_uint(width),
        }
    }

    /// Put a u16
    #[inline]
    pub fn put_u16<B: BufMut>(&self, buf: &mut B, value: u16) {
        match self {
            ByteOrder::Little => buf.put_u16_le(value),
            ByteOrder::Big => buf.put_u16(value),
        }
    }

    /// Put a u32
    #[inline]
    pub fn put_u32<B: BufMut>(&self, buf: &mut B, value: u32) {
        match self {
            ByteOrder::Little => buf.put_u32_le(value),
            ByteOrder::Big => buf.put_u32(value),
        }
    }

    /// Get a u16
    #[inline]
    pub fn get_u16<B: Buf>(&self, buf: &mut B) -> u16 {
        match self {
            ByteOrder::Little => buf.get_u16_le(),
            ByteOrder::Big => buf.get_u16(),
        }
    }

    /// Get a u32
    #[inline]
    pub fn get_u32<B: Buf>(&self, buf: &mut B) -> u32 {
        match self {
            ByteOrder::Little => buf.get_u32_le(),
            ByteOrder::Big => buf.get_u32(),
        }
    }
}

/// Code-unit width of embedded text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// One byte per code unit (`char[]`), decoded as UTF-8
    Narrow,
    /// Two bytes per code unit (`wchar_t[]`), decoded as UTF-16
    #[default]
    Wide,
}

impl TextMode {
    /// Bytes per code unit
    pub fn unit_size(&self) -> usize {
        match self {
            TextMode::Narrow => 1,
            TextMode::Wide => 2,
        }
    }

    pub fn encoding_name(&self) -> &'static str {
        match self {
            TextMode::Narrow => "UTF-8",
            TextMode::Wide => "UTF-16",
        }
    }
}

/// Size of pointer-sized fields (`ULONG_PTR`, `HMODULE`, `BYTE*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerWidth {
    W32,
    W64,
}

impl PointerWidth {
    /// Pointer width of the compilation target
    pub const fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            PointerWidth::W64
        } else {
            PointerWidth::W32
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            PointerWidth::W32 => 4,
            PointerWidth::W64 => 8,
        }
    }
}

impl Default for PointerWidth {
    fn default() -> Self {
        Self::host()
    }
}

/// Platform properties a descriptor is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutOptions {
    pub byte_order: ByteOrder,
    pub text_mode: TextMode,
    pub pointer_width: PointerWidth,
}

impl LayoutOptions {
    /// Options matching the host: little-endian, wide text, host pointers
    pub fn native() -> Self {
        Self::default()
    }

    /// Options for the "A" (ANSI) variants of native entry points
    pub fn narrow() -> Self {
        Self {
            text_mode: TextMode::Narrow,
            ..Self::default()
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_text_mode(mut self, text_mode: TextMode) -> Self {
        self.text_mode = text_mode;
        self
    }

    pub fn with_pointer_width(mut self, pointer_width: PointerWidth) -> Self {
        self.pointer_width = pointer_width;
        self
    }
}
