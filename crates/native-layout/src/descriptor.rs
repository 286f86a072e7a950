//! Structure descriptors
//!
//! A descriptor is the declared wire shape of one native structure type: an
//! ordered list of named fields with fixed byte lengths.
//!
//! | Kind            | Size              | Natural alignment |
//! |-----------------|-------------------|-------------------|
//! | U8 / I8         | 1                 | 1                 |
//! | U16 / I16       | 2                 | 2                 |
//! | U32 / I32       | 4                 | 4                 |
//! | U64 / I64       | 8                 | 8                 |
//! | Pointer         | 4 or 8            | 4 or 8            |
//! | Bytes(n)        | n                 | 1                 |
//! | Text(units)     | units * 1 or 2    | 1 or 2            |
//! | Guid            | 16                | 4                 |
//! | Reserved(n)     | n                 | 1                 |
//!
//! `build()` lays fields out back to back. `build_aligned()` inserts explicit
//! `Reserved` fields wherever the C compiler would pad, so the total length is
//! still the plain sum of field lengths.

use crate::context::{ByteOrder, LayoutOptions, PointerWidth, TextMode};
use crate::error::{LayoutError, Result, MAX_RECORD_SIZE};
use std::collections::HashSet;
use std::fmt;

/// Name given to padding fields inserted by `build_aligned`
pub const PADDING_FIELD: &str = "_padding";

/// Primitive kind of one descriptor field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    /// Pointer-sized integer (`ULONG_PTR`, handles, base addresses)
    Pointer(PointerWidth),
    /// Raw bytes copied verbatim, never byte-swapped
    Bytes(usize),
    /// Fixed-width terminated text
    Text { units: usize, mode: TextMode },
    /// 16-byte globally unique identifier
    Guid,
    /// Padding or reserved space, zero on encode and skipped on decode
    Reserved(usize),
}

impl FieldKind {
    /// Encoded size in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 => 4,
            FieldKind::U64 | FieldKind::I64 => 8,
            FieldKind::Pointer(width) => width.bytes(),
            FieldKind::Bytes(n) | FieldKind::Reserved(n) => *n,
            FieldKind::Text { units, mode } => units * mode.unit_size(),
            FieldKind::Guid => 16,
        }
    }

    /// Natural alignment used by `build_aligned`
    pub fn alignment(&self) -> usize {
        match self {
            FieldKind::Bytes(_) | FieldKind::Reserved(_) => 1,
            FieldKind::Text { mode, .. } => mode.unit_size(),
            FieldKind::Guid => 4,
            other => other.byte_len(),
        }
    }

    /// Integer width in bytes, for the integer kinds
    pub fn int_width(&self) -> Option<usize> {
        match self {
            FieldKind::U8
            | FieldKind::I8
            | FieldKind::U16
            | FieldKind::I16
            | FieldKind::U32
            | FieldKind::I32
            | FieldKind::U64
            | FieldKind::I64
            | FieldKind::Pointer(_) => Some(self.byte_len()),
            _ => None,
        }
    }

    /// Short name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::U8 => "u8",
            FieldKind::I8 => "i8",
            FieldKind::U16 => "u16",
            FieldKind::I16 => "i16",
            FieldKind::U32 => "u32",
            FieldKind::I32 => "i32",
            FieldKind::U64 => "u64",
            FieldKind::I64 => "i64",
            FieldKind::Pointer(_) => "pointer",
            FieldKind::Bytes(_) => "bytes",
            FieldKind::Text { .. } => "text",
            FieldKind::Guid => "guid",
            FieldKind::Reserved(_) => "reserved",
        }
    }
}

/// One field of a descriptor, with its resolved offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDesc {
    pub name: &'static str,
    pub kind: FieldKind,
    pub offset: usize,
}

impl FieldDesc {
    pub fn byte_len(&self) -> usize {
        self.kind.byte_len()
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self.kind, FieldKind::Reserved(_))
    }
}

/// Immutable wire shape of a fixed-layout structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureDescriptor {
    name: &'static str,
    fields: Vec<FieldDesc>,
    total_len: usize,
    byte_order: ByteOrder,
}

impl StructureDescriptor {
    /// Start building a descriptor resolved against `options`
    pub fn builder(name: &'static str, options: &LayoutOptions) -> DescriptorBuilder {
        DescriptorBuilder::new(name, options)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldDesc] {
        &self.fields
    }

    /// Total encoded length; always the sum of the field lengths
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDesc> {
        self.fields.iter().find(|f| !f.is_reserved() && f.name == name)
    }

    /// Byte offset of a named field
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.field(name).map(|f| f.offset)
    }
}

impl fmt::Display for StructureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.total_len)
    }
}

/// Builder for `StructureDescriptor`
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: &'static str,
    options: LayoutOptions,
    fields: Vec<(&'static str, FieldKind)>,
}

impl DescriptorBuilder {
    pub fn new(name: &'static str, options: &LayoutOptions) -> Self {
        Self {
            name,
            options: *options,
            fields: Vec::new(),
        }
    }

    /// Override the byte order for this structure
    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.options.byte_order = byte_order;
        self
    }

    /// Append a field of an explicit kind
    pub fn field(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push((name, kind));
        self
    }

    pub fn u8(self, name: &'static str) -> Self {
        self.field(name, FieldKind::U8)
    }

    pub fn u16(self, name: &'static str) -> Self {
        self.field(name, FieldKind::U16)
    }

    pub fn i16(self, name: &'static str) -> Self {
        self.field(name, FieldKind::I16)
    }

    pub fn u32(self, name: &'static str) -> Self {
        self.field(name, FieldKind::U32)
    }

    pub fn i32(self, name: &'static str) -> Self {
        self.field(name, FieldKind::I32)
    }

    pub fn u64(self, name: &'static str) -> Self {
        self.field(name, FieldKind::U64)
    }

    pub fn i64(self, name: &'static str) -> Self {
        self.field(name, FieldKind::I64)
    }

    /// Pointer-sized field using the options' pointer width
    pub fn pointer(self, name: &'static str) -> Self {
        let width = self.options.pointer_width;
        self.field(name, FieldKind::Pointer(width))
    }

    pub fn bytes(self, name: &'static str, len: usize) -> Self {
        self.field(name, FieldKind::Bytes(len))
    }

    /// Fixed-width text field using the options' text mode
    pub fn text(self, name: &'static str, units: usize) -> Self {
        let mode = self.options.text_mode;
        self.field(name, FieldKind::Text { units, mode })
    }

    pub fn guid(self, name: &'static str) -> Self {
        self.field(name, FieldKind::Guid)
    }

    pub fn reserved(self, len: usize) -> Self {
        self.field(PADDING_FIELD, FieldKind::Reserved(len))
    }

    /// Build with fields laid out back to back
    pub fn build(self) -> Result<StructureDescriptor> {
        let name = self.name;
        let byte_order = self.options.byte_order;
        Self::finish(name, byte_order, self.fields)
    }

    /// Build with C natural alignment, padding made explicit as `Reserved`
    pub fn build_aligned(self) -> Result<StructureDescriptor> {
        let mut laid_out = Vec::with_capacity(self.fields.len());
        let mut position = 0usize;
        let mut max_align = 1usize;

        for (name, kind) in self.fields {
            let align = kind.alignment();
            max_align = max_align.max(align);
            let padding = ByteOrder::align_padding(position, align);
            if padding > 0 {
                laid_out.push((PADDING_FIELD, FieldKind::Reserved(padding)));
                position += padding;
            }
            position += kind.byte_len();
            laid_out.push((name, kind));
        }

        let trailing = ByteOrder::align_padding(position, max_align);
        if trailing > 0 {
            laid_out.push((PADDING_FIELD, FieldKind::Reserved(trailing)));
        }

        Self::finish(self.name, self.options.byte_order, laid_out)
    }

    fn finish(
        name: &'static str,
        byte_order: ByteOrder,
        raw: Vec<(&'static str, FieldKind)>,
    ) -> Result<StructureDescriptor> {
        let invalid = |reason: String| LayoutError::InvalidDescriptor {
            structure: name,
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("no fields".to_string()));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(raw.len());
        let mut offset = 0usize;

        for (field_name, kind) in raw {
            let len = kind.byte_len();
            if len == 0 {
                return Err(invalid(format!("field {} has zero length", field_name)));
            }
            let is_padding = matches!(kind, FieldKind::Reserved(_));
            if !is_padding && !seen.insert(field_name) {
                return Err(invalid(format!("duplicate field {}", field_name)));
            }
            fields.push(FieldDesc {
                name: field_name,
                kind,
                offset,
            });
            offset = offset
                .checked_add(len)
                .filter(|total| *total <= MAX_RECORD_SIZE)
                .ok_or_else(|| invalid(format!("exceeds {} bytes", MAX_RECORD_SIZE)))?;
        }

        Ok(StructureDescriptor {
            name,
            fields,
            total_len: offset,
            byte_order,
        })
    }
}
