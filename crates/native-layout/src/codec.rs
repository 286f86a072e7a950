//! Descriptor-driven encode/decode
//!
//! Records are serialized strictly in descriptor order. Nothing here looks at
//! the host's in-memory layout of any Rust type.

use crate::buffer::RawBuffer;
use crate::context::LayoutOptions;
use crate::descriptor::{FieldDesc, FieldKind, StructureDescriptor};
use crate::error::{LayoutError, Result};
use crate::guid::Guid;
use crate::text::{decode_fixed_text, encode_fixed_text, OverflowPolicy};
use crate::value::{FieldValue, Record};
use std::marker::PhantomData;

/// Encode a record, rejecting text that overflows its field
pub fn encode(record: &Record, descriptor: &StructureDescriptor) -> Result<RawBuffer> {
    encode_with(record, descriptor, OverflowPolicy::Reject)
}

/// Encode a record with an explicit overflow policy
pub fn encode_with(
    record: &Record,
    descriptor: &StructureDescriptor,
    policy: OverflowPolicy,
) -> Result<RawBuffer> {
    let mut buffer = RawBuffer::zeroed(descriptor.total_len());
    encode_into(record, descriptor, policy, buffer.as_mut_bytes())?;
    Ok(buffer)
}

/// Encode a record into the front of `out`
pub fn encode_into(
    record: &Record,
    descriptor: &StructureDescriptor,
    policy: OverflowPolicy,
    out: &mut [u8],
) -> Result<()> {
    let total = descriptor.total_len();
    if out.len() < total {
        return Err(LayoutError::TooShort {
            structure: descriptor.name(),
            needed: total,
            have: out.len(),
        });
    }

    for field in descriptor.fields() {
        let slot = &mut out[field.offset..field.offset + field.byte_len()];
        if field.is_reserved() {
            slot.fill(0);
            continue;
        }
        let value = record
            .get(field.name)
            .ok_or(LayoutError::MissingField(field.name))?;
        encode_field(field, value, slot, descriptor, policy)?;
    }

    Ok(())
}

fn encode_field(
    field: &FieldDesc,
    value: &FieldValue,
    mut slot: &mut [u8],
    descriptor: &StructureDescriptor,
    policy: OverflowPolicy,
) -> Result<()> {
    let order = descriptor.byte_order();

    if let Some(width) = field.kind.int_width() {
        let raw = int_bits(field, value)?;
        if width < 8 && raw >> (width * 8) != 0 {
            return Err(LayoutError::ValueOutOfRange {
                field: field.name,
                value: raw,
                width,
            });
        }
        order.put_uint(&mut slot, raw, width);
        return Ok(());
    }

    match (&field.kind, value) {
        (FieldKind::Bytes(len), FieldValue::Bytes(bytes)) => {
            if bytes.len() < *len {
                return Err(LayoutError::LengthMismatch {
                    field: field.name,
                    expected: *len,
                    actual: bytes.len(),
                });
            }
            if bytes.len() > *len && policy == OverflowPolicy::Reject {
                return Err(LayoutError::FieldOverflow {
                    field: field.name,
                    capacity: *len,
                    actual: bytes.len(),
                });
            }
            slot.copy_from_slice(&bytes[..*len]);
            Ok(())
        }
        (FieldKind::Text { mode, .. }, FieldValue::Text(text)) => {
            encode_fixed_text(field.name, text, slot, *mode, order, policy)
        }
        (FieldKind::Guid, FieldValue::Guid(guid)) => {
            guid.write(&mut slot);
            Ok(())
        }
        (kind, other) => Err(LayoutError::TypeMismatch {
            field: field.name,
            expected: kind.name(),
            got: other.kind_name(),
        }),
    }
}

/// Two's-complement bits of an integer value, checked against the field kind
fn int_bits(field: &FieldDesc, value: &FieldValue) -> Result<u64> {
    let bits = match (&field.kind, value) {
        (FieldKind::U8, FieldValue::U8(v)) => *v as u64,
        (FieldKind::I8, FieldValue::I8(v)) => *v as u8 as u64,
        (FieldKind::U16, FieldValue::U16(v)) => *v as u64,
        (FieldKind::I16, FieldValue::I16(v)) => *v as u16 as u64,
        (FieldKind::U32, FieldValue::U32(v)) => *v as u64,
        (FieldKind::I32, FieldValue::I32(v)) => *v as u32 as u64,
        (FieldKind::U64, FieldValue::U64(v)) => *v,
        (FieldKind::I64, FieldValue::I64(v)) => *v as u64,
        (FieldKind::Pointer(_), FieldValue::Pointer(v)) => *v,
        (kind, other) => {
            return Err(LayoutError::TypeMismatch {
                field: field.name,
                expected: kind.name(),
                got: other.kind_name(),
            })
        }
    };
    Ok(bits)
}

/// Decode a record from the front of `bytes`
pub fn decode(bytes: &[u8], descriptor: &StructureDescriptor) -> Result<Record> {
    let total = descriptor.total_len();
    if bytes.len() < total {
        return Err(LayoutError::TooShort {
            structure: descriptor.name(),
            needed: total,
            have: bytes.len(),
        });
    }

    let order = descriptor.byte_order();
    let mut record = Record::new();

    for field in descriptor.fields() {
        let mut slot = &bytes[field.offset..field.offset + field.byte_len()];
        let value = match field.kind {
            FieldKind::Reserved(_) => continue,
            FieldKind::U8 => FieldValue::U8(order.get_uint(&mut slot, 1) as u8),
            FieldKind::I8 => FieldValue::I8(order.get_uint(&mut slot, 1) as u8 as i8),
            FieldKind::U16 => FieldValue::U16(order.get_uint(&mut slot, 2) as u16),
            FieldKind::I16 => FieldValue::I16(order.get_uint(&mut slot, 2) as u16 as i16),
            FieldKind::U32 => FieldValue::U32(order.get_uint(&mut slot, 4) as u32),
            FieldKind::I32 => FieldValue::I32(order.get_uint(&mut slot, 4) as u32 as i32),
            FieldKind::U64 => FieldValue::U64(order.get_uint(&mut slot, 8)),
            FieldKind::I64 => FieldValue::I64(order.get_uint(&mut slot, 8) as i64),
            FieldKind::Pointer(width) => FieldValue::Pointer(order.get_uint(&mut slot, width.bytes())),
            FieldKind::Bytes(_) => FieldValue::Bytes(slot.to_vec()),
            FieldKind::Text { mode, .. } => {
                FieldValue::Text(decode_fixed_text(field.name, slot, mode, order)?)
            }
            FieldKind::Guid => FieldValue::Guid(Guid::read(&mut slot)),
        };
        record.set(field.name, value);
    }

    Ok(record)
}

/// A Rust type with a fixed native wire shape
pub trait NativeStruct: Sized {
    /// Field that must hold the encoded record size before the call
    /// (`dwSize`/`cbSize` convention)
    const SIZE_FIELD: Option<&'static str> = None;

    /// Describe the wire shape for the given platform options
    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor>;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self>;
}

/// Descriptor-holding codec for one structure type
///
/// The descriptor is resolved once and reused for every value.
#[derive(Debug, Clone)]
pub struct StructCodec<T> {
    descriptor: StructureDescriptor,
    policy: OverflowPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T: NativeStruct> StructCodec<T> {
    pub fn new(options: &LayoutOptions) -> Result<Self> {
        Ok(Self {
            descriptor: T::descriptor(options)?,
            policy: OverflowPolicy::Reject,
            _marker: PhantomData,
        })
    }

    /// Codec for the host platform
    pub fn native() -> Result<Self> {
        Self::new(&LayoutOptions::native())
    }

    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn descriptor(&self) -> &StructureDescriptor {
        &self.descriptor
    }

    /// Encoded size of one element
    pub fn element_size(&self) -> usize {
        self.descriptor.total_len()
    }

    /// Record for `value` with the size field filled in
    fn prepared_record(&self, value: &T) -> Record {
        let mut record = value.to_record();
        if let Some(size_field) = T::SIZE_FIELD {
            record.set(size_field, FieldValue::U32(self.element_size() as u32));
        }
        record
    }

    pub fn encode(&self, value: &T) -> Result<RawBuffer> {
        encode_with(&self.prepared_record(value), &self.descriptor, self.policy)
    }

    /// Encode into the front of `out`, e.g. a buffer about to be passed to a
    /// `*32First` style call
    pub fn encode_into(&self, value: &T, out: &mut [u8]) -> Result<()> {
        encode_into(&self.prepared_record(value), &self.descriptor, self.policy, out)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<T> {
        T::from_record(&decode(bytes, &self.descriptor)?)
    }

    /// Decode `count` consecutive elements
    pub fn decode_all(&self, bytes: &[u8], count: usize) -> Result<Vec<T>> {
        let size = self.element_size();
        let needed = size.checked_mul(count).ok_or_else(|| LayoutError::TooShort {
            structure: self.descriptor.name(),
            needed: usize::MAX,
            have: bytes.len(),
        })?;
        if bytes.len() < needed {
            return Err(LayoutError::TooShort {
                structure: self.descriptor.name(),
                needed,
                have: bytes.len(),
            });
        }
        bytes[..needed].chunks_exact(size).map(|chunk| self.decode(chunk)).collect()
    }
}

impl NativeStruct for u32 {
    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor> {
        StructureDescriptor::builder("DWORD", options).u32("value").build()
    }

    fn to_record(&self) -> Record {
        Record::new().with("value", FieldValue::U32(*self))
    }

    fn from_record(record: &Record) -> Result<Self> {
        record.u32("value")
    }
}

impl NativeStruct for u16 {
    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor> {
        StructureDescriptor::builder("WCHAR", options).u16("value").build()
    }

    fn to_record(&self) -> Record {
        Record::new().with("value", FieldValue::U16(*self))
    }

    fn from_record(record: &Record) -> Result<Self> {
        record.u16("value")
    }
}
