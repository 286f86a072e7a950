//! Globally unique identifiers
//!
//! Wire layout (16 bytes):
//!
//! | Offset | Field | Encoding              |
//! |--------|-------|-----------------------|
//! | 0      | data1 | u32, little-endian    |
//! | 4      | data2 | u16, little-endian    |
//! | 6      | data3 | u16, little-endian    |
//! | 8      | data4 | 8 bytes, copied as-is |
//!
//! Only the first three fields are byte-swapped relative to the textual form;
//! `data4` keeps its textual (big-endian significant) order.

use crate::codec::NativeStruct;
use crate::context::{ByteOrder, LayoutOptions};
use crate::descriptor::StructureDescriptor;
use crate::error::{LayoutError, Result};
use crate::value::{FieldValue, Record};
use bytes::{Buf, BufMut};
use std::fmt;
use std::str::FromStr;

/// 16-byte GUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    /// Size of a GUID in bytes
    pub const SIZE: usize = 16;

    /// Nil GUID
    pub const NIL: Self = Self {
        data1: 0,
        data2: 0,
        data3: 0,
        data4: [0; 8],
    };

    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Generate a random v4 GUID
    pub fn generate() -> Self {
        Self::from(uuid::Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }

    /// Parse from string "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx", braces optional
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or(s);
        if s.len() != 36 {
            return None;
        }
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 5 || parts[3].len() != 4 || parts[4].len() != 12 {
            return None;
        }

        let data1 = u32::from_str_radix(parts[0], 16).ok()?;
        let data2 = u16::from_str_radix(parts[1], 16).ok()?;
        let data3 = u16::from_str_radix(parts[2], 16).ok()?;
        let clock = u16::from_str_radix(parts[3], 16).ok()?;

        let mut data4 = [0u8; 8];
        data4[..2].copy_from_slice(&clock.to_be_bytes());
        for i in 0..6 {
            data4[2 + i] = u8::from_str_radix(parts[4].get(i * 2..i * 2 + 2)?, 16).ok()?;
        }

        Some(Self::new(data1, data2, data3, data4))
    }

    /// Decode from the 16-byte wire layout
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        let mut buf = &bytes[..];
        Self::read(&mut buf)
    }

    /// Encode to the 16-byte wire layout
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        self.write(&mut &mut out[..]);
        out
    }

    /// Read a GUID from `buf`; caller guarantees 16 bytes remain
    pub(crate) fn read<B: Buf>(buf: &mut B) -> Self {
        let order = ByteOrder::Little;
        let data1 = order.get_u32(buf);
        let data2 = order.get_u16(buf);
        let data3 = order.get_u16(buf);
        let mut data4 = [0u8; 8];
        buf.copy_to_slice(&mut data4);
        Self::new(data1, data2, data3, data4)
    }

    /// Write a GUID to `buf`; caller guarantees 16 bytes of space
    pub(crate) fn write<B: BufMut>(&self, buf: &mut B) {
        let order = ByteOrder::Little;
        order.put_u32(buf, self.data1);
        order.put_u16(buf, self.data2);
        order.put_u16(buf, self.data3);
        buf.put_slice(&self.data4);
    }
}

impl NativeStruct for Guid {
    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor> {
        // GUID byte order is fixed by definition
        StructureDescriptor::builder("GUID", options)
            .byte_order(ByteOrder::Little)
            .u32("Data1")
            .u16("Data2")
            .u16("Data3")
            .bytes("Data4", 8)
            .build()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("Data1", FieldValue::U32(self.data1))
            .with("Data2", FieldValue::U16(self.data2))
            .with("Data3", FieldValue::U16(self.data3))
            .with("Data4", FieldValue::Bytes(self.data4.to_vec()))
    }

    fn from_record(record: &Record) -> Result<Self> {
        let raw = record.bytes("Data4")?;
        let data4: [u8; 8] = raw.try_into().map_err(|_| LayoutError::LengthMismatch {
            field: "Data4",
            expected: 8,
            actual: raw.len(),
        })?;
        Ok(Self::new(
            record.u32("Data1")?,
            record.u16("Data2")?,
            record.u16("Data3")?,
            data4,
        ))
    }
}

impl From<uuid::Uuid> for Guid {
    fn from(uuid: uuid::Uuid) -> Self {
        let (data1, data2, data3, data4) = uuid.as_fields();
        Self::new(data1, data2, data3, *data4)
    }
}

impl From<Guid> for uuid::Uuid {
    fn from(guid: Guid) -> Self {
        uuid::Uuid::from_fields(guid.data1, guid.data2, guid.data3, &guid.data4)
    }
}

impl FromStr for Guid {
    type Err = crate::error::LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or(crate::error::LayoutError::InvalidText {
            field: "GUID",
            encoding: "GUID string",
        })
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}
