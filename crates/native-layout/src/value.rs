//! Language-level field values and records

use crate::error::{LayoutError, Result};
use crate::guid::Guid;

/// Value of one structure field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    Pointer(u64),
    Bytes(Vec<u8>),
    Text(String),
    Guid(Guid),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::U8(_) => "u8",
            FieldValue::I8(_) => "i8",
            FieldValue::U16(_) => "u16",
            FieldValue::I16(_) => "i16",
            FieldValue::U32(_) => "u32",
            FieldValue::I32(_) => "i32",
            FieldValue::U64(_) => "u64",
            FieldValue::I64(_) => "i64",
            FieldValue::Pointer(_) => "pointer",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Text(_) => "text",
            FieldValue::Guid(_) => "guid",
        }
    }
}

/// Ordered set of named field values
///
/// Reserved and padding fields never appear in a record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(&'static str, FieldValue)>,
}

macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $ty:ty, $expected:expr) => {
        pub fn $fn_name(&self, name: &'static str) -> Result<$ty> {
            match self.require(name)? {
                FieldValue::$variant(v) => Ok(*v),
                other => Err(LayoutError::TypeMismatch {
                    field: name,
                    expected: $expected,
                    got: other.kind_name(),
                }),
            }
        }
    };
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &'static str, value: FieldValue) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace a field value
    pub fn set(&mut self, name: &'static str, value: FieldValue) {
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    fn require(&self, name: &'static str) -> Result<&FieldValue> {
        self.get(name).ok_or(LayoutError::MissingField(name))
    }

    typed_getter!(u8, U8, u8, "u8");
    typed_getter!(u16, U16, u16, "u16");
    typed_getter!(u32, U32, u32, "u32");
    typed_getter!(i32, I32, i32, "i32");
    typed_getter!(u64, U64, u64, "u64");
    typed_getter!(pointer, Pointer, u64, "pointer");
    typed_getter!(guid, Guid, Guid, "guid");

    pub fn text(&self, name: &'static str) -> Result<&str> {
        match self.require(name)? {
            FieldValue::Text(s) => Ok(s),
            other => Err(LayoutError::TypeMismatch {
                field: name,
                expected: "text",
                got: other.kind_name(),
            }),
        }
    }

    pub fn bytes(&self, name: &'static str) -> Result<&[u8]> {
        match self.require(name)? {
            FieldValue::Bytes(b) => Ok(b),
            other => Err(LayoutError::TypeMismatch {
                field: name,
                expected: "bytes",
                got: other.kind_name(),
            }),
        }
    }
}
