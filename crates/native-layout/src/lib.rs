//! Fixed-layout native structure codec
//!
//! This crate converts between Rust values and the exact byte representation
//! that fixed-ABI operating system entry points read and write.
//!
//! # Model
//!
//! - A `StructureDescriptor` lists a structure's fields in ABI order, each with
//!   a fixed byte length. Padding is an explicit `Reserved` field, so the total
//!   length is always the plain sum of field lengths.
//! - A `Record` holds the field values by name; `encode`/`decode` convert
//!   between records and bytes using only the descriptor.
//! - `NativeStruct` types (`Guid`, `FixedFileInfo`, `ProcessEntry`, ...) map a
//!   Rust struct onto a record; `StructCodec<T>` builds the descriptor once and
//!   reuses it.
//!
//! # Example
//!
//! ```
//! use native_layout::{decode, encode, FieldValue, LayoutOptions, Record, StructureDescriptor};
//!
//! let desc = StructureDescriptor::builder("POINT", &LayoutOptions::native())
//!     .i32("x")
//!     .i32("y")
//!     .build()
//!     .unwrap();
//!
//! let record = Record::new()
//!     .with("x", FieldValue::I32(-1))
//!     .with("y", FieldValue::I32(2));
//! let bytes = encode(&record, &desc).unwrap();
//! assert_eq!(bytes.as_bytes(), &[0xFF, 0xFF, 0xFF, 0xFF, 2, 0, 0, 0]);
//! assert_eq!(decode(bytes.as_bytes(), &desc).unwrap(), record);
//! ```

mod buffer;
mod codec;
mod context;
mod descriptor;
mod error;
mod guid;
mod records;
mod text;
mod value;

pub use buffer::RawBuffer;
pub use codec::{decode, encode, encode_into, encode_with, NativeStruct, StructCodec};
pub use context::{ByteOrder, LayoutOptions, PointerWidth, TextMode};
pub use descriptor::{DescriptorBuilder, FieldDesc, FieldKind, StructureDescriptor, PADDING_FIELD};
pub use error::{LayoutError, Result, MAX_RECORD_SIZE};
pub use guid::Guid;
pub use records::{
    FixedFileInfo, ModuleEntry, ProcessEntry, MAX_MODULE_NAME32, MAX_PATH, VS_FFI_SIGNATURE,
};
pub use text::{decode_fixed_text, encode_fixed_text, from_wide_units, to_wide_null, OverflowPolicy};
pub use value::{FieldValue, Record};

/// Re-export bytes for convenience
pub use bytes::{Buf, BufMut};
