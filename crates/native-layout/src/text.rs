//! Fixed-width embedded text fields
//!
//! Native structures embed strings as fixed arrays (`CHAR szExeFile[260]`,
//! `WCHAR szModule[256]`). On the wire:
//!
//! ```text
//! units[0..n]   # code units up to the first terminator
//! 0             # terminator
//! ...           # anything, ignored on decode, zero on encode
//! ```
//!
//! Narrow fields use 1-byte units, wide fields 2-byte units (UTF-16). Narrow
//! bytes are read as UTF-8; invalid sequences become U+FFFD. Text with an
//! embedded terminator is rejected on encode.

use crate::context::{ByteOrder, TextMode};
use crate::error::{LayoutError, Result};

/// What to do when text does not fit its fixed-width field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail with `LayoutError::FieldOverflow`
    #[default]
    Reject,
    /// Keep the longest prefix that fits on a character boundary
    Truncate,
}

/// Decode a fixed-width text field
///
/// `bytes` is exactly the field's width. Decoding stops at the first
/// terminator; a field with no terminator is decoded in full. Only wide text
/// can fail, on unpaired surrogates.
pub fn decode_fixed_text(
    field: &'static str,
    bytes: &[u8],
    mode: TextMode,
    order: ByteOrder,
) -> Result<String> {
    let invalid = || LayoutError::InvalidText {
        field,
        encoding: mode.encoding_name(),
    };

    match mode {
        TextMode::Narrow => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
        TextMode::Wide => {
            let mut cursor = bytes;
            let mut units = Vec::with_capacity(bytes.len() / 2);
            while cursor.len() >= 2 {
                let unit = order.get_u16(&mut cursor);
                if unit == 0 {
                    break;
                }
                units.push(unit);
            }
            char::decode_utf16(units)
                .collect::<std::result::Result<String, _>>()
                .map_err(|_| invalid())
        }
    }
}

/// Encode `value` into a fixed-width text field
///
/// `out` is exactly the field's width and is zero-filled past the text. The
/// usable capacity is one unit less than the width so a terminator always fits.
pub fn encode_fixed_text(
    field: &'static str,
    value: &str,
    out: &mut [u8],
    mode: TextMode,
    order: ByteOrder,
    policy: OverflowPolicy,
) -> Result<()> {
    if let Some(at) = value.find('\0') {
        let position = match mode {
            TextMode::Narrow => at,
            TextMode::Wide => value[..at].encode_utf16().count(),
        };
        return Err(LayoutError::EmbeddedTerminator { field, position });
    }

    let width_units = out.len() / mode.unit_size();
    let capacity = width_units.saturating_sub(1);
    out.fill(0);

    match mode {
        TextMode::Narrow => {
            let bytes = value.as_bytes();
            let mut keep = bytes.len();
            if keep > capacity {
                if policy == OverflowPolicy::Reject {
                    return Err(LayoutError::FieldOverflow {
                        field,
                        capacity,
                        actual: keep,
                    });
                }
                keep = capacity;
                while !value.is_char_boundary(keep) {
                    keep -= 1;
                }
            }
            out[..keep].copy_from_slice(&bytes[..keep]);
        }
        TextMode::Wide => {
            let mut units: Vec<u16> = value.encode_utf16().collect();
            if units.len() > capacity {
                if policy == OverflowPolicy::Reject {
                    return Err(LayoutError::FieldOverflow {
                        field,
                        capacity,
                        actual: units.len(),
                    });
                }
                units.truncate(capacity);
                // never leave half a surrogate pair
                if matches!(units.last(), Some(u) if (0xD800..0xDC00).contains(u)) {
                    units.pop();
                }
            }
            let mut cursor = &mut out[..];
            for unit in units {
                order.put_u16(&mut cursor, unit);
            }
        }
    }

    Ok(())
}

/// Null-terminated UTF-16 copy of `s` for passing to wide native entry points
pub fn to_wide_null(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Decode a null-terminated (or unterminated) UTF-16 slice
pub fn from_wide_units(units: &[u16]) -> Option<String> {
    let end = units.iter().position(|u| *u == 0).unwrap_or(units.len());
    String::from_utf16(&units[..end]).ok()
}
