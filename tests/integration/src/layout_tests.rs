//! Layout Tests - Native Record Encoding Scenarios
//!
//! These tests exercise `native-layout` the way the call layer uses it:
//! - GUIDs in their mixed-endian binary form
//! - Version resource root blocks
//! - Toolhelp records in wide and narrow flavours
//! - Fixed-width text with garbage after the terminator

mod common;

use common::*;
use native_layout::{
    decode, encode, encode_with, ByteOrder, FieldKind, FieldValue, FixedFileInfo, Guid,
    LayoutError, LayoutOptions, ModuleEntry, OverflowPolicy, PointerWidth, ProcessEntry, Record,
    StructCodec, StructureDescriptor, TextMode, VS_FFI_SIGNATURE,
};

/// Test: GUID text and binary forms agree
#[test]
fn test_guid_forms() {
    init_logging();

    let text = "{6B29FC40-CA47-1067-B31D-00DD010662DA}";
    let guid: Guid = text.parse().unwrap();
    assert_eq!(guid.data1, 0x6B29_FC40);
    assert_eq!(guid.data2, 0xCA47);
    assert_eq!(guid.data3, 0x1067);
    assert_eq!(guid.to_string(), "6b29fc40-ca47-1067-b31d-00dd010662da");

    let codec = StructCodec::<Guid>::native().unwrap();
    let bytes = codec.encode(&guid).unwrap();
    assert_eq!(
        bytes.as_bytes(),
        &[
            0x40, 0xFC, 0x29, 0x6B, 0x47, 0xCA, 0x67, 0x10, 0xB3, 0x1D, 0x00, 0xDD, 0x01, 0x06,
            0x62, 0xDA
        ]
    );

    let uuid: uuid::Uuid = guid.into();
    assert_eq!(Guid::from(uuid), guid);
}

/// Test: Arbitrary 16-byte inputs survive decode then encode bit for bit
#[test]
fn test_guid_bytes_roundtrip() {
    let big = StructCodec::<Guid>::new(&LayoutOptions::native().with_byte_order(ByteOrder::Big)).unwrap();
    for seed in 0u8..32 {
        let raw: Vec<u8> = (0..16u8).map(|i| i.wrapping_mul(37).wrapping_add(seed)).collect();
        let guid = big.decode(&raw).unwrap();
        assert_eq!(big.encode(&guid).unwrap().as_bytes(), raw.as_slice());
    }
}

/// Test: A version resource root block decodes to its version quads
#[test]
fn test_version_block() {
    init_logging();

    let words: [u32; 13] = [
        VS_FFI_SIGNATURE,
        0x0001_0000,
        0x0006_0002,
        0x4A61_0FA3,
        0x0006_0002,
        0x4A61_0000,
        0x3F,
        0,
        0x0004_0004,
        1,
        0,
        0,
        0,
    ];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();

    let info = StructCodec::<FixedFileInfo>::native().unwrap().decode(&bytes).unwrap();
    assert!(info.has_valid_signature());
    assert_eq!(info.file_version(), (6, 2, 19041, 4003));
    assert_eq!(info.product_version(), (6, 2, 19041, 0));
    assert_eq!(info.file_type, 1);
}

/// Test: Short inputs fail at every length
#[test]
fn test_short_version_block() {
    let codec = StructCodec::<FixedFileInfo>::native().unwrap();
    let bytes = vec![0u8; codec.element_size()];
    for len in 0..bytes.len() {
        match codec.decode(&bytes[..len]) {
            Err(LayoutError::TooShort { needed, have, .. }) => {
                assert_eq!(needed, 52);
                assert_eq!(have, len);
            }
            other => panic!("length {}: {:?}", len, other),
        }
    }
}

/// Test: Wide and narrow process records carry the same values
#[test]
fn test_process_entry_flavours() {
    init_logging();

    let entry = ProcessEntry {
        usage: 0,
        process_id: 4242,
        default_heap_id: 0,
        module_id: 0,
        threads: 17,
        parent_process_id: 812,
        pri_class_base: 8,
        flags: 0,
        exe_file: "svchost.exe".to_string(),
        ..ProcessEntry::default()
    };

    for options in [
        LayoutOptions::native().with_pointer_width(PointerWidth::W64),
        LayoutOptions::native().with_pointer_width(PointerWidth::W32),
        LayoutOptions::narrow().with_pointer_width(PointerWidth::W64),
        LayoutOptions::narrow().with_pointer_width(PointerWidth::W32),
    ] {
        let codec = StructCodec::<ProcessEntry>::new(&options).unwrap();
        let bytes = codec.encode(&entry).unwrap();
        assert_eq!(bytes.len(), codec.element_size());

        let size = u32::from_le_bytes(bytes.as_bytes()[..4].try_into().unwrap());
        assert_eq!(size as usize, codec.element_size(), "{:?}", options);

        let decoded = codec.decode(bytes.as_bytes()).unwrap();
        assert_eq!(decoded.exe_file, "svchost.exe");
        assert_eq!(decoded.process_id, 4242);
        assert_eq!(decoded.parent_process_id, 812);
    }
}

/// Test: Module records hold both the short name and the full path
#[test]
fn test_module_entry() {
    let codec = StructCodec::<ModuleEntry>::new(&LayoutOptions::native().with_pointer_width(PointerWidth::W64)).unwrap();
    let module = ModuleEntry {
        process_id: 4242,
        base_address: 0x7FFA_0000_0000,
        base_size: 0x1F_0000,
        module_handle: 0x7FFA_0000_0000,
        module_name: "ntdll.dll".to_string(),
        exe_path: "C:\\Windows\\System32\\ntdll.dll".to_string(),
        ..ModuleEntry::default()
    };

    let bytes = codec.encode(&module).unwrap();
    assert_eq!(bytes.len(), 1080);
    let decoded = codec.decode(bytes.as_bytes()).unwrap();
    assert_eq!(decoded.module_name, module.module_name);
    assert_eq!(decoded.exe_path, module.exe_path);
    assert_eq!(decoded.base_address, module.base_address);
}

/// Test: Text after the terminator is ignored
#[test]
fn test_text_after_terminator_ignored() {
    init_logging();

    for mode in [TextMode::Narrow, TextMode::Wide] {
        let options = LayoutOptions::native().with_text_mode(mode);
        let desc = StructureDescriptor::builder("NAME128", &options)
            .text("name", 128)
            .build()
            .unwrap();

        let mut raw = vec![0u8; desc.total_len()];
        let junk = "ABC\0garbage";
        match mode {
            TextMode::Narrow => raw[..junk.len()].copy_from_slice(junk.as_bytes()),
            TextMode::Wide => {
                for (i, unit) in junk.encode_utf16().enumerate() {
                    raw[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
                }
            }
        }

        let record = decode(&raw, &desc).unwrap();
        assert_eq!(record.text("name").unwrap(), "ABC");

        // encode zero-fills everything after the text
        let encoded = encode(&record, &desc).unwrap();
        let unit = mode.unit_size();
        assert!(encoded.as_bytes()[3 * unit..].iter().all(|b| *b == 0));
    }
}

/// Test: Overflowing text is rejected or truncated on request
#[test]
fn test_text_overflow_policies() {
    let options = LayoutOptions::native();
    let desc = StructureDescriptor::builder("SHORT", &options)
        .text("name", 8)
        .build()
        .unwrap();
    let record = Record::new().with("name", FieldValue::Text("verylongname".to_string()));

    match encode(&record, &desc) {
        Err(LayoutError::FieldOverflow { capacity, actual, .. }) => {
            assert_eq!(capacity, 7);
            assert_eq!(actual, 12);
        }
        other => panic!("expected overflow, got {:?}", other),
    }

    let truncated = encode_with(&record, &desc, OverflowPolicy::Truncate).unwrap();
    let decoded = decode(truncated.as_bytes(), &desc).unwrap();
    assert_eq!(decoded.text("name").unwrap(), "verylon");
}

/// Test: Explicit padding is visible in aligned descriptors
#[test]
fn test_aligned_descriptor_padding() {
    let options = LayoutOptions::native().with_pointer_width(PointerWidth::W64);
    let desc = StructureDescriptor::builder("PADDED", &options)
        .u8("tag")
        .pointer("address")
        .u16("count")
        .build_aligned()
        .unwrap();

    assert_eq!(desc.offset_of("address"), Some(8));
    assert_eq!(desc.total_len(), 24);
    let reserved = desc
        .fields()
        .iter()
        .filter(|f| matches!(f.kind, FieldKind::Reserved(_)))
        .count();
    assert_eq!(reserved, 2);
}
