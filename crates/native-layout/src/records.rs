//! Wire shapes of well-known native records
//!
//! - `FixedFileInfo`: `VS_FIXEDFILEINFO`, the root block of a version resource
//! - `ProcessEntry`: `PROCESSENTRY32`/`PROCESSENTRY32W`, one toolhelp process
//! - `ModuleEntry`: `MODULEENTRY32`/`MODULEENTRY32W`, one toolhelp module
//!
//! The toolhelp records contain a pointer-sized field, so their descriptors are
//! built with natural alignment and differ between 32- and 64-bit targets.

use crate::codec::NativeStruct;
use crate::context::LayoutOptions;
use crate::descriptor::StructureDescriptor;
use crate::error::Result;
use crate::value::{FieldValue, Record};

/// `MAX_PATH`
pub const MAX_PATH: usize = 260;

/// `MAX_MODULE_NAME32`
pub const MAX_MODULE_NAME32: usize = 255;

/// `VS_FIXEDFILEINFO` signature value
pub const VS_FFI_SIGNATURE: u32 = 0xFEEF_04BD;

/// Root block of a version resource (`VS_FIXEDFILEINFO`, 52 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedFileInfo {
    pub signature: u32,
    pub struc_version: u32,
    pub file_version_ms: u32,
    pub file_version_ls: u32,
    pub product_version_ms: u32,
    pub product_version_ls: u32,
    pub file_flags_mask: u32,
    pub file_flags: u32,
    pub file_os: u32,
    pub file_type: u32,
    pub file_subtype: u32,
    pub file_date_ms: u32,
    pub file_date_ls: u32,
}

const FIXED_FILE_INFO_FIELDS: [&str; 13] = [
    "dwSignature",
    "dwStrucVersion",
    "dwFileVersionMS",
    "dwFileVersionLS",
    "dwProductVersionMS",
    "dwProductVersionLS",
    "dwFileFlagsMask",
    "dwFileFlags",
    "dwFileOS",
    "dwFileType",
    "dwFileSubtype",
    "dwFileDateMS",
    "dwFileDateLS",
];

fn split_version(ms: u32, ls: u32) -> (u16, u16, u16, u16) {
    ((ms >> 16) as u16, ms as u16, (ls >> 16) as u16, ls as u16)
}

impl FixedFileInfo {
    pub fn has_valid_signature(&self) -> bool {
        self.signature == VS_FFI_SIGNATURE
    }

    /// File version as (major, minor, build, revision)
    pub fn file_version(&self) -> (u16, u16, u16, u16) {
        split_version(self.file_version_ms, self.file_version_ls)
    }

    /// Product version as (major, minor, build, revision)
    pub fn product_version(&self) -> (u16, u16, u16, u16) {
        split_version(self.product_version_ms, self.product_version_ls)
    }

    fn values(&self) -> [u32; 13] {
        [
            self.signature,
            self.struc_version,
            self.file_version_ms,
            self.file_version_ls,
            self.product_version_ms,
            self.product_version_ls,
            self.file_flags_mask,
            self.file_flags,
            self.file_os,
            self.file_type,
            self.file_subtype,
            self.file_date_ms,
            self.file_date_ls,
        ]
    }
}

impl NativeStruct for FixedFileInfo {
    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor> {
        FIXED_FILE_INFO_FIELDS
            .into_iter()
            .fold(
                StructureDescriptor::builder("VS_FIXEDFILEINFO", options),
                |builder, name| builder.u32(name),
            )
            .build()
    }

    fn to_record(&self) -> Record {
        FIXED_FILE_INFO_FIELDS
            .into_iter()
            .zip(self.values())
            .fold(Record::new(), |record, (name, value)| {
                record.with(name, FieldValue::U32(value))
            })
    }

    fn from_record(record: &Record) -> Result<Self> {
        let mut v = [0u32; 13];
        for (slot, name) in v.iter_mut().zip(FIXED_FILE_INFO_FIELDS) {
            *slot = record.u32(name)?;
        }
        Ok(Self {
            signature: v[0],
            struc_version: v[1],
            file_version_ms: v[2],
            file_version_ls: v[3],
            product_version_ms: v[4],
            product_version_ls: v[5],
            file_flags_mask: v[6],
            file_flags: v[7],
            file_os: v[8],
            file_type: v[9],
            file_subtype: v[10],
            file_date_ms: v[11],
            file_date_ls: v[12],
        })
    }
}

/// One process from a toolhelp snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessEntry {
    /// `dwSize`; filled with the record size on encode
    pub size: u32,
    pub usage: u32,
    pub process_id: u32,
    pub default_heap_id: u64,
    pub module_id: u32,
    pub threads: u32,
    pub parent_process_id: u32,
    pub pri_class_base: i32,
    pub flags: u32,
    pub exe_file: String,
}

impl NativeStruct for ProcessEntry {
    const SIZE_FIELD: Option<&'static str> = Some("dwSize");

    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor> {
        StructureDescriptor::builder("PROCESSENTRY32", options)
            .u32("dwSize")
            .u32("cntUsage")
            .u32("th32ProcessID")
            .pointer("th32DefaultHeapID")
            .u32("th32ModuleID")
            .u32("cntThreads")
            .u32("th32ParentProcessID")
            .i32("pcPriClassBase")
            .u32("dwFlags")
            .text("szExeFile", MAX_PATH)
            .build_aligned()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("dwSize", FieldValue::U32(self.size))
            .with("cntUsage", FieldValue::U32(self.usage))
            .with("th32ProcessID", FieldValue::U32(self.process_id))
            .with("th32DefaultHeapID", FieldValue::Pointer(self.default_heap_id))
            .with("th32ModuleID", FieldValue::U32(self.module_id))
            .with("cntThreads", FieldValue::U32(self.threads))
            .with("th32ParentProcessID", FieldValue::U32(self.parent_process_id))
            .with("pcPriClassBase", FieldValue::I32(self.pri_class_base))
            .with("dwFlags", FieldValue::U32(self.flags))
            .with("szExeFile", FieldValue::Text(self.exe_file.clone()))
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            size: record.u32("dwSize")?,
            usage: record.u32("cntUsage")?,
            process_id: record.u32("th32ProcessID")?,
            default_heap_id: record.pointer("th32DefaultHeapID")?,
            module_id: record.u32("th32ModuleID")?,
            threads: record.u32("cntThreads")?,
            parent_process_id: record.u32("th32ParentProcessID")?,
            pri_class_base: record.i32("pcPriClassBase")?,
            flags: record.u32("dwFlags")?,
            exe_file: record.text("szExeFile")?.to_string(),
        })
    }
}

/// One module from a toolhelp snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleEntry {
    /// `dwSize`; filled with the record size on encode
    pub size: u32,
    pub module_id: u32,
    pub process_id: u32,
    pub global_usage: u32,
    pub process_usage: u32,
    pub base_address: u64,
    pub base_size: u32,
    pub module_handle: u64,
    pub module_name: String,
    pub exe_path: String,
}

impl NativeStruct for ModuleEntry {
    const SIZE_FIELD: Option<&'static str> = Some("dwSize");

    fn descriptor(options: &LayoutOptions) -> Result<StructureDescriptor> {
        StructureDescriptor::builder("MODULEENTRY32", options)
            .u32("dwSize")
            .u32("th32ModuleID")
            .u32("th32ProcessID")
            .u32("GlblcntUsage")
            .u32("ProccntUsage")
            .pointer("modBaseAddr")
            .u32("modBaseSize")
            .pointer("hModule")
            .text("szModule", MAX_MODULE_NAME32 + 1)
            .text("szExePath", MAX_PATH)
            .build_aligned()
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("dwSize", FieldValue::U32(self.size))
            .with("th32ModuleID", FieldValue::U32(self.module_id))
            .with("th32ProcessID", FieldValue::U32(self.process_id))
            .with("GlblcntUsage", FieldValue::U32(self.global_usage))
            .with("ProccntUsage", FieldValue::U32(self.process_usage))
            .with("modBaseAddr", FieldValue::Pointer(self.base_address))
            .with("modBaseSize", FieldValue::U32(self.base_size))
            .with("hModule", FieldValue::Pointer(self.module_handle))
            .with("szModule", FieldValue::Text(self.module_name.clone()))
            .with("szExePath", FieldValue::Text(self.exe_path.clone()))
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            size: record.u32("dwSize")?,
            module_id: record.u32("th32ModuleID")?,
            process_id: record.u32("th32ProcessID")?,
            global_usage: record.u32("GlblcntUsage")?,
            process_usage: record.u32("ProccntUsage")?,
            base_address: record.pointer("modBaseAddr")?,
            base_size: record.u32("modBaseSize")?,
            module_handle: record.pointer("hModule")?,
            module_name: record.text("szModule")?.to_string(),
            exe_path: record.text("szExePath")?.to_string(),
        })
    }
}
