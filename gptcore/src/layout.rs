// SPDX-License-Identifier: MIT

//! On-disk byte layout of the GPT header and partition entries.
//!
//! The offset constants are the source of truth; the wire records below are
//! built from alignment-1 little-endian fields so they cannot pick up padding,
//! and the tests pin every field offset to the table.

use zerocopy::byteorder::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const SECTOR_SIZE: u64 = 512;
pub const PRIMARY_HEADER_LBA: u64 = 1;
pub const PRIMARY_ENTRIES_LBA: u64 = 2;
pub const DEFAULT_NUM_ENTRIES: u32 = 128;
pub const DEFAULT_ENTRY_SIZE: u32 = 128;
pub const GPT_SIGNATURE: &[u8; 8] = b"EFI PART";
pub const GPT_REVISION: u32 = 0x0001_0000;

/// Protective MBR sector + header sector + 128 * 128 byte entry array.
pub const GPT_BLOB_SIZE: usize = 16896;

// Header field offsets
pub const HDR_SIGNATURE: usize = 0;
pub const HDR_REVISION: usize = 8;
pub const HDR_HEADER_SIZE: usize = 12;
pub const HDR_HEADER_CRC32: usize = 16;
pub const HDR_RESERVED: usize = 20;
pub const HDR_CURRENT_LBA: usize = 24;
pub const HDR_BACKUP_LBA: usize = 32;
pub const HDR_FIRST_USABLE_LBA: usize = 40;
pub const HDR_LAST_USABLE_LBA: usize = 48;
pub const HDR_DISK_GUID: usize = 56;
pub const HDR_PARTITION_TABLE_LBA: usize = 72;
pub const HDR_NUM_PARTITIONS: usize = 80;
pub const HDR_PARTITION_ENTRY_SIZE: usize = 84;
pub const HDR_PARTITION_TABLE_CRC32: usize = 88;
/// Bytes covered by the fixed header fields.
pub const HEADER_LEN: usize = 92;

// Entry field offsets
pub const ENT_TYPE_GUID: usize = 0;
pub const ENT_UNIQUE_GUID: usize = 16;
pub const ENT_START_LBA: usize = 32;
pub const ENT_END_LBA: usize = 40;
pub const ENT_ATTRIBUTES: usize = 48;
pub const ENT_NAME: usize = 56;
pub const ENT_NAME_UNITS: usize = 36;
/// Bytes covered by the fixed entry fields.
pub const ENTRY_LEN: usize = 128;

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct RawGptHeader {
    pub signature: [u8; 8],
    pub revision: U32,
    pub header_size: U32,
    pub header_crc32: U32,
    pub reserved: U32,
    pub current_lba: U64,
    pub backup_lba: U64,
    pub first_usable_lba: U64,
    pub last_usable_lba: U64,
    pub disk_guid: [u8; 16],
    pub partition_table_lba: U64,
    pub num_partitions: U32,
    pub partition_entry_size: U32,
    pub partition_table_crc32: U32,
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C)]
pub struct RawGptEntry {
    pub type_guid: [u8; 16],
    pub unique_guid: [u8; 16],
    pub start_lba: U64,
    pub end_lba: U64,
    pub attributes: U64,
    pub name: [U16; ENT_NAME_UNITS],
}

const _: () = assert!(core::mem::size_of::<RawGptHeader>() == HEADER_LEN);
const _: () = assert!(core::mem::size_of::<RawGptEntry>() == ENTRY_LEN);

/// Number of whole sectors needed to hold `bytes`.
#[inline]
pub fn sectors_for(bytes: u64) -> u64 {
    bytes.div_ceil(SECTOR_SIZE)
}
