// SPDX-License-Identifier: MIT
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use zerocopy::byteorder::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, IntoBytes};

use crate::checksum::{header_crc32, table_crc32};
use crate::errors::*;
use crate::guid::Guid;
use crate::layout::*;

pub fn encode_gpt_name(name: &str) -> [u16; ENT_NAME_UNITS] {
    let mut buf = [0u16; ENT_NAME_UNITS];
    for (i, c) in name.encode_utf16().take(ENT_NAME_UNITS).enumerate() {
        buf[i] = c;
    }
    buf
}

pub fn decode_gpt_name(name: &[u16; ENT_NAME_UNITS]) -> String {
    let len = name.iter().position(|&c| c == 0).unwrap_or(name.len());
    char::decode_utf16(name[..len].iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

// ---------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub reserved: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: [u8; 16],
    pub partition_table_lba: u64,
    pub num_partitions: u32,
    pub partition_entry_size: u32,
    pub partition_table_crc32: u32,
}

impl GptHeader {
    /// Decodes a header from at least 92 bytes. Bytes past the fixed fields,
    /// up to `header_size`, are reserved and must be zero.
    pub fn decode(bytes: &[u8]) -> GptResult<Self> {
        let raw = bytes
            .get(..HEADER_LEN)
            .and_then(|b| RawGptHeader::read_from_bytes(b).ok())
            .ok_or(GptError::Decode {
                what: "GPT header",
                need: HEADER_LEN,
                got: bytes.len(),
            })?;

        if &raw.signature != GPT_SIGNATURE {
            return Err(GptError::BadSignature {
                found: raw.signature,
            });
        }

        let hdr = Self::from(raw);
        if (hdr.header_size as usize) < HEADER_LEN || hdr.header_size as u64 > SECTOR_SIZE {
            return Err(GptError::Invalid("GPT: header_size out of range"));
        }
        let tail_end = bytes.len().min(hdr.header_size as usize);
        if bytes[HEADER_LEN..tail_end].iter().any(|&b| b != 0) {
            return Err(GptError::Invalid("GPT: non-zero reserved bytes in header"));
        }
        Ok(hdr)
    }

    /// Encodes exactly `header_size` bytes, zero-padded past the fixed fields.
    /// The stored `header_crc32` is written as is.
    pub fn encode(&self) -> Vec<u8> {
        let size = (self.header_size as usize).max(HEADER_LEN);
        let mut out = vec![0u8; size];
        out[..HEADER_LEN].copy_from_slice(RawGptHeader::from(*self).as_bytes());
        out
    }

    /// Encodes into a full zero-padded sector, ready to be written.
    pub fn encode_sector(&self) -> Vec<u8> {
        let mut sector = self.encode();
        sector.resize(SECTOR_SIZE as usize, 0);
        sector
    }

    /// CRC of the encoded header with its checksum field zeroed.
    #[inline]
    pub fn compute_header_crc32(&self) -> u32 {
        header_crc32(&self.encode())
    }

    /// Recomputes and stores `header_crc32`.
    #[inline]
    pub fn refresh_crc(&mut self) {
        self.header_crc32 = self.compute_header_crc32();
    }

    #[inline]
    pub fn header_crc_ok(&self) -> bool {
        self.compute_header_crc32() == self.header_crc32
    }

    #[inline]
    pub fn disk_guid(&self) -> Guid {
        Guid(self.disk_guid)
    }

    #[inline]
    pub fn geometry(&self) -> TableGeometry {
        TableGeometry::from_header(self)
    }

    /// Mirror copy of this header placed at `current_lba`, with its table at
    /// `table_lba`; the new header points back at `self.current_lba`.
    pub fn to_backup(mut self, current_lba: u64, table_lba: u64) -> Self {
        let other = self.current_lba;
        self.current_lba = current_lba;
        self.backup_lba = other;
        self.partition_table_lba = table_lba;
        self.refresh_crc();
        self
    }

    pub fn validate_header(&self) -> GptResult<()> {
        if &self.signature != GPT_SIGNATURE {
            return Err(GptError::BadSignature {
                found: self.signature,
            });
        }
        if self.revision != GPT_REVISION {
            return Err(GptError::Invalid("GPT: unsupported revision"));
        }
        if (self.header_size as usize) < HEADER_LEN {
            return Err(GptError::Invalid("GPT: header_size too small"));
        }
        if self.first_usable_lba > self.last_usable_lba {
            return Err(GptError::Invalid("GPT: empty usable range"));
        }
        Ok(())
    }
}

impl From<RawGptHeader> for GptHeader {
    fn from(raw: RawGptHeader) -> Self {
        Self {
            signature: raw.signature,
            revision: raw.revision.get(),
            header_size: raw.header_size.get(),
            header_crc32: raw.header_crc32.get(),
            reserved: raw.reserved.get(),
            current_lba: raw.current_lba.get(),
            backup_lba: raw.backup_lba.get(),
            first_usable_lba: raw.first_usable_lba.get(),
            last_usable_lba: raw.last_usable_lba.get(),
            disk_guid: raw.disk_guid,
            partition_table_lba: raw.partition_table_lba.get(),
            num_partitions: raw.num_partitions.get(),
            partition_entry_size: raw.partition_entry_size.get(),
            partition_table_crc32: raw.partition_table_crc32.get(),
        }
    }
}

impl From<GptHeader> for RawGptHeader {
    fn from(h: GptHeader) -> Self {
        Self {
            signature: h.signature,
            revision: U32::new(h.revision),
            header_size: U32::new(h.header_size),
            header_crc32: U32::new(h.header_crc32),
            reserved: U32::new(h.reserved),
            current_lba: U64::new(h.current_lba),
            backup_lba: U64::new(h.backup_lba),
            first_usable_lba: U64::new(h.first_usable_lba),
            last_usable_lba: U64::new(h.last_usable_lba),
            disk_guid: h.disk_guid,
            partition_table_lba: U64::new(h.partition_table_lba),
            num_partitions: U32::new(h.num_partitions),
            partition_entry_size: U32::new(h.partition_entry_size),
            partition_table_crc32: U32::new(h.partition_table_crc32),
        }
    }
}

// ---------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GptEntry {
    pub type_guid: [u8; 16],
    pub unique_guid: [u8; 16],
    pub start_lba: u64,
    pub end_lba: u64,
    pub attributes: u64,
    pub name: [u16; ENT_NAME_UNITS],
}

impl GptEntry {
    pub fn new(
        type_guid: [u8; 16],
        unique_guid: [u8; 16],
        start_lba: u64,
        end_lba: u64,
        attributes: u64,
        name: &str,
    ) -> Self {
        Self {
            type_guid,
            unique_guid,
            start_lba,
            end_lba,
            attributes,
            name: encode_gpt_name(name),
        }
    }

    pub fn empty() -> Self {
        Self {
            type_guid: [0; 16],
            unique_guid: [0; 16],
            start_lba: 0,
            end_lba: 0,
            attributes: 0,
            name: [0; ENT_NAME_UNITS],
        }
    }

    /// Decodes the fixed 128-byte prefix. All-zero input gives an empty slot.
    pub fn decode(bytes: &[u8]) -> GptResult<Self> {
        let raw = bytes
            .get(..ENTRY_LEN)
            .and_then(|b| RawGptEntry::read_from_bytes(b).ok())
            .ok_or(GptError::Decode {
                what: "GPT partition entry",
                need: ENTRY_LEN,
                got: bytes.len(),
            })?;
        Ok(Self::from(raw))
    }

    /// Encodes into `entry_size` bytes (at least 128), zero-padded.
    pub fn encode(&self, entry_size: usize) -> Vec<u8> {
        let mut out = vec![0u8; entry_size.max(ENTRY_LEN)];
        self.encode_into(&mut out[..ENTRY_LEN]);
        out
    }

    #[inline]
    fn encode_into(&self, dst: &mut [u8]) {
        dst.copy_from_slice(RawGptEntry::from(*self).as_bytes());
    }

    /// An all-zero type GUID marks an unused slot.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.type_guid.iter().all(|&b| b == 0)
    }

    #[inline]
    pub fn has_zero_lba(&self) -> bool {
        self.start_lba == 0 || self.end_lba == 0
    }

    /// Inclusive length in sectors, `None` when `end < start`.
    #[inline]
    pub fn sectors(&self) -> Option<u64> {
        self.end_lba
            .checked_sub(self.start_lba)
            .map(|d| d.saturating_add(1))
    }

    #[inline]
    pub fn type_guid(&self) -> Guid {
        Guid(self.type_guid)
    }

    #[inline]
    pub fn unique_guid(&self) -> Guid {
        Guid(self.unique_guid)
    }

    #[inline]
    pub fn name(&self) -> String {
        decode_gpt_name(&self.name)
    }

    pub fn validate_basic(&self) -> GptResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        if self.end_lba < self.start_lba {
            return Err(GptError::Invalid("GPT: partition ends before it starts"));
        }
        Ok(())
    }

    pub fn validate_in_bounds(&self, first_usable: u64, last_usable: u64) -> GptResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        if self.start_lba < first_usable {
            return Err(GptError::Invalid(
                "GPT: partition starts before first usable LBA",
            ));
        }
        if self.end_lba > last_usable {
            return Err(GptError::Invalid("GPT: partition ends after last usable LBA"));
        }
        Ok(())
    }
}

impl From<RawGptEntry> for GptEntry {
    fn from(raw: RawGptEntry) -> Self {
        let mut name = [0u16; ENT_NAME_UNITS];
        for (dst, src) in name.iter_mut().zip(raw.name.iter()) {
            *dst = src.get();
        }
        Self {
            type_guid: raw.type_guid,
            unique_guid: raw.unique_guid,
            start_lba: raw.start_lba.get(),
            end_lba: raw.end_lba.get(),
            attributes: raw.attributes.get(),
            name,
        }
    }
}

impl From<GptEntry> for RawGptEntry {
    fn from(e: GptEntry) -> Self {
        Self {
            type_guid: e.type_guid,
            unique_guid: e.unique_guid,
            start_lba: U64::new(e.start_lba),
            end_lba: U64::new(e.end_lba),
            attributes: U64::new(e.attributes),
            name: e.name.map(U16::new),
        }
    }
}

#[inline]
fn overlaps_inclusive(a_start: u64, a_end: u64, b_start: u64, b_end: u64) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// First pair of overlapping non-empty entries, as slot indices.
pub fn find_overlap(entries: &[GptEntry]) -> Option<(usize, usize)> {
    let mut segs: Vec<(u64, u64, usize)> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_empty())
        .map(|(i, e)| (e.start_lba, e.end_lba, i))
        .collect();

    segs.sort_unstable_by_key(|s| s.0);

    segs.windows(2).find_map(|w| {
        let (a, b) = (w[0], w[1]);
        overlaps_inclusive(a.0, a.1, b.0, b.1).then_some((a.2, b.2))
    })
}

// ---------------------------------------------------------------------
// Entry array
// ---------------------------------------------------------------------

/// Shape of the entry array, with the conventional fallbacks for zeroed
/// header fields.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TableGeometry {
    pub num_entries: u32,
    pub entry_size: u32,
}

impl Default for TableGeometry {
    fn default() -> Self {
        Self {
            num_entries: DEFAULT_NUM_ENTRIES,
            entry_size: DEFAULT_ENTRY_SIZE,
        }
    }
}

impl TableGeometry {
    pub fn from_header(hdr: &GptHeader) -> Self {
        let num_entries = match hdr.num_partitions {
            0 => DEFAULT_NUM_ENTRIES,
            n => n,
        };
        let entry_size = match hdr.partition_entry_size {
            0 => DEFAULT_ENTRY_SIZE,
            n => n,
        };
        Self {
            num_entries,
            entry_size,
        }
    }

    pub fn validate(&self) -> GptResult<()> {
        if (self.entry_size as usize) < ENTRY_LEN || self.entry_size % 8 != 0 {
            return Err(GptError::Invalid("GPT: invalid partition entry size"));
        }
        Ok(())
    }

    #[inline]
    pub fn bytes(&self) -> u64 {
        self.num_entries as u64 * self.entry_size as u64
    }

    #[inline]
    pub fn sectors(&self) -> u64 {
        sectors_for(self.bytes())
    }
}

/// Raw partition-entry array. Slots are decoded on demand and patched in
/// place, so bytes past the 128-byte prefix of larger entries survive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionTable {
    entry_size: usize,
    raw: Vec<u8>,
}

impl PartitionTable {
    pub fn from_bytes(raw: Vec<u8>, geometry: TableGeometry) -> GptResult<Self> {
        geometry.validate()?;
        let need = geometry.bytes() as usize;
        if raw.len() < need {
            return Err(GptError::Decode {
                what: "GPT partition table",
                need,
                got: raw.len(),
            });
        }
        let mut raw = raw;
        raw.truncate(need);
        Ok(Self {
            entry_size: geometry.entry_size as usize,
            raw,
        })
    }

    /// Table of `geometry.num_entries` slots, the first ones filled from
    /// `entries`, the rest empty.
    pub fn from_entries(entries: &[GptEntry], geometry: TableGeometry) -> GptResult<Self> {
        geometry.validate()?;
        if entries.len() > geometry.num_entries as usize {
            return Err(GptError::Invalid("GPT: too many entries for table"));
        }
        let mut table = Self {
            entry_size: geometry.entry_size as usize,
            raw: vec![0u8; geometry.bytes() as usize],
        };
        for (i, e) in entries.iter().enumerate() {
            table.set_entry(i, e);
        }
        Ok(table)
    }

    #[inline]
    pub fn geometry(&self) -> TableGeometry {
        TableGeometry {
            num_entries: self.len() as u32,
            entry_size: self.entry_size as u32,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len() / self.entry_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn entry_size(&self) -> usize {
        self.entry_size
    }

    #[inline]
    fn slot(&self, index: usize) -> &[u8] {
        let off = index * self.entry_size;
        &self.raw[off..off + self.entry_size]
    }

    /// Decodes slot `index`. Panics if `index >= len()`.
    pub fn entry(&self, index: usize) -> GptEntry {
        let raw = RawGptEntry::read_from_bytes(&self.slot(index)[..ENTRY_LEN])
            .unwrap_or_else(|_| unreachable!("slot holds at least ENTRY_LEN bytes"));
        GptEntry::from(raw)
    }

    /// Every slot in index order, empty ones included.
    pub fn entries(&self) -> Vec<GptEntry> {
        (0..self.len()).map(|i| self.entry(i)).collect()
    }

    /// Non-empty slots with their index.
    pub fn used(&self) -> impl Iterator<Item = (usize, GptEntry)> + '_ {
        (0..self.len())
            .map(|i| (i, self.entry(i)))
            .filter(|(_, e)| !e.is_empty())
    }

    /// Overwrites the 128-byte prefix of slot `index`. Panics if out of range.
    pub fn set_entry(&mut self, index: usize, entry: &GptEntry) {
        let off = index * self.entry_size;
        entry.encode_into(&mut self.raw[off..off + ENTRY_LEN]);
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    #[inline]
    pub fn crc32(&self) -> u32 {
        table_crc32(&self.raw)
    }
}

// ---------------------------------------------------------------------
// Free-function codec
// ---------------------------------------------------------------------

#[inline]
pub fn decode_header(bytes: &[u8]) -> GptResult<GptHeader> {
    GptHeader::decode(bytes)
}

#[inline]
pub fn encode_header(header: &GptHeader) -> Vec<u8> {
    header.encode()
}

#[inline]
pub fn decode_entry(bytes: &[u8]) -> GptResult<GptEntry> {
    GptEntry::decode(bytes)
}

#[inline]
pub fn encode_entry(entry: &GptEntry, entry_size: usize) -> Vec<u8> {
    entry.encode(entry_size)
}
