// SPDX-License-Identifier: MIT
use alloc::vec;

use gptio::prelude::*;

use crate::checksum::header_crc32;
use crate::errors::*;
use crate::gpt::{GptHeader, PartitionTable};
use crate::io_ext::SectorIOLbaExt;
use crate::layout::*;

/// One decoded copy of the GPT metadata, with stored and recomputed checksums
/// side by side.
#[derive(Debug, Clone)]
pub struct GptCopy {
    pub header: GptHeader,
    pub table: PartitionTable,
    /// CRC of the header bytes as read, checksum field zeroed.
    pub computed_header_crc: u32,
    pub computed_table_crc: u32,
}

impl GptCopy {
    fn from_parts(header_sector: &[u8], header: GptHeader, table: PartitionTable) -> Self {
        let computed_header_crc = header_crc32(&header_sector[..header.header_size as usize]);
        let computed_table_crc = table.crc32();
        Self {
            header,
            table,
            computed_header_crc,
            computed_table_crc,
        }
    }

    #[inline]
    pub fn header_crc_ok(&self) -> bool {
        self.computed_header_crc == self.header.header_crc32
    }

    #[inline]
    pub fn table_crc_ok(&self) -> bool {
        self.computed_table_crc == self.header.partition_table_crc32
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.header_crc_ok() && self.table_crc_ok()
    }
}

/// Device size in bytes and in whole sectors.
pub fn device_sectors<IO: SectorIO + ?Sized>(io: &mut IO) -> GptResult<(u64, u64)> {
    let bytes = io.len()?;
    if !bytes.is_multiple_of(SECTOR_SIZE) {
        return Err(GptError::NotASectorMultiple { bytes });
    }
    Ok((bytes, bytes / SECTOR_SIZE))
}

/// Reads the sector at `lba` and decodes it as a header.
pub fn read_header_at<IO: SectorIO + ?Sized>(io: &mut IO, lba: u64) -> GptResult<GptHeader> {
    let sector = io.read_sector(lba)?;
    GptHeader::decode(&sector)
}

/// Reads the entry array described by `header`, bounds-checked against the
/// device size.
pub fn read_table<IO: SectorIO + ?Sized>(
    io: &mut IO,
    header: &GptHeader,
    device_bytes: u64,
) -> GptResult<PartitionTable> {
    let geometry = header.geometry();
    geometry.validate()?;

    let len = geometry.bytes();
    let offset = header
        .partition_table_lba
        .checked_mul(SECTOR_SIZE)
        .ok_or(GptError::Invalid("GPT: partition table LBA overflow"))?;
    match offset.checked_add(len) {
        Some(end) if end <= device_bytes => {}
        _ => {
            return Err(GptError::TableOutOfBounds {
                offset,
                len,
                device: device_bytes,
            });
        }
    }

    let mut buf = vec![0u8; len as usize];
    io.read_at(offset, &mut buf)?;
    PartitionTable::from_bytes(buf, geometry)
}

/// Reads header + table of the copy whose header lives at `lba`.
pub fn read_copy_at<IO: SectorIO + ?Sized>(
    io: &mut IO,
    lba: u64,
    device_bytes: u64,
) -> GptResult<GptCopy> {
    let sector = io.read_sector(lba)?;
    let header = GptHeader::decode(&sector)?;
    let table = read_table(io, &header, device_bytes)?;
    Ok(GptCopy::from_parts(&sector, header, table))
}

/// Reads the primary copy at LBA 1.
pub fn read_primary<IO: SectorIO + ?Sized>(io: &mut IO) -> GptResult<GptCopy> {
    let (bytes, _) = device_sectors(io)?;
    read_copy_at(io, PRIMARY_HEADER_LBA, bytes)
}

/// Reads the backup copy the primary points to, or the last sector when the
/// primary's pointer is outside the device.
pub fn read_backup<IO: SectorIO + ?Sized>(
    io: &mut IO,
    primary: &GptHeader,
) -> GptResult<GptCopy> {
    let (bytes, sectors) = device_sectors(io)?;
    let lba = backup_lba_hint(primary, sectors)
        .ok_or(GptError::DeviceTooSmall { sectors, needed: 2 })?;
    read_copy_at(io, lba, bytes)
}

fn backup_lba_hint(primary: &GptHeader, sectors: u64) -> Option<u64> {
    let last = sectors.checked_sub(1).filter(|&l| l > PRIMARY_HEADER_LBA)?;
    match primary.backup_lba {
        lba if lba > PRIMARY_HEADER_LBA && lba <= last => Some(lba),
        _ => Some(last),
    }
}

/// Decodes a 16896-byte dump (protective MBR, header sector, 128 * 128 entry
/// array) without a device.
pub fn decode_blob(bytes: &[u8]) -> GptResult<GptCopy> {
    if bytes.len() < GPT_BLOB_SIZE {
        return Err(GptError::Decode {
            what: "GPT blob",
            need: GPT_BLOB_SIZE,
            got: bytes.len(),
        });
    }
    let sector_len = SECTOR_SIZE as usize;
    let sector = &bytes[sector_len..2 * sector_len];
    let header = GptHeader::decode(sector)?;

    let geometry = header.geometry();
    geometry.validate()?;
    let entries = &bytes[2 * sector_len..];
    let len = geometry.bytes() as usize;
    if len > entries.len() {
        return Err(GptError::Decode {
            what: "GPT blob partition table",
            need: len,
            got: entries.len(),
        });
    }
    let table = PartitionTable::from_bytes(entries[..len].to_vec(), geometry)?;
    Ok(GptCopy::from_parts(sector, header, table))
}
