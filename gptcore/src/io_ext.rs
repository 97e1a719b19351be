// SPDX-License-Identifier: MIT

//! LBA-aware SectorIO helpers to avoid `* SECTOR_SIZE` everywhere,
//! with overflow checks.

use gptio::prelude::*;

use crate::layout::SECTOR_SIZE;

/// Offset = LBA * SECTOR_SIZE (with overflow-check)
#[inline]
pub(crate) fn lba_offset(lba: u64) -> SectorIOResult<u64> {
    lba.checked_mul(SECTOR_SIZE)
        .ok_or(SectorIOError::Other("lba_offset overflow"))
}

pub trait SectorIOLbaExt: SectorIO {
    /// Reads `buf.len()` bytes starting at sector `lba`.
    #[inline]
    fn read_at_lba(&mut self, lba: u64, buf: &mut [u8]) -> SectorIOResult {
        let off = lba_offset(lba)?;
        self.read_at(off, buf)
    }

    /// Writes `data` starting at sector `lba`.
    #[inline]
    fn write_at_lba(&mut self, lba: u64, data: &[u8]) -> SectorIOResult {
        let off = lba_offset(lba)?;
        self.write_at(off, data)
    }

    /// Reads one whole sector.
    #[inline]
    fn read_sector(&mut self, lba: u64) -> SectorIOResult<[u8; SECTOR_SIZE as usize]> {
        let mut buf = [0u8; SECTOR_SIZE as usize];
        self.read_at_lba(lba, &mut buf)?;
        Ok(buf)
    }
}

impl<T: SectorIO + ?Sized> SectorIOLbaExt for T {}
