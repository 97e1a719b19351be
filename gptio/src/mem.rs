// SPDX-License-Identifier: MIT

use crate::{SectorIO, SectorIOError, SectorIOResult};

/// In-memory implementation of `SectorIO`.
///
/// Useful for tests and for repairing images already loaded in RAM.
#[derive(Debug)]
pub struct MemSectorIO<'a> {
    buffer: &'a mut [u8],
}

impl<'a> MemSectorIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer }
    }

    /// Number of bytes available from `offset`, or `OutOfBounds` on overflow.
    #[inline]
    fn available(&self, offset: u64, len: usize) -> SectorIOResult<usize> {
        offset
            .checked_add(len as u64)
            .ok_or(SectorIOError::OutOfBounds)?;
        let size = self.buffer.len() as u64;
        Ok(size.saturating_sub(offset).min(len as u64) as usize)
    }
}

impl SectorIO for MemSectorIO<'_> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        let n = self.available(offset, data.len())?;
        if n > 0 {
            let start = offset as usize;
            self.buffer[start..start + n].copy_from_slice(&data[..n]);
        }
        if n < data.len() {
            return Err(SectorIOError::ShortWrite {
                offset,
                wanted: data.len(),
                got: n,
            });
        }
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        let n = self.available(offset, buf.len())?;
        if n > 0 {
            let start = offset as usize;
            buf[..n].copy_from_slice(&self.buffer[start..start + n]);
        }
        if n < buf.len() {
            return Err(SectorIOError::ShortRead {
                offset,
                wanted: buf.len(),
                got: n,
            });
        }
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> SectorIOResult {
        Ok(())
    }

    #[inline]
    fn len(&mut self) -> SectorIOResult<u64> {
        Ok(self.buffer.len() as u64)
    }
}
