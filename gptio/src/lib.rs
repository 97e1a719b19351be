// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod errors;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::SectorIO;
    pub use super::SectorIOExt;
    pub use super::errors::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemSectorIO;

    #[cfg(feature = "std")]
    pub use super::std::StdSectorIO;
}

// Internal use
use errors::*;

/// Size of the scratch buffer used by chunked helpers.
/// 4 KiB keeps no_std stack usage reasonable.
pub const BLOCK_BUF_SIZE: usize = 4096;

/// Random-access byte storage over a disk image or block device.
///
/// Offsets are absolute byte positions. Every call either transfers the
/// whole buffer or fails; a backend that runs out of data reports
/// `ShortRead` / `ShortWrite` with the number of bytes it managed to move.
pub trait SectorIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> SectorIOResult;

    /// Total size of the underlying storage in bytes.
    fn len(&mut self) -> SectorIOResult<u64>;

    #[inline]
    fn is_empty(&mut self) -> SectorIOResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl<T: SectorIO + ?Sized> SectorIO for &mut T {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        (**self).write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> SectorIOResult {
        (**self).flush()
    }

    #[inline]
    fn len(&mut self) -> SectorIOResult<u64> {
        (**self).len()
    }
}

/// Extension helpers for SectorIO.
pub trait SectorIOExt: SectorIO {
    /// Returns true when `len` bytes starting at `offset` fit in the storage.
    #[inline]
    fn contains_range(&mut self, offset: u64, len: u64) -> SectorIOResult<bool> {
        let end = offset.checked_add(len).ok_or(SectorIOError::OutOfBounds)?;
        Ok(end <= self.len()?)
    }

    /// Fills a region with zeroes.
    #[inline]
    fn zero_fill(&mut self, offset: u64, len: usize) -> SectorIOResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len());
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }
}

impl<T: SectorIO + ?Sized> SectorIOExt for T {}
