// SPDX-License-Identifier: MIT

use crate::{SectorIO, SectorIOResult};

/// Simple counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    // Sector alignment of each access
    pub aligned_reads: u64,
    pub unaligned_reads: u64,
    pub aligned_writes: u64,
    pub unaligned_writes: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Transparent instrumentation wrapper.
pub struct IOCounter<'a, IO: SectorIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
    /// Alignment used to classify accesses (usually the sector size).
    pub align: u64,
}

impl<'a, IO: SectorIO + ?Sized> IOCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self::with_align(inner, 1)
    }

    #[inline]
    pub fn with_align(inner: &'a mut IO, align: u64) -> Self {
        let align = if align == 0 { 1 } else { align };
        Self {
            inner,
            stats: IoStats::default(),
            align,
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }

    #[inline]
    fn is_aligned(&self, offset: u64, len: usize) -> bool {
        offset.is_multiple_of(self.align) && (len as u64).is_multiple_of(self.align)
    }
}

impl<IO: SectorIO + ?Sized> SectorIO for IOCounter<'_, IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        if self.is_aligned(offset, data.len()) {
            self.stats.aligned_writes += 1;
        } else {
            self.stats.unaligned_writes += 1;
        }
        self.stats.writes += 1;
        self.stats.write_bytes += data.len() as u64;

        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        if self.is_aligned(offset, buf.len()) {
            self.stats.aligned_reads += 1;
        } else {
            self.stats.unaligned_reads += 1;
        }
        self.stats.reads += 1;
        self.stats.read_bytes += buf.len() as u64;

        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> SectorIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }

    #[inline]
    fn len(&mut self) -> SectorIOResult<u64> {
        self.inner.len()
    }
}

/// Callbacks invoked before each operation reaches the wrapped backend.
pub trait IOTracer {
    fn on_read(&mut self, _off: u64, _len: usize) {}
    fn on_write(&mut self, _off: u64, _len: usize) {}
    fn on_flush(&mut self) {}
}

pub struct TracingIO<'a, IO: SectorIO + ?Sized, Tr: IOTracer> {
    inner: &'a mut IO,
    tracer: Tr,
}

impl<'a, IO: SectorIO + ?Sized, Tr: IOTracer> TracingIO<'a, IO, Tr> {
    #[inline]
    pub fn new(inner: &'a mut IO, tracer: Tr) -> Self {
        Self { inner, tracer }
    }

    #[inline]
    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    #[inline]
    pub fn into_tracer(self) -> Tr {
        self.tracer
    }
}

impl<IO: SectorIO + ?Sized, Tr: IOTracer> SectorIO for TracingIO<'_, IO, Tr> {
    fn write_at(&mut self, off: u64, data: &[u8]) -> SectorIOResult {
        self.tracer.on_write(off, data.len());
        self.inner.write_at(off, data)
    }
    fn read_at(&mut self, off: u64, buf: &mut [u8]) -> SectorIOResult {
        self.tracer.on_read(off, buf.len());
        self.inner.read_at(off, buf)
    }
    fn flush(&mut self) -> SectorIOResult {
        self.tracer.on_flush();
        self.inner.flush()
    }
    fn len(&mut self) -> SectorIOResult<u64> {
        self.inner.len()
    }
}
