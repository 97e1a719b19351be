// SPDX-License-Identifier: MIT

use std::io::{Error, ErrorKind, Read, Seek, SeekFrom, Write};

use crate::{SectorIO, SectorIOError, SectorIOResult};

/// `SectorIO` over anything seekable: regular files, block devices, cursors.
#[derive(Debug)]
pub struct StdSectorIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
}

impl<'a, T: Read + Write + Seek> StdSectorIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self { io }
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut T {
        self.io
    }
}

impl<T: Read + Write + Seek> SectorIO for StdSectorIO<'_, T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        let mut done = 0;
        while done < data.len() {
            match self.io.write(&data[done..]) {
                Ok(0) => {
                    return Err(SectorIOError::ShortWrite {
                        offset,
                        wanted: data.len(),
                        got: done,
                    });
                }
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        let mut done = 0;
        while done < buf.len() {
            match self.io.read(&mut buf[done..]) {
                Ok(0) => {
                    return Err(SectorIOError::ShortRead {
                        offset,
                        wanted: buf.len(),
                        got: done,
                    });
                }
                Ok(n) => done += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> SectorIOResult {
        self.io.flush()?;
        Ok(())
    }

    /// Seeking to the end also works for block devices, whose metadata
    /// length is reported as 0.
    fn len(&mut self) -> SectorIOResult<u64> {
        let len = self.io.seek(SeekFrom::End(0))?;
        self.io.seek(SeekFrom::Start(0))?;
        Ok(len)
    }
}

impl From<Error> for SectorIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        SectorIOError::Io(e.kind())
    }
}
