// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for SectorIO operations.
pub type SectorIOResult<T = ()> = core::result::Result<T, SectorIOError>;

/// Error type for SectorIO operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorIOError {
    /// The backend returned fewer bytes than requested.
    ShortRead { offset: u64, wanted: usize, got: usize },
    /// The backend accepted fewer bytes than requested.
    ShortWrite { offset: u64, wanted: usize, got: usize },
    /// Offset arithmetic overflowed.
    OutOfBounds,
    /// Underlying OS error.
    #[cfg(feature = "std")]
    Io(std::io::ErrorKind),
    Other(&'static str),
}

impl SectorIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            SectorIOError::ShortRead { .. } => "short read",
            SectorIOError::ShortWrite { .. } => "short write",
            SectorIOError::OutOfBounds => "Out of bounds",
            #[cfg(feature = "std")]
            SectorIOError::Io(_) => "I/O error",
            SectorIOError::Other(msg) => *msg,
        }
    }
}

impl From<&'static str> for SectorIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        SectorIOError::Other(msg)
    }
}

impl fmt::Display for SectorIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorIOError::ShortRead { offset, wanted, got }
            | SectorIOError::ShortWrite { offset, wanted, got } => write!(
                f,
                "{} at offset {offset}: {got} of {wanted} bytes",
                self.msg()
            ),
            #[cfg(feature = "std")]
            SectorIOError::Io(kind) => write!(f, "{}: {kind}", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl core::error::Error for SectorIOError {}
