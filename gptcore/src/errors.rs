// SPDX-License-Identifier: MIT

use core::fmt;

use gptio::errors::*;

/// Commit step being executed when a write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStep {
    PrimaryHeader,
    PrimaryTable,
    BackupTable,
    BackupHeader,
    Flush,
}

impl fmt::Display for CommitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitStep::PrimaryHeader => "write primary header",
            CommitStep::PrimaryTable => "write primary partition table",
            CommitStep::BackupTable => "write backup partition table",
            CommitStep::BackupHeader => "write backup header",
            CommitStep::Flush => "flush device",
        };
        f.write_str(s)
    }
}

/// Unified error type for GPT decoding, relocation and commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GptError {
    /// Device size is not a whole number of sectors.
    NotASectorMultiple { bytes: u64 },
    /// Header does not start with "EFI PART".
    BadSignature { found: [u8; 8] },
    /// Buffer too small for a fixed-size structure.
    Decode {
        what: &'static str,
        need: usize,
        got: usize,
    },
    /// Table offset + size runs past the end of the device.
    TableOutOfBounds { offset: u64, len: u64, device: u64 },
    /// Two commit steps target overlapping sectors.
    Overlap { first: CommitStep, second: CommitStep },
    /// Read-side I/O failure, including short reads.
    Io(SectorIOError),
    /// Write-side failure during commit, tagged with the step.
    Commit {
        step: CommitStep,
        cause: SectorIOError,
    },
    /// Non-empty entry the relocation engine refuses to touch.
    CorruptEntry { index: usize, reason: &'static str },
    /// Relocated partition would end past the last usable LBA.
    DoesNotFit {
        index: usize,
        end: u64,
        last_usable: u64,
    },
    /// Device cannot hold both headers and both tables.
    DeviceTooSmall { sectors: u64, needed: u64 },
    Invalid(&'static str),
}

impl GptError {
    pub fn msg(&self) -> &'static str {
        match self {
            GptError::NotASectorMultiple { .. } => "device size is not a multiple of the sector size",
            GptError::BadSignature { .. } => "GPT: invalid signature",
            GptError::Decode { .. } => "GPT: buffer too small",
            GptError::TableOutOfBounds { .. } => "GPT: partition table beyond end of device",
            GptError::Overlap { .. } => "GPT: header and table ranges overlap",
            GptError::Io(e) => e.msg(),
            GptError::Commit { cause, .. } => cause.msg(),
            GptError::CorruptEntry { reason, .. } => *reason,
            GptError::DoesNotFit { .. } => "GPT: partition does not fit in usable range",
            GptError::DeviceTooSmall { .. } => "GPT: device too small for headers and tables",
            GptError::Invalid(msg) => *msg,
        }
    }
}

impl From<SectorIOError> for GptError {
    fn from(e: SectorIOError) -> Self {
        GptError::Io(e)
    }
}

impl From<&'static str> for GptError {
    fn from(s: &'static str) -> Self {
        GptError::Invalid(s)
    }
}

impl fmt::Display for GptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GptError::NotASectorMultiple { bytes } => {
                write!(f, "{} ({bytes} bytes)", self.msg())
            }
            GptError::BadSignature { found } => {
                write!(f, "{}: got {:02x?}", self.msg(), found)
            }
            GptError::Decode { what, need, got } => {
                write!(f, "{} for {what}: need {need} bytes, got {got}", self.msg())
            }
            GptError::TableOutOfBounds {
                offset,
                len,
                device,
            } => write!(
                f,
                "{} (offset {offset}, size {len}, device {device} bytes)",
                self.msg()
            ),
            GptError::Overlap { first, second } => {
                write!(f, "{}: {first} and {second}", self.msg())
            }
            GptError::Io(_) => f.write_str("device I/O failed"),
            GptError::Commit { step, .. } => write!(f, "{step} failed"),
            GptError::CorruptEntry { index, reason } => {
                write!(f, "entry #{index}: {reason}")
            }
            GptError::DoesNotFit {
                index,
                end,
                last_usable,
            } => write!(
                f,
                "{}: entry #{index} would end at LBA {end}, last usable is {last_usable}",
                self.msg()
            ),
            GptError::DeviceTooSmall { sectors, needed } => write!(
                f,
                "{} ({sectors} sectors, need more than {needed})",
                self.msg()
            ),
            GptError::Invalid(msg) => f.write_str(msg),
        }
    }
}

impl core::error::Error for GptError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            GptError::Io(e) | GptError::Commit { cause: e, .. } => Some(e),
            _ => None,
        }
    }
}

pub type GptResult<T = ()> = Result<T, GptError>;
