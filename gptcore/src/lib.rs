// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod io_ext;

pub mod checksum;
pub mod errors;
/// GUID Partition Table codec: headers, entries and the raw entry array.
pub mod gpt;
pub mod guid;
/// Byte offsets and wire records of the on-disk structures.
pub mod layout;
/// Reading both metadata copies and decoding dumps.
pub mod reader;
pub mod relocate;
pub mod repair;
pub mod verify;
pub mod writer;

pub use io_ext::SectorIOLbaExt;

pub use errors::{CommitStep, GptError, GptResult};
pub use gpt::{GptEntry, GptHeader, PartitionTable, TableGeometry};
pub use guid::{Guid, format_guid};
pub use reader::{GptCopy, decode_blob, read_backup, read_primary};
pub use relocate::{
    CONVENTIONAL_BASE_LBA, Relocation, RelocationBase, RelocationOptions, RelocationPolicy,
    ZeroLbaPolicy, relocate,
};
pub use repair::{RepairOptions, RepairReport, repair_disk};
pub use verify::{Issue, VerifyReport, verify};
pub use writer::{WriteOrder, commit};
