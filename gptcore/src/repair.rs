// SPDX-License-Identifier: MIT

use gptio::prelude::*;

use crate::errors::*;
use crate::reader;
use crate::relocate::{Relocation, RelocationOptions, RelocationPolicy, ZeroLbaPolicy, relocate};
use crate::writer::{WriteOrder, commit_relocation};

/// Options for [`repair_disk`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairOptions {
    pub relocation: RelocationOptions,
    pub write_order: WriteOrder,
    /// Compute the relocation but write nothing.
    pub dry_run: bool,
}

impl RepairOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: RelocationPolicy) -> Self {
        self.relocation.policy = policy;
        self
    }

    pub fn with_zero_lba(mut self, zero_lba: ZeroLbaPolicy) -> Self {
        self.relocation.zero_lba = zero_lba;
        self
    }

    pub fn with_write_order(mut self, order: WriteOrder) -> Self {
        self.write_order = order;
        self
    }

    pub fn backup_first(self) -> Self {
        self.with_write_order(WriteOrder::BackupFirst)
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RepairReport {
    pub relocation: Relocation,
    pub total_sectors: u64,
    /// False for dry runs.
    pub written: bool,
}

/// Reads the primary GPT, relocates it for the device's current size and
/// commits both copies.
///
/// Checksum mismatches in the primary copy are not fatal: its fields are
/// trusted and fresh checksums are written.
pub fn repair_disk<IO: SectorIO + ?Sized>(
    io: &mut IO,
    opts: &RepairOptions,
) -> GptResult<RepairReport> {
    let (device_bytes, total_sectors) = reader::device_sectors(io)?;
    let primary = reader::read_primary(io)?;

    let relocation = relocate(
        &primary.header,
        &primary.table,
        device_bytes,
        &opts.relocation,
    )?;

    if !opts.dry_run {
        commit_relocation(io, &relocation, opts.write_order)?;
    }

    Ok(RepairReport {
        relocation,
        total_sectors,
        written: !opts.dry_run,
    })
}
