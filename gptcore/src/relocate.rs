// SPDX-License-Identifier: MIT

//! Relocation engine: recomputes the usable range and backup location for
//! the device's real size and repositions partitions inside it.
//!
//! Partitions keep their sector length and their table-slot order; they are
//! never sorted by LBA.

use alloc::vec::Vec;

use crate::errors::*;
use crate::gpt::{GptHeader, PartitionTable, TableGeometry};
use crate::layout::*;

/// One header sector plus 33 entry sectors, the traditional first usable LBA.
pub const CONVENTIONAL_BASE_LBA: u64 = 34;

/// Where contiguous packing starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelocationBase {
    /// The header's `first_usable_lba`.
    #[default]
    FirstUsable,
    /// A fixed LBA, e.g. [`CONVENTIONAL_BASE_LBA`].
    Fixed(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationPolicy {
    /// Packs non-empty entries back to back from the base, no gaps.
    Contiguous(RelocationBase),
    /// Starts at `first_usable_lba` and keeps the gap each entry had to its
    /// predecessor in slot order. Leaves an already valid table untouched.
    PreserveGaps,
}

impl Default for RelocationPolicy {
    fn default() -> Self {
        RelocationPolicy::Contiguous(RelocationBase::FirstUsable)
    }
}

/// What to do with a typed entry whose start or end LBA is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZeroLbaPolicy {
    /// Leave the slot untouched and do not reserve space for it.
    #[default]
    Skip,
    /// Fail with `CorruptEntry`.
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocationOptions {
    pub policy: RelocationPolicy,
    pub zero_lba: ZeroLbaPolicy,
}

impl RelocationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: RelocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_zero_lba(mut self, zero_lba: ZeroLbaPolicy) -> Self {
        self.zero_lba = zero_lba;
        self
    }
}

/// Metadata placement for a device of `total_sectors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskLayout {
    pub total_sectors: u64,
    pub table_sectors: u64,
    pub backup_lba: u64,
    pub backup_table_lba: u64,
    pub last_usable_lba: u64,
}

impl DiskLayout {
    pub fn compute(device_bytes: u64, geometry: TableGeometry) -> GptResult<Self> {
        if !device_bytes.is_multiple_of(SECTOR_SIZE) {
            return Err(GptError::NotASectorMultiple {
                bytes: device_bytes,
            });
        }
        let total_sectors = device_bytes / SECTOR_SIZE;
        let table_sectors = geometry.sectors();
        // MBR, primary header, primary table, backup table, backup header
        let needed = 2 + 2 * table_sectors + 1;

        let too_small = GptError::DeviceTooSmall {
            sectors: total_sectors,
            needed,
        };
        if total_sectors <= needed {
            return Err(too_small);
        }

        let backup_lba = total_sectors - 1;
        let backup_table_lba = backup_lba - table_sectors;
        let last_usable_lba = backup_table_lba - 1;

        Ok(Self {
            total_sectors,
            table_sectors,
            backup_lba,
            backup_table_lba,
            last_usable_lba,
        })
    }
}

/// Old and new placement of one non-empty slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionMove {
    pub index: usize,
    pub old_start: u64,
    pub old_end: u64,
    pub new_start: u64,
    pub new_end: u64,
}

impl PartitionMove {
    #[inline]
    pub fn moved(&self) -> bool {
        self.old_start != self.new_start
    }
}

/// Corrected primary header and table plus the derived backup header.
#[derive(Debug, Clone)]
pub struct Relocation {
    pub primary: GptHeader,
    pub backup: GptHeader,
    pub table: PartitionTable,
    pub layout: DiskLayout,
    pub moves: Vec<PartitionMove>,
    /// Typed slots skipped by `ZeroLbaPolicy::Skip`.
    pub skipped: Vec<usize>,
}

impl Relocation {
    #[inline]
    pub fn backup_table_lba(&self) -> u64 {
        self.layout.backup_table_lba
    }

    /// True when at least one partition changed position.
    pub fn has_moves(&self) -> bool {
        self.moves.iter().any(PartitionMove::moved)
    }
}

fn resolve_base(primary: &GptHeader, policy: RelocationPolicy, table_end: u64) -> GptResult<u64> {
    match policy {
        RelocationPolicy::Contiguous(RelocationBase::Fixed(base)) => {
            if base < table_end {
                return Err(GptError::Invalid(
                    "GPT: relocation base overlaps the primary partition table",
                ));
            }
            Ok(base)
        }
        RelocationPolicy::Contiguous(RelocationBase::FirstUsable)
        | RelocationPolicy::PreserveGaps => Ok(primary.first_usable_lba),
    }
}

/// Recomputes every LBA-dependent field of `primary` for a device of
/// `device_bytes`, repositions the non-empty entries of `table`, and derives
/// the mirrored backup header. Both returned headers carry fresh CRCs.
pub fn relocate(
    primary: &GptHeader,
    table: &PartitionTable,
    device_bytes: u64,
    opts: &RelocationOptions,
) -> GptResult<Relocation> {
    let geometry = table.geometry();
    let layout = DiskLayout::compute(device_bytes, geometry)?;

    if primary.partition_table_lba <= PRIMARY_HEADER_LBA {
        return Err(GptError::Invalid(
            "GPT: primary partition table overlaps the primary header",
        ));
    }
    let table_end = primary
        .partition_table_lba
        .checked_add(layout.table_sectors)
        .ok_or(GptError::Invalid("GPT: partition table LBA overflow"))?;
    if table_end > layout.backup_table_lba {
        return Err(GptError::DeviceTooSmall {
            sectors: layout.total_sectors,
            needed: table_end + layout.table_sectors + 1,
        });
    }

    let base = resolve_base(primary, opts.policy, table_end)?;
    let first_usable = primary.first_usable_lba.min(base);
    if first_usable < table_end {
        return Err(GptError::Invalid(
            "GPT: first usable LBA overlaps the primary partition table",
        ));
    }
    if first_usable > layout.last_usable_lba {
        return Err(GptError::DeviceTooSmall {
            sectors: layout.total_sectors,
            needed: first_usable + layout.table_sectors + 1,
        });
    }

    let mut table = table.clone();
    let mut moves = Vec::new();
    let mut skipped = Vec::new();
    let mut cursor = base;
    let mut prev_old_end: Option<u64> = None;

    for index in 0..table.len() {
        let mut e = table.entry(index);
        if e.is_empty() {
            continue;
        }
        if e.has_zero_lba() {
            match opts.zero_lba {
                ZeroLbaPolicy::Skip => {
                    skipped.push(index);
                    continue;
                }
                ZeroLbaPolicy::Reject => {
                    return Err(GptError::CorruptEntry {
                        index,
                        reason: "typed entry with a zero start or end LBA",
                    });
                }
            }
        }
        let size = e.sectors().ok_or(GptError::CorruptEntry {
            index,
            reason: "partition ends before it starts",
        })?;

        let new_start = match opts.policy {
            RelocationPolicy::PreserveGaps => {
                let anchor = prev_old_end.map_or(primary.first_usable_lba, |end| end.saturating_add(1));
                cursor
                    .checked_add(e.start_lba.saturating_sub(anchor))
                    .ok_or(GptError::Invalid("GPT: LBA overflow"))?
            }
            RelocationPolicy::Contiguous(_) => cursor,
        };
        let new_end = new_start
            .checked_add(size - 1)
            .ok_or(GptError::Invalid("GPT: LBA overflow"))?;
        if new_end > layout.last_usable_lba {
            return Err(GptError::DoesNotFit {
                index,
                end: new_end,
                last_usable: layout.last_usable_lba,
            });
        }

        moves.push(PartitionMove {
            index,
            old_start: e.start_lba,
            old_end: e.end_lba,
            new_start,
            new_end,
        });
        prev_old_end = Some(e.end_lba);

        e.start_lba = new_start;
        e.end_lba = new_end;
        table.set_entry(index, &e);
        cursor = new_end + 1;
    }

    let mut hdr = *primary;
    hdr.current_lba = PRIMARY_HEADER_LBA;
    hdr.backup_lba = layout.backup_lba;
    hdr.first_usable_lba = first_usable;
    hdr.last_usable_lba = layout.last_usable_lba;
    hdr.num_partitions = geometry.num_entries;
    hdr.partition_entry_size = geometry.entry_size;
    hdr.partition_table_crc32 = table.crc32();
    hdr.refresh_crc();

    let backup = hdr.to_backup(layout.backup_lba, layout.backup_table_lba);

    Ok(Relocation {
        primary: hdr,
        backup,
        table,
        layout,
        moves,
        skipped,
    })
}
