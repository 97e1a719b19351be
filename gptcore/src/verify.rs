// SPDX-License-Identifier: MIT
use alloc::vec::Vec;
use core::fmt;

use gptio::prelude::*;

use crate::errors::*;
use crate::gpt::find_overlap;
use crate::layout::PRIMARY_HEADER_LBA;
use crate::reader::{self, GptCopy};

/// Which metadata copy an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Primary,
    Backup,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Primary => f.write_str("primary"),
            Side::Backup => f.write_str("backup"),
        }
    }
}

/// Inconsistency found by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    HeaderCrc { copy: Side, stored: u32, computed: u32 },
    TableCrc { copy: Side, stored: u32, computed: u32 },
    BackupUnreadable(GptError),
    BackupNotAtEnd { backup_lba: u64, last_lba: u64 },
    MirrorMismatch { primary_backup_lba: u64, backup_current_lba: u64 },
    MirrorBackMismatch { backup_backup_lba: u64, primary_current_lba: u64 },
    DiskGuidMismatch,
    TableMismatch,
    UsableOverlapsBackupTable { last_usable: u64, backup_table_lba: u64 },
    EntryReversed { copy: Side, index: usize },
    EntryOutOfRange { copy: Side, index: usize },
    EntriesOverlap { copy: Side, first: usize, second: usize },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::HeaderCrc {
                copy,
                stored,
                computed,
            } => write!(
                f,
                "{copy} header CRC mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}"
            ),
            Issue::TableCrc {
                copy,
                stored,
                computed,
            } => write!(
                f,
                "{copy} partition table CRC mismatch: stored 0x{stored:08x}, computed 0x{computed:08x}"
            ),
            Issue::BackupUnreadable(e) => write!(f, "backup GPT unreadable: {e}"),
            Issue::BackupNotAtEnd {
                backup_lba,
                last_lba,
            } => write!(
                f,
                "backup header at LBA {backup_lba}, device ends at LBA {last_lba}"
            ),
            Issue::MirrorMismatch {
                primary_backup_lba,
                backup_current_lba,
            } => write!(
                f,
                "primary points to backup at LBA {primary_backup_lba}, backup says it is at {backup_current_lba}"
            ),
            Issue::MirrorBackMismatch {
                backup_backup_lba,
                primary_current_lba,
            } => write!(
                f,
                "backup points to primary at LBA {backup_backup_lba}, primary says it is at {primary_current_lba}"
            ),
            Issue::DiskGuidMismatch => f.write_str("disk GUID differs between copies"),
            Issue::TableMismatch => f.write_str("partition tables differ between copies"),
            Issue::UsableOverlapsBackupTable {
                last_usable,
                backup_table_lba,
            } => write!(
                f,
                "last usable LBA {last_usable} reaches backup table at {backup_table_lba}"
            ),
            Issue::EntryReversed { copy, index } => {
                write!(f, "{copy} entry #{index} ends before it starts")
            }
            Issue::EntryOutOfRange { copy, index } => {
                write!(f, "{copy} entry #{index} lies outside the usable range")
            }
            Issue::EntriesOverlap {
                copy,
                first,
                second,
            } => write!(f, "{copy} entries #{first} and #{second} overlap"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub primary: GptCopy,
    pub backup: Option<GptCopy>,
    pub total_sectors: u64,
    pub issues: Vec<Issue>,
}

impl VerifyReport {
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

fn check_crcs(copy: &GptCopy, which: Side, issues: &mut Vec<Issue>) {
    if !copy.header_crc_ok() {
        issues.push(Issue::HeaderCrc {
            copy: which,
            stored: copy.header.header_crc32,
            computed: copy.computed_header_crc,
        });
    }
    if !copy.table_crc_ok() {
        issues.push(Issue::TableCrc {
            copy: which,
            stored: copy.header.partition_table_crc32,
            computed: copy.computed_table_crc,
        });
    }
}

fn check_entries(copy: &GptCopy, which: Side, issues: &mut Vec<Issue>) {
    let hdr = &copy.header;
    for (index, e) in copy.table.used() {
        if e.validate_basic().is_err() {
            issues.push(Issue::EntryReversed { copy: which, index });
        } else if e
            .validate_in_bounds(hdr.first_usable_lba, hdr.last_usable_lba)
            .is_err()
        {
            issues.push(Issue::EntryOutOfRange { copy: which, index });
        }
    }
    if let Some((first, second)) = find_overlap(&copy.table.entries()) {
        issues.push(Issue::EntriesOverlap {
            copy: which,
            first,
            second,
        });
    }
}

/// Reads both copies and lists every inconsistency. Never writes.
///
/// Fails only when the primary copy itself cannot be decoded; an unreadable
/// backup is reported as an issue.
pub fn verify<IO: SectorIO + ?Sized>(io: &mut IO) -> GptResult<VerifyReport> {
    let (_, total_sectors) = reader::device_sectors(io)?;
    let primary = reader::read_primary(io)?;
    let mut issues = Vec::new();

    check_crcs(&primary, Side::Primary, &mut issues);
    check_entries(&primary, Side::Primary, &mut issues);

    let last_lba = total_sectors.saturating_sub(1);
    let p = &primary.header;
    if p.backup_lba != last_lba {
        issues.push(Issue::BackupNotAtEnd {
            backup_lba: p.backup_lba,
            last_lba,
        });
    }

    let backup = match reader::read_backup(io, p) {
        Ok(b) => Some(b),
        Err(e) => {
            issues.push(Issue::BackupUnreadable(e));
            None
        }
    };

    if let Some(b) = &backup {
        check_crcs(b, Side::Backup, &mut issues);
        let bh = &b.header;

        if p.backup_lba != bh.current_lba {
            issues.push(Issue::MirrorMismatch {
                primary_backup_lba: p.backup_lba,
                backup_current_lba: bh.current_lba,
            });
        }
        if bh.backup_lba != p.current_lba || p.current_lba != PRIMARY_HEADER_LBA {
            issues.push(Issue::MirrorBackMismatch {
                backup_backup_lba: bh.backup_lba,
                primary_current_lba: p.current_lba,
            });
        }
        if bh.disk_guid != p.disk_guid {
            issues.push(Issue::DiskGuidMismatch);
        }
        if b.table.as_bytes() != primary.table.as_bytes() {
            issues.push(Issue::TableMismatch);
        }
        // Same entries under the same usable range would only repeat the
        // primary's findings.
        if b.table.as_bytes() != primary.table.as_bytes()
            || bh.first_usable_lba != p.first_usable_lba
            || bh.last_usable_lba != p.last_usable_lba
        {
            check_entries(b, Side::Backup, &mut issues);
        }
        if p.last_usable_lba >= bh.partition_table_lba {
            issues.push(Issue::UsableOverlapsBackupTable {
                last_usable: p.last_usable_lba,
                backup_table_lba: bh.partition_table_lba,
            });
        }
    }

    Ok(VerifyReport {
        primary,
        backup,
        total_sectors,
        issues,
    })
}
