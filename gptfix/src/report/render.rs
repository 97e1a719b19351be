// SPDX-License-Identifier: MIT

use core::fmt;

use gptcore::layout::SECTOR_SIZE;
use gptcore::relocate::Relocation;
use gptcore::{GptCopy, GptEntry, VerifyReport};

use super::types::TypeNames;
use crate::utils::string::pretty_sectors;

const LABEL_WIDTH: usize = 40;

const ATTR_BITS: [(u32, &str); 3] = [
    (0, "required"),
    (1, "no-block-io"),
    (2, "legacy-bios-bootable"),
];
const TYPE_SPECIFIC_SHIFT: u32 = 48;

/// Readable names for the set attribute bits.
pub fn attribute_names(attrs: u64) -> Vec<String> {
    let mut out: Vec<String> = ATTR_BITS
        .iter()
        .filter(|(bit, _)| attrs & (1 << bit) != 0)
        .map(|(_, name)| (*name).to_string())
        .collect();
    let type_specific = attrs >> TYPE_SPECIFIC_SHIFT;
    if type_specific != 0 {
        out.push(format!("type-specific=0x{type_specific:04x}"));
    }
    out
}

fn line(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    writeln!(f, "{:<width$} {}", format!("{label}:"), value, width = LABEL_WIDTH)
}

/// Header fields with stored and recomputed checksums, then every
/// non-empty entry.
pub struct CopyReport<'a> {
    pub copy: &'a GptCopy,
    pub names: &'a TypeNames,
}

impl<'a> CopyReport<'a> {
    pub fn new(copy: &'a GptCopy, names: &'a TypeNames) -> Self {
        Self { copy, names }
    }

    fn entry(&self, f: &mut fmt::Formatter<'_>, index: usize, e: &GptEntry) -> fmt::Result {
        let type_guid = e.type_guid();
        let unique = e.unique_guid();

        writeln!(f, "\n<<< Partition entry #{index} >>>")?;
        line(f, &format!("#{index}.TypeGUID"), format_args!("0x{}", type_guid.to_hex()))?;
        line(f, &format!("#{index}.TypeGUID (canonical)"), type_guid)?;
        line(f, &format!("#{index}.Type"), self.names.name(&type_guid))?;
        line(f, &format!("#{index}.UniqueGUID"), format_args!("0x{}", unique.to_hex()))?;
        line(f, &format!("#{index}.UniqueGUID (canonical)"), unique)?;
        line(f, &format!("#{index}.StartingLBA"), e.start_lba)?;
        line(f, &format!("#{index}.EndingLBA"), e.end_lba)?;
        match e.sectors() {
            Some(n) => line(f, &format!("#{index}.Size"), pretty_sectors(n, SECTOR_SIZE))?,
            None => line(f, &format!("#{index}.Size"), "<ends before it starts>")?,
        }
        line(f, &format!("#{index}.Attributes"), format_args!("0x{:x}", e.attributes))?;
        line(
            f,
            &format!("#{index}.Attributes (decoded)"),
            format_args!("[{}]", attribute_names(e.attributes).join(",")),
        )?;
        line(f, &format!("#{index}.Name"), e.name())
    }
}

impl fmt::Display for CopyReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.copy;
        let h = &c.header;

        line(f, "Signature", format_args!("0x{}", hex(&h.signature)))?;
        line(f, "Revision", format_args!("0x{:08x}", h.revision))?;
        line(f, "HeaderSize", h.header_size)?;
        line(f, "HeaderCRC32", format_args!("0x{:08x}", h.header_crc32))?;
        line(f, "HeaderCRC32 (calculated)", format_args!("0x{:08x}", c.computed_header_crc))?;
        line(f, "Reserved", format_args!("0x{:08x}", h.reserved))?;
        line(f, "MyLBA", h.current_lba)?;
        line(f, "AlternateLBA", h.backup_lba)?;
        line(f, "FirstUsableLBA", h.first_usable_lba)?;
        line(f, "LastUsableLBA", h.last_usable_lba)?;
        line(f, "DiskGUID", h.disk_guid())?;
        line(f, "PartitionEntryLBA", h.partition_table_lba)?;
        line(f, "NumberOfPartitionEntries", h.num_partitions)?;
        line(f, "SizeOfPartitionEntry", h.partition_entry_size)?;
        line(f, "PartitionEntryArrayCRC32", format_args!("0x{:08x}", h.partition_table_crc32))?;
        line(
            f,
            "PartitionEntryArrayCRC32 (calculated)",
            format_args!("0x{:08x}", c.computed_table_crc),
        )?;

        writeln!(f, "\n{}", "#".repeat(92))?;
        for (index, e) in c.table.used() {
            self.entry(f, index, &e)?;
        }
        Ok(())
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// One line per verification issue.
pub struct IssueList<'a>(pub &'a VerifyReport);

impl fmt::Display for IssueList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.0.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

/// Table of slots moved by a relocation.
pub struct MoveTable<'a>(pub &'a Relocation);

impl fmt::Display for MoveTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  ┌──────┬──────────────────────────────┬──────────────────────────────┐")?;
        writeln!(f, "  | Slot | Old range                    | New range                    |")?;
        writeln!(f, "  ├──────┼──────────────────────────────┼──────────────────────────────┤")?;
        for m in self.0.moves.iter().filter(|m| m.moved()) {
            writeln!(
                f,
                "  | {:<4} | {:<28} | {:<28} |",
                m.index,
                format!("{}..={}", m.old_start, m.old_end),
                format!("{}..={}", m.new_start, m.new_end),
            )?;
        }
        write!(f, "  └──────┴──────────────────────────────┴──────────────────────────────┘")
    }
}
