// SPDX-License-Identifier: MIT

use std::path::Path;
use std::process::{Command, Output};

use gptcore::layout::*;
use gptcore::writer::CommitPlan;
use gptcore::{GptEntry, GptHeader, PartitionTable, TableGeometry, WriteOrder, commit};
use gptio::prelude::*;

const ESP: [u8; 16] = [
    0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9, 0x3b,
];
const SECTORS: u64 = 20_480;

fn gptfix(args: &[&str], path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gptfix"))
        .args(args)
        .arg(path)
        .output()
        .unwrap()
}

/// Consistent GPT for `SECTORS`, then zero-extended to `grow_to` sectors.
fn write_image(path: &Path, grow_to: u64) {
    let entries = [GptEntry::new(ESP, [9; 16], 2048, 4095, 0, "EFI")];
    let table = PartitionTable::from_entries(&entries, TableGeometry::default()).unwrap();
    let mut hdr = GptHeader {
        signature: *GPT_SIGNATURE,
        revision: GPT_REVISION,
        header_size: HEADER_LEN as u32,
        header_crc32: 0,
        reserved: 0,
        current_lba: PRIMARY_HEADER_LBA,
        backup_lba: SECTORS - 1,
        first_usable_lba: 34,
        last_usable_lba: SECTORS - 34,
        disk_guid: [0x77; 16],
        partition_table_lba: PRIMARY_ENTRIES_LBA,
        num_partitions: DEFAULT_NUM_ENTRIES,
        partition_entry_size: DEFAULT_ENTRY_SIZE,
        partition_table_crc32: table.crc32(),
    };
    hdr.refresh_crc();
    let backup = hdr.to_backup(SECTORS - 1, SECTORS - 33);

    let mut img = vec![0u8; (SECTORS * SECTOR_SIZE) as usize];
    let mut io = MemSectorIO::new(&mut img);
    let plan = CommitPlan {
        primary: &hdr,
        backup: &backup,
        table: &table,
    };
    commit(&mut io, plan, WriteOrder::PrimaryFirst).unwrap();
    img.resize((grow_to * SECTOR_SIZE) as usize, 0);
    std::fs::write(path, img).unwrap();
}

#[test]
fn info_prints_header_and_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.img");
    write_image(&path, SECTORS);

    let out = gptfix(&["info"], &path);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("HeaderCRC32 (calculated):"));
    assert!(stdout.contains("EFI System Partition"));
    assert!(stdout.contains("c12a7328-f81f-11d2-ba4b-00a0c93ec93b"));
}

#[test]
fn verify_then_repair_grown_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grown.img");
    write_image(&path, SECTORS * 4);

    let out = gptfix(&["verify"], &path);
    assert_eq!(out.status.code(), Some(1));

    let out = gptfix(&["repair", "--policy", "preserve-gaps"], &path);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = gptfix(&["verify"], &path);
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn dry_run_leaves_image_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grown.img");
    write_image(&path, SECTORS * 2);
    let before = std::fs::read(&path).unwrap();

    let out = gptfix(&["repair", "--dry-run"], &path);
    assert!(out.status.success());
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn missing_file_is_one_line_and_status_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = gptfix(&["info"], &dir.path().join("absent.img"));
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(stderr.trim_end().lines().count(), 1);
}

#[test]
fn missing_argument_is_status_two() {
    let out = Command::new(env!("CARGO_BIN_EXE_gptfix"))
        .arg("verify")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
}
