// SPDX-License-Identifier: MIT

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use gptcore::layout::*;
use gptcore::verify::Issue;
use gptcore::*;
use gptio::prelude::*;

const ESP: [u8; 16] = [
    0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9, 0x3b,
];
const LINUX: [u8; 16] = [
    0xaf, 0x3d, 0xc6, 0x0f, 0x83, 0x84, 0x72, 0x47, 0x8e, 0x79, 0x3d, 0x69, 0xd8, 0x47, 0x7d, 0xe4,
];

const SMALL: u64 = 20_480;
const MIB: u64 = 1 << 20;

fn entries() -> Vec<GptEntry> {
    vec![
        GptEntry::new(ESP, [1; 16], 2048, 4095, 0, "EFI system"),
        GptEntry::empty(),
        GptEntry::new(LINUX, [3; 16], 4096, 18_431, 1 << 2, "rootfs"),
    ]
}

/// Full, consistent GPT for a disk of `sectors`.
fn fresh_gpt(sectors: u64) -> Vec<u8> {
    let table = PartitionTable::from_entries(&entries(), TableGeometry::default()).unwrap();
    let mut hdr = GptHeader {
        signature: *GPT_SIGNATURE,
        revision: GPT_REVISION,
        header_size: HEADER_LEN as u32,
        header_crc32: 0,
        reserved: 0,
        current_lba: PRIMARY_HEADER_LBA,
        backup_lba: sectors - 1,
        first_usable_lba: 34,
        last_usable_lba: sectors - 34,
        disk_guid: [0x5A; 16],
        partition_table_lba: PRIMARY_ENTRIES_LBA,
        num_partitions: DEFAULT_NUM_ENTRIES,
        partition_entry_size: DEFAULT_ENTRY_SIZE,
        partition_table_crc32: table.crc32(),
    };
    hdr.refresh_crc();
    let backup = hdr.to_backup(sectors - 1, sectors - 33);

    let mut img = vec![0u8; (sectors * SECTOR_SIZE) as usize];
    let mut io = MemSectorIO::new(&mut img);
    let plan = writer::CommitPlan {
        primary: &hdr,
        backup: &backup,
        table: &table,
    };
    commit(&mut io, plan, WriteOrder::PrimaryFirst).unwrap();
    img
}

#[test]
fn fresh_image_is_consistent() {
    let mut img = fresh_gpt(SMALL);
    let mut io = MemSectorIO::new(&mut img);
    let report = verify(&mut io).unwrap();
    assert!(report.is_consistent(), "{:?}", report.issues);
    assert_eq!(report.total_sectors, SMALL);
    assert_eq!(report.primary.table.used().count(), 2);
}

#[test]
fn grown_image_is_detected_and_repaired() {
    let mut img = fresh_gpt(SMALL);
    img.resize((64 * MIB) as usize, 0);
    let mut io = MemSectorIO::new(&mut img);

    let before = verify(&mut io).unwrap();
    assert!(
        before
            .issues
            .iter()
            .any(|i| matches!(i, Issue::BackupNotAtEnd { .. }))
    );

    let opts = RepairOptions::new().with_policy(RelocationPolicy::PreserveGaps);
    let report = repair_disk(&mut io, &opts).unwrap();
    assert!(!report.relocation.has_moves());

    let after = verify(&mut io).unwrap();
    assert!(after.is_consistent(), "{:?}", after.issues);
    let total = 64 * MIB / SECTOR_SIZE;
    assert_eq!(after.primary.header.backup_lba, total - 1);
    assert_eq!(after.primary.header.last_usable_lba, total - 34);
    assert_eq!(after.primary.table.entries()[..3], entries()[..]);
}

#[test]
fn contiguous_repair_packs_partitions() {
    let mut img = fresh_gpt(SMALL);
    img.resize((SMALL * 2 * SECTOR_SIZE) as usize, 0);
    let mut io = MemSectorIO::new(&mut img);

    let opts = RepairOptions::new()
        .with_policy(RelocationPolicy::Contiguous(RelocationBase::Fixed(
            CONVENTIONAL_BASE_LBA,
        )))
        .backup_first();
    let report = repair_disk(&mut io, &opts).unwrap();
    let moves = &report.relocation.moves;
    assert_eq!(moves.len(), 2);
    assert_eq!((moves[0].index, moves[0].new_start), (0, 34));
    assert_eq!((moves[1].index, moves[1].new_start), (2, 34 + 2048));

    let after = verify(&mut io).unwrap();
    assert!(after.is_consistent(), "{:?}", after.issues);
    let root = after.primary.table.entry(2);
    assert_eq!(root.end_lba - root.start_lba + 1, 14_336);
    assert_eq!(root.name(), "rootfs");
}

#[test]
fn shrunk_image_reports_out_of_bounds_backup() {
    let mut img = fresh_gpt(SMALL);
    img.truncate((SMALL / 2 * SECTOR_SIZE) as usize);
    let mut io = MemSectorIO::new(&mut img);

    let report = verify(&mut io).unwrap();
    assert!(!report.is_consistent());

    // rootfs ends at 18431, past the new last usable LBA.
    assert!(matches!(
        repair_disk(&mut io, &RepairOptions::default().with_policy(RelocationPolicy::PreserveGaps)),
        Err(GptError::DoesNotFit { index: 2, .. })
    ));
}

#[test]
fn repairs_a_file_backed_image() {
    let img = fresh_gpt(SMALL);
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&img).unwrap();
    // Grow by 8 MiB of zeroes.
    file.set_len(img.len() as u64 + 8 * MIB).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut io = StdSectorIO::new(&mut file);
    repair_disk(&mut io, &RepairOptions::default()).unwrap();
    let report = verify(&mut io).unwrap();
    assert!(report.is_consistent(), "{:?}", report.issues);
}

#[test]
fn device_size_must_be_sector_multiple() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odd.img");
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    file.write_all(&fresh_gpt(SMALL)).unwrap();
    file.write_all(&[0u8; 100]).unwrap();

    let mut io = StdSectorIO::new(&mut file);
    assert!(matches!(
        repair_disk(&mut io, &RepairOptions::default()),
        Err(GptError::NotASectorMultiple { .. })
    ));
}

#[test]
fn blob_dump_decodes() {
    let img = fresh_gpt(SMALL);
    let copy = decode_blob(&img[..GPT_BLOB_SIZE]).unwrap();
    assert!(copy.is_valid());
    assert_eq!(copy.header.disk_guid().to_string().len(), 36);
    assert_eq!(
        copy.table.entry(0).type_guid().to_string(),
        "c12a7328-f81f-11d2-ba4b-00a0c93ec93b"
    );
}
