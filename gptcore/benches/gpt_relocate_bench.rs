// cargo bench -p gptcore
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use gptcore::layout::*;
use gptcore::{
    GptEntry, GptHeader, PartitionTable, RelocationOptions, RelocationPolicy, RepairOptions,
    TableGeometry, checksum, relocate, repair_disk,
};
use gptio::prelude::MemSectorIO;

criterion_group!(benches, bench_crc, bench_relocate, bench_repair);
criterion_main!(benches);

const TYPE: [u8; 16] = [0xAF; 16];

fn make_guid(i: usize) -> [u8; 16] {
    (i as u128 + 1).to_le_bytes()
}

/// Header for a `total`-sector disk plus `n` slots of 1024 sectors with
/// a 7-sector gap between them.
fn make_header_and_table(total: u64, n: usize) -> (GptHeader, PartitionTable) {
    let geometry = TableGeometry {
        num_entries: n.max(128) as u32,
        entry_size: DEFAULT_ENTRY_SIZE,
    };
    let entries: Vec<GptEntry> = (0..n)
        .map(|i| {
            let start = 2048 + i as u64 * 1031;
            GptEntry::new(TYPE, make_guid(i), start, start + 1023, 0, &format!("p{i}"))
        })
        .collect();
    let table = PartitionTable::from_entries(&entries, geometry).unwrap();
    let table_sectors = geometry.sectors();

    let mut hdr = GptHeader {
        signature: *GPT_SIGNATURE,
        revision: GPT_REVISION,
        header_size: HEADER_LEN as u32,
        header_crc32: 0,
        reserved: 0,
        current_lba: PRIMARY_HEADER_LBA,
        backup_lba: total - 1,
        first_usable_lba: PRIMARY_ENTRIES_LBA + table_sectors,
        last_usable_lba: total - 2 - table_sectors,
        disk_guid: make_guid(usize::MAX - 1),
        partition_table_lba: PRIMARY_ENTRIES_LBA,
        num_partitions: geometry.num_entries,
        partition_entry_size: geometry.entry_size,
        partition_table_crc32: table.crc32(),
    };
    hdr.refresh_crc();
    (hdr, table)
}

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpt_crc");
    for &n in &[128usize, 1024, 4096] {
        let (hdr, table) = make_header_and_table(8_000_000, n);
        let header_bytes = hdr.encode();

        group.bench_with_input(BenchmarkId::new("table", n), &n, |b, &_n| {
            b.iter(|| std::hint::black_box(table.crc32()));
        });
        group.bench_with_input(BenchmarkId::new("header", n), &n, |b, &_n| {
            b.iter(|| std::hint::black_box(checksum::header_crc32(&header_bytes)));
        });
    }
    group.finish();
}

fn bench_relocate(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpt_relocate");
    for &n in &[128usize, 1024, 4096] {
        let (hdr, table) = make_header_and_table(8_000_000, n);
        let grown = 16_000_000 * SECTOR_SIZE;

        for (label, policy) in [
            ("contiguous", RelocationPolicy::default()),
            ("preserve_gaps", RelocationPolicy::PreserveGaps),
        ] {
            let opts = RelocationOptions::new().with_policy(policy);
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &_n| {
                b.iter(|| {
                    let r = relocate(&hdr, &table, grown, &opts).unwrap();
                    std::hint::black_box(r.moves.len())
                });
            });
        }
    }
    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("gpt_repair_mem");
    let total = 400_000u64;
    for &n in &[128usize, 256] {
        let (hdr, table) = make_header_and_table(total / 2, n);
        let mut image = vec![0u8; (total * SECTOR_SIZE) as usize];
        image[512..1024].copy_from_slice(&hdr.encode_sector());
        let off = (PRIMARY_ENTRIES_LBA * SECTOR_SIZE) as usize;
        image[off..off + table.as_bytes().len()].copy_from_slice(table.as_bytes());

        group.bench_with_input(BenchmarkId::new("dry_run", n), &n, |b, &_n| {
            let mut io = MemSectorIO::new(&mut image);
            let opts = RepairOptions::new().dry_run();
            b.iter(|| {
                let report = repair_disk(&mut io, &opts).unwrap();
                std::hint::black_box(report.total_sectors)
            });
        });
    }
    group.finish();
}
