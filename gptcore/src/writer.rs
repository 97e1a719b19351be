// SPDX-License-Identifier: MIT

//! Consistency writer: persists corrected headers and entry arrays.

use gptio::prelude::*;

use crate::errors::*;
use crate::gpt::{GptHeader, PartitionTable};
use crate::io_ext::SectorIOLbaExt;
use crate::layout::*;
use crate::relocate::Relocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteOrder {
    /// Primary header, primary table, backup table, backup header.
    #[default]
    PrimaryFirst,
    /// Backup table, backup header, primary table, primary header. An
    /// interrupted commit leaves the old primary intact.
    BackupFirst,
}

impl WriteOrder {
    pub fn steps(self) -> [CommitStep; 4] {
        use CommitStep::*;
        match self {
            WriteOrder::PrimaryFirst => [PrimaryHeader, PrimaryTable, BackupTable, BackupHeader],
            WriteOrder::BackupFirst => [BackupTable, BackupHeader, PrimaryTable, PrimaryHeader],
        }
    }
}

/// Everything one commit writes.
#[derive(Debug, Clone, Copy)]
pub struct CommitPlan<'a> {
    pub primary: &'a GptHeader,
    pub backup: &'a GptHeader,
    pub table: &'a PartitionTable,
}

impl<'a> From<&'a Relocation> for CommitPlan<'a> {
    fn from(r: &'a Relocation) -> Self {
        Self {
            primary: &r.primary,
            backup: &r.backup,
            table: &r.table,
        }
    }
}

impl CommitPlan<'_> {
    /// LBA and byte length targeted by `step`.
    pub fn range(&self, step: CommitStep) -> (u64, u64) {
        let table_len = self.table.as_bytes().len() as u64;
        match step {
            CommitStep::PrimaryHeader => (PRIMARY_HEADER_LBA, SECTOR_SIZE),
            CommitStep::PrimaryTable => (self.primary.partition_table_lba, table_len),
            CommitStep::BackupTable => (self.backup.partition_table_lba, table_len),
            CommitStep::BackupHeader => (self.backup.current_lba, SECTOR_SIZE),
            CommitStep::Flush => (0, 0),
        }
    }

    fn check_bounds(&self, device_bytes: u64) -> GptResult {
        let steps = WriteOrder::PrimaryFirst.steps();
        let mut spans = [(0u64, 0u64); 4];
        for (span, &step) in spans.iter_mut().zip(&steps) {
            let (lba, len) = self.range(step);
            let offset = lba
                .checked_mul(SECTOR_SIZE)
                .ok_or(GptError::Invalid("GPT: LBA overflow"))?;
            match offset.checked_add(len) {
                Some(end) if end <= device_bytes => *span = (offset, end),
                _ => {
                    return Err(GptError::TableOutOfBounds {
                        offset,
                        len,
                        device: device_bytes,
                    });
                }
            }
        }

        for i in 0..spans.len() {
            for j in i + 1..spans.len() {
                let (a, b) = (spans[i], spans[j]);
                if a.0 < b.1 && b.0 < a.1 {
                    return Err(GptError::Overlap {
                        first: steps[i],
                        second: steps[j],
                    });
                }
            }
        }
        Ok(())
    }
}

fn write_step<IO: SectorIO + ?Sized>(io: &mut IO, plan: &CommitPlan<'_>, step: CommitStep) -> GptResult {
    let (lba, _) = plan.range(step);
    let res = match step {
        CommitStep::PrimaryHeader => io.write_at_lba(lba, &plan.primary.encode_sector()),
        CommitStep::BackupHeader => io.write_at_lba(lba, &plan.backup.encode_sector()),
        CommitStep::PrimaryTable | CommitStep::BackupTable => {
            io.write_at_lba(lba, plan.table.as_bytes())
        }
        CommitStep::Flush => io.flush(),
    };
    res.map_err(|cause| GptError::Commit { step, cause })
}

/// Writes both headers and both entry arrays in `order`, then flushes.
///
/// All target ranges are checked against the device size and against each
/// other before the first write. The first failing step aborts the commit.
pub fn commit<IO: SectorIO + ?Sized>(
    io: &mut IO,
    plan: CommitPlan<'_>,
    order: WriteOrder,
) -> GptResult {
    let device_bytes = io.len()?;
    plan.check_bounds(device_bytes)?;

    for step in order.steps() {
        write_step(io, &plan, step)?;
    }
    write_step(io, &plan, CommitStep::Flush)
}

/// [`commit`] for the result of a relocation.
#[inline]
pub fn commit_relocation<IO: SectorIO + ?Sized>(
    io: &mut IO,
    relocation: &Relocation,
    order: WriteOrder,
) -> GptResult {
    commit(io, CommitPlan::from(relocation), order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpt::GptEntry;
    use crate::gpt::TableGeometry;
    use crate::gpt::tests::{ESP, sample_header};
    use crate::reader;
    use crate::relocate::{RelocationOptions, relocate};

    const SECTORS: u64 = 20_480;

    fn relocation_for(bytes: u64) -> Relocation {
        let table = PartitionTable::from_entries(
            &[GptEntry::new(ESP, [3; 16], 2048, 4095, 0, "esp")],
            TableGeometry::default(),
        )
        .unwrap();
        relocate(&sample_header(), &table, bytes, &RelocationOptions::default()).unwrap()
    }

    #[derive(Default)]
    struct Writes(Vec<(u64, usize)>, usize);

    impl IOTracer for Writes {
        fn on_write(&mut self, off: u64, len: usize) {
            self.0.push((off, len));
        }
        fn on_flush(&mut self) {
            self.1 += 1;
        }
    }

    #[test]
    fn primary_first_order() {
        let bytes = SECTORS * SECTOR_SIZE;
        let r = relocation_for(bytes);
        let mut img = vec![0u8; bytes as usize];
        let mut mem = MemSectorIO::new(&mut img);
        let mut io = TracingIO::new(&mut mem, Writes::default());

        commit_relocation(&mut io, &r, WriteOrder::PrimaryFirst).unwrap();
        let w = io.into_tracer();
        assert_eq!(
            w.0,
            vec![
                (512, 512),
                (1024, 16_384),
                ((SECTORS - 33) * 512, 16_384),
                ((SECTORS - 1) * 512, 512),
            ]
        );
        assert_eq!(w.1, 1);
    }

    #[test]
    fn backup_first_order() {
        let bytes = SECTORS * SECTOR_SIZE;
        let r = relocation_for(bytes);
        let mut img = vec![0u8; bytes as usize];
        let mut mem = MemSectorIO::new(&mut img);
        let mut io = TracingIO::new(&mut mem, Writes::default());

        commit_relocation(&mut io, &r, WriteOrder::BackupFirst).unwrap();
        let offs: Vec<u64> = io.into_tracer().0.iter().map(|w| w.0).collect();
        assert_eq!(
            offs,
            vec![(SECTORS - 33) * 512, (SECTORS - 1) * 512, 1024, 512]
        );
    }

    #[test]
    fn committed_image_reads_back_valid() {
        let bytes = SECTORS * SECTOR_SIZE;
        let r = relocation_for(bytes);
        let mut img = vec![0u8; bytes as usize];
        let mut io = MemSectorIO::new(&mut img);
        commit_relocation(&mut io, &r, WriteOrder::default()).unwrap();

        let primary = reader::read_primary(&mut io).unwrap();
        assert!(primary.is_valid());
        assert_eq!(primary.header, r.primary);
        let backup = reader::read_backup(&mut io, &primary.header).unwrap();
        assert!(backup.is_valid());
        assert_eq!(backup.header, r.backup);
        assert_eq!(backup.table.as_bytes(), primary.table.as_bytes());
    }

    #[test]
    fn out_of_bounds_fails_before_writing() {
        // Relocated for a bigger device than the buffer.
        let r = relocation_for(SECTORS * SECTOR_SIZE * 2);
        let mut img = vec![0u8; (SECTORS * SECTOR_SIZE) as usize];
        let mut mem = MemSectorIO::new(&mut img);
        let mut io = TracingIO::new(&mut mem, Writes::default());

        assert!(matches!(
            commit_relocation(&mut io, &r, WriteOrder::PrimaryFirst),
            Err(GptError::TableOutOfBounds { .. })
        ));
        assert!(io.into_tracer().0.is_empty());
        assert!(img.iter().all(|&b| b == 0));
    }

    #[test]
    fn overlapping_ranges_fail_before_writing() {
        let bytes = SECTORS * SECTOR_SIZE;
        let r = relocation_for(bytes);
        let mut primary = r.primary;
        primary.partition_table_lba = PRIMARY_HEADER_LBA;
        let plan = CommitPlan {
            primary: &primary,
            backup: &r.backup,
            table: &r.table,
        };
        let mut img = vec![0u8; bytes as usize];
        let mut mem = MemSectorIO::new(&mut img);
        let mut io = TracingIO::new(&mut mem, Writes::default());

        assert_eq!(
            commit(&mut io, plan, WriteOrder::PrimaryFirst).unwrap_err(),
            GptError::Overlap {
                first: CommitStep::PrimaryHeader,
                second: CommitStep::PrimaryTable,
            }
        );
        assert!(io.into_tracer().0.is_empty());

        // Backup table running into the backup header.
        let mut backup = r.backup;
        backup.partition_table_lba = SECTORS - 32;
        let plan = CommitPlan {
            primary: &r.primary,
            backup: &backup,
            table: &r.table,
        };
        let mut io = MemSectorIO::new(&mut img);
        assert!(matches!(
            commit(&mut io, plan, WriteOrder::BackupFirst),
            Err(GptError::Overlap {
                second: CommitStep::BackupHeader,
                ..
            })
        ));
        assert!(img.iter().all(|&b| b == 0));
    }

    struct ShortAt {
        fail_offset: u64,
    }

    struct Failing<'a> {
        inner: MemSectorIO<'a>,
        rule: ShortAt,
    }

    impl SectorIO for Failing<'_> {
        fn write_at(&mut self, offset: u64, data: &[u8]) -> SectorIOResult {
            if offset == self.rule.fail_offset {
                return Err(SectorIOError::ShortWrite {
                    offset,
                    wanted: data.len(),
                    got: 0,
                });
            }
            self.inner.write_at(offset, data)
        }
        fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> SectorIOResult {
            self.inner.read_at(offset, buf)
        }
        fn flush(&mut self) -> SectorIOResult {
            self.inner.flush()
        }
        fn len(&mut self) -> SectorIOResult<u64> {
            self.inner.len()
        }
    }

    #[test]
    fn short_write_names_the_step() {
        let bytes = SECTORS * SECTOR_SIZE;
        let r = relocation_for(bytes);
        let mut img = vec![0u8; bytes as usize];
        let mut io = Failing {
            inner: MemSectorIO::new(&mut img),
            rule: ShortAt {
                fail_offset: (SECTORS - 33) * 512,
            },
        };

        let err = commit_relocation(&mut io, &r, WriteOrder::PrimaryFirst).unwrap_err();
        assert_eq!(
            err,
            GptError::Commit {
                step: CommitStep::BackupTable,
                cause: SectorIOError::ShortWrite {
                    offset: (SECTORS - 33) * 512,
                    wanted: 16_384,
                    got: 0,
                },
            }
        );
        // Nothing after the failing step was written.
        assert!(img[((SECTORS - 1) * 512) as usize..].iter().all(|&b| b == 0));
    }
}
