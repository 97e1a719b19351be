// SPDX-License-Identifier: MIT

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use gptcore::layout::{GPT_BLOB_SIZE, SECTOR_SIZE};
use gptcore::{GptCopy, RepairOptions, decode_blob, reader, repair_disk};
use gptio::prelude::*;

use crate::report::{CopyReport, IssueList, MoveTable, TypeNames};
use crate::utils::string::pretty_sectors;
use crate::{log_info, log_verbose, log_warn};

fn open_read(path: &Path) -> anyhow::Result<File> {
    File::open(path).with_context(|| format!("open {}", path.display()))
}

fn read_copy(path: &Path, backup: bool) -> anyhow::Result<GptCopy> {
    let meta = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.is_file() && meta.len() == GPT_BLOB_SIZE as u64 {
        if backup {
            anyhow::bail!("a {GPT_BLOB_SIZE}-byte dump holds no backup copy");
        }
        log_verbose!("{} is a GPT dump", path.display());
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        return decode_blob(&bytes).context("decode GPT dump");
    }

    let mut file = open_read(path)?;
    let mut io = StdSectorIO::new(&mut file);
    let primary = reader::read_primary(&mut io).context("read primary GPT")?;
    if !backup {
        return Ok(primary);
    }
    reader::read_backup(&mut io, &primary.header).context("read backup GPT")
}

pub fn info(path: &Path, backup: bool) -> anyhow::Result<ExitCode> {
    let copy = read_copy(path, backup)?;
    if let Err(e) = copy.header.validate_header() {
        log_warn!("{e}");
    }

    let names = TypeNames::builtin();
    log_verbose!("{} known partition types", names.len());
    print!("{}", CopyReport::new(&copy, &names));
    Ok(ExitCode::SUCCESS)
}

pub fn verify(path: &Path) -> anyhow::Result<ExitCode> {
    let mut file = open_read(path)?;
    let mut io = StdSectorIO::new(&mut file);
    let report = gptcore::verify(&mut io).context("verify GPT")?;

    log_verbose!(
        "device: {}",
        pretty_sectors(report.total_sectors, SECTOR_SIZE)
    );
    if report.is_consistent() {
        log_info!("GPT is consistent");
        return Ok(ExitCode::SUCCESS);
    }

    log_warn!("{} issue(s) found:", report.issues.len());
    eprint!("{}", IssueList(&report));
    Ok(ExitCode::FAILURE)
}

pub fn repair(path: &Path, opts: &RepairOptions) -> anyhow::Result<ExitCode> {
    let mut file = if opts.dry_run {
        open_read(path)?
    } else {
        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open {} for writing", path.display()))?
    };
    let mut inner = StdSectorIO::new(&mut file);
    let mut io = IOCounter::with_align(&mut inner, SECTOR_SIZE);

    log_verbose!("options: {opts:?}");
    if opts.dry_run {
        log_info!("Dry run mode: no data will be written.");
    }

    let report = repair_disk(&mut io, opts).context("repair GPT")?;
    let r = &report.relocation;

    log_info!(
        "device: {}",
        pretty_sectors(report.total_sectors, SECTOR_SIZE)
    );
    for &index in &r.skipped {
        log_warn!("entry #{index} has a zero start or end LBA, left untouched");
    }
    if r.has_moves() {
        log_info!("partition moves:\n{}", MoveTable(r));
    } else {
        log_info!("no partition moved");
    }
    log_info!("last usable LBA: {}", r.primary.last_usable_lba);
    log_info!(
        "backup GPT: table at LBA {}, header at LBA {}",
        r.backup_table_lba(),
        r.primary.backup_lba
    );
    if report.written {
        log_info!("GPT headers and partition tables written to {}", path.display());
    }
    let stats = io.snapshot();
    log_verbose!(
        "io: {} reads ({} bytes), {} writes ({} bytes), {} unaligned",
        stats.reads,
        stats.read_bytes,
        stats.writes,
        stats.write_bytes,
        stats.unaligned_reads + stats.unaligned_writes
    );
    Ok(ExitCode::SUCCESS)
}
