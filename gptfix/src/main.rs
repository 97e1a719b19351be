// SPDX-License-Identifier: MIT
// gptfix/src/main.rs

mod commands;
mod config;
mod report;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::config::{BaseArg, PolicyArg, RepairConfig, WriteOrderArg, ZeroLbaArg};
use crate::utils::{LogLevel, set_log_level};

#[derive(Parser)]
#[command(
    name = "gptfix",
    version,
    about = "Inspect, verify and relocate GUID partition tables",
    long_about = None
)]
struct Cli {
    /// Print extra detail
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Only print errors and warnings
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the GPT header and partition entries of a disk, image or 16896-byte dump
    Info {
        /// Device, image or dump
        path: PathBuf,
        /// Show the backup copy instead of the primary
        #[arg(long)]
        backup: bool,
    },
    /// Check both GPT copies for consistency; exits with status 1 on issues
    Verify {
        /// Device or image
        path: PathBuf,
    },
    /// Rewrite the GPT for the device's current size
    Repair {
        /// Device or image
        path: PathBuf,
        #[command(flatten)]
        args: RepairArgs,
    },
}

#[derive(Args, Debug, Default)]
struct RepairArgs {
    /// Partition placement policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
    /// Contiguous packing base: `first-usable` or an LBA such as 34
    #[arg(long)]
    base: Option<BaseArg>,
    /// Handling of typed entries with a zero start or end LBA
    #[arg(long, value_enum)]
    zero_lba: Option<ZeroLbaArg>,
    /// Write the backup copy before the primary
    #[arg(long)]
    backup_first: bool,
    /// Only print what would be done, don't write anything
    #[arg(long)]
    dry_run: bool,
    /// TOML file with repair settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RepairArgs {
    fn to_config(&self) -> RepairConfig {
        RepairConfig {
            policy: self.policy,
            base: self.base,
            zero_lba: self.zero_lba,
            write_order: self.backup_first.then_some(WriteOrderArg::BackupFirst),
            dry_run: self.dry_run.then_some(true),
        }
    }

    fn resolve(&self) -> anyhow::Result<RepairConfig> {
        let file = match &self.config {
            Some(path) => RepairConfig::from_file(path)?,
            None => RepairConfig::default(),
        };
        Ok(file.overridden_by(self.to_config()))
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Info { path, backup } => commands::info(&path, backup),
        Commands::Verify { path } => commands::verify(&path),
        Commands::Repair { path, args } => {
            let cfg = args.resolve()?;
            commands::repair(&path, &cfg.to_options()?)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    set_log_level(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            crate::log_error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
