// SPDX-License-Identifier: MIT

//! Repair settings from a TOML file, overridable from the command line.
//!
//! ```toml
//! policy = "contiguous"      # or "preserve-gaps"
//! base = 34                  # or "first-usable"
//! zero_lba = "skip"          # or "reject"
//! write_order = "backup-first"
//! dry_run = false
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, bail};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer};

use gptcore::{RelocationBase, RelocationPolicy, RepairOptions, WriteOrder, ZeroLbaPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyArg {
    /// Pack partitions back to back from the base
    Contiguous,
    /// Keep each partition's distance to the previous one
    PreserveGaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZeroLbaArg {
    /// Leave such entries untouched
    Skip,
    /// Abort the repair
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WriteOrderArg {
    PrimaryFirst,
    BackupFirst,
}

/// Contiguous packing base: `first-usable` or an LBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseArg {
    FirstUsable,
    Lba(u64),
}

impl FromStr for BaseArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("first-usable") {
            return Ok(BaseArg::FirstUsable);
        }
        s.parse::<u64>()
            .map(BaseArg::Lba)
            .map_err(|_| format!("invalid base '{s}': expected 'first-usable' or an LBA"))
    }
}

impl<'de> Deserialize<'de> for BaseArg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BaseVisitor;

        impl serde::de::Visitor<'_> for BaseVisitor {
            type Value = BaseArg;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("'first-usable' or a non-negative LBA")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(BaseArg::Lba(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(value)
                    .map(BaseArg::Lba)
                    .map_err(|_| E::custom(format!("negative LBA {value}")))
            }
        }

        deserializer.deserialize_any(BaseVisitor)
    }
}

/// Every field optional so a file and the command line can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepairConfig {
    pub policy: Option<PolicyArg>,
    pub base: Option<BaseArg>,
    pub zero_lba: Option<ZeroLbaArg>,
    pub write_order: Option<WriteOrderArg>,
    pub dry_run: Option<bool>,
}

impl RepairConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Fields set in `other` win.
    pub fn overridden_by(self, other: RepairConfig) -> Self {
        Self {
            policy: other.policy.or(self.policy),
            base: other.base.or(self.base),
            zero_lba: other.zero_lba.or(self.zero_lba),
            write_order: other.write_order.or(self.write_order),
            dry_run: other.dry_run.or(self.dry_run),
        }
    }

    pub fn to_options(&self) -> anyhow::Result<RepairOptions> {
        let policy = match (self.policy.unwrap_or(PolicyArg::Contiguous), self.base) {
            (PolicyArg::Contiguous, None | Some(BaseArg::FirstUsable)) => {
                RelocationPolicy::Contiguous(RelocationBase::FirstUsable)
            }
            (PolicyArg::Contiguous, Some(BaseArg::Lba(lba))) => {
                RelocationPolicy::Contiguous(RelocationBase::Fixed(lba))
            }
            (PolicyArg::PreserveGaps, None) => RelocationPolicy::PreserveGaps,
            (PolicyArg::PreserveGaps, Some(_)) => {
                bail!("a relocation base only applies to the contiguous policy")
            }
        };
        let zero_lba = match self.zero_lba.unwrap_or(ZeroLbaArg::Skip) {
            ZeroLbaArg::Skip => ZeroLbaPolicy::Skip,
            ZeroLbaArg::Reject => ZeroLbaPolicy::Reject,
        };
        let order = match self.write_order.unwrap_or(WriteOrderArg::PrimaryFirst) {
            WriteOrderArg::PrimaryFirst => WriteOrder::PrimaryFirst,
            WriteOrderArg::BackupFirst => WriteOrder::BackupFirst,
        };

        let mut opts = RepairOptions::new()
            .with_policy(policy)
            .with_zero_lba(zero_lba)
            .with_write_order(order);
        if self.dry_run.unwrap_or(false) {
            opts = opts.dry_run();
        }
        Ok(opts)
    }
}
