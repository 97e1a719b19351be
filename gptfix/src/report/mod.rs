// SPDX-License-Identifier: MIT

//! Human-readable rendering of GPT copies, issues and relocations.

pub mod render;
pub mod types;

pub use render::{CopyReport, IssueList, MoveTable};
pub use types::TypeNames;
