//! Source Patcher: idempotent text patching for TypeScript/TSX sources
//!
//! Applies small, fixed sets of textual edits to component files: wrapping a
//! function component in `React.memo`, hoisting a `"use client"` directive,
//! inserting a missing import. Every edit is a literal substring operation;
//! nothing here parses TypeScript.
//!
//! # Architecture
//!
//! A job is a file path plus an ordered list of [`Rule`]s. Rules are pure
//! functions over the file text ([`Rule::evaluate`]); [`patcher::apply_rules`]
//! chains them with an early exit, and [`SourceFile`] owns the read and the
//! single atomic write.
//!
//! # Safety
//!
//! - Marker check before mutating (re-running is a no-op)
//! - A missing required pattern leaves the file untouched
//! - Atomic file writes (tempfile + fsync + rename)
//! - Refuses to overwrite a file that changed since it was read
//! - Workspace boundary enforcement, no edits under `node_modules`
//! - UTF-8 validation
//!
//! # Example
//!
//! ```no_run
//! use source_patcher::{patch, RegionEnd, Rule};
//!
//! let rules = vec![
//!     Rule::MarkerCheck { pattern: "memo(".into() },
//!     Rule::WrapRegion {
//!         start: "export function TaskItem({".into(),
//!         prefix: "export const TaskItem = React.memo(function TaskItem({".into(),
//!         suffix: ")".into(),
//!         end: RegionEnd::Balanced,
//!     },
//!     Rule::EnsureImport {
//!         line: "import React from 'react'".into(),
//!         satisfied_by: vec![],
//!     },
//! ];
//!
//! match patch("src/components/tasks/components/task-item.tsx", &rules) {
//!     Ok(result) => println!("{result}"),
//!     Err(e) => eprintln!("Patch failed: {e}"),
//! }
//! ```

pub mod config;
pub mod directive;
pub mod edit;
pub mod imports;
pub mod logging;
pub mod patcher;
pub mod presets;
pub mod rules;
pub mod safety;
pub mod scan;

// Re-exports
pub use config::{
    check_jobs, load_from_path, load_from_str, run_jobs, ConfigError, JobConfig, JobReport,
    RunError, RunMode, VersionError,
};
pub use edit::{CommitResult, EditError, SourceFile};
pub use patcher::{apply_rules, check, patch, PatchReason, PatchResult};
pub use rules::{RegionEnd, Rule, RuleOutcome};
pub use safety::{SafetyError, WorkspaceGuard};
