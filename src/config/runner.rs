//! Job runner - executes the jobs of a job file one after another
//!
//! This module provides the job-file level driver that:
//! - Gates the whole file on its `version_range`
//! - Resolves and safety-checks each job's target path
//! - Runs the job's rules through the patcher, writing or just checking
//! - Reports one result per job; a failing job never stops the others

use crate::config::schema::{JobConfig, JobDefinition, Messages};
use crate::config::version::{VersionError, VersionGate};
use crate::edit::{CommitResult, EditError, SourceFile};
use crate::patcher::{apply_rules, PatchResult};
use crate::safety::{SafetyError, WorkspaceGuard};
use std::fmt;
use std::path::{Path, PathBuf};

/// Whether changed files are written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Apply,
    /// Compute results without writing
    Check,
}

/// Result of one job.
#[derive(Debug)]
pub struct JobReport {
    pub id: String,
    /// Path as written in the job file
    pub file: String,
    pub messages: Option<Messages>,
    pub outcome: Result<JobOutcome, RunError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The rules ran; `before`/`after` hold the file text for diffing
    Patched {
        result: PatchResult,
        before: String,
        after: String,
        /// True when the change was actually written
        written: bool,
    },
    /// The job file's version range excludes this project
    Skipped { reason: String },
}

/// Errors that stop a single job
#[derive(Debug)]
pub enum RunError {
    /// Version filtering error
    Version(VersionError),
    /// Target path rejected by the workspace guard
    Safety(SafetyError),
    /// Target file does not exist
    MissingFile { file: PathBuf },
    /// Reading or writing the target failed
    Edit(EditError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Version(e) => write!(f, "version error: {}", e),
            RunError::Safety(e) => write!(f, "refused: {}", e),
            RunError::MissingFile { file } => write!(f, "file not found: {}", file.display()),
            RunError::Edit(e) => write!(f, "edit error: {}", e),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Version(e) => Some(e),
            RunError::Safety(e) => Some(e),
            RunError::Edit(e) => Some(e),
            RunError::MissingFile { .. } => None,
        }
    }
}

impl From<VersionError> for RunError {
    fn from(e: VersionError) -> Self {
        RunError::Version(e)
    }
}

impl From<SafetyError> for RunError {
    fn from(e: SafetyError) -> Self {
        RunError::Safety(e)
    }
}

impl From<EditError> for RunError {
    fn from(e: EditError) -> Self {
        RunError::Edit(e)
    }
}

/// Run every job in `config` against the workspace.
///
/// # Arguments
///
/// * `config` - The job file to run
/// * `workspace_root` - Root directory of the target project
/// * `project_version` - Version of the project (from package.json)
/// * `mode` - Write changes, or only compute them
///
/// # Returns
///
/// One report per job, in job-file order
pub fn run_jobs(
    config: &JobConfig,
    workspace_root: &Path,
    project_version: &str,
    mode: RunMode,
) -> Vec<JobReport> {
    let report_all = |outcome: &dyn Fn() -> Result<JobOutcome, RunError>| -> Vec<JobReport> {
        config
            .jobs
            .iter()
            .map(|job| report(job, outcome()))
            .collect()
    };

    let gate = match VersionGate::parse(config.meta.version_range.as_deref()) {
        Ok(gate) => gate,
        Err(e) => return report_all(&|| Err(RunError::Version(e.clone()))),
    };

    match gate.allows(project_version) {
        Ok(true) => {}
        Ok(false) => {
            let reason = format!(
                "project version {project_version} does not satisfy version_range {gate}"
            );
            tracing::info!(name = %config.meta.name, %reason, "skipping job file");
            return report_all(&|| {
                Ok(JobOutcome::Skipped {
                    reason: reason.clone(),
                })
            });
        }
        Err(e) => return report_all(&|| Err(RunError::Version(e.clone()))),
    }

    let guard = match WorkspaceGuard::new(workspace_root) {
        Ok(guard) => guard,
        Err(e) => {
            // std::io::Error is not Clone, so rebuild one per job from kind + text
            let (kind, message) = match &e {
                SafetyError::Canonicalize { source, .. } => (source.kind(), source.to_string()),
                other => (std::io::ErrorKind::Other, other.to_string()),
            };
            return report_all(&|| {
                Err(RunError::Safety(SafetyError::Canonicalize {
                    path: workspace_root.to_path_buf(),
                    source: std::io::Error::new(kind, message.clone()),
                }))
            });
        }
    };

    config
        .jobs
        .iter()
        .map(|job| {
            let mode = if job.check_only { RunMode::Check } else { mode };
            let outcome = run_job(job, &guard, config.meta.workspace_relative, mode);
            if let Err(e) = &outcome {
                tracing::warn!(job = %job.id, error = %e, "job failed");
            }
            report(job, outcome)
        })
        .collect()
}

/// Read-only variant of [`run_jobs`].
///
/// Jobs that target the same file each see the file as it is on disk, not
/// as an earlier job would have left it.
pub fn check_jobs(
    config: &JobConfig,
    workspace_root: &Path,
    project_version: &str,
) -> Vec<JobReport> {
    run_jobs(config, workspace_root, project_version, RunMode::Check)
}

fn report(job: &JobDefinition, outcome: Result<JobOutcome, RunError>) -> JobReport {
    JobReport {
        id: job.id.clone(),
        file: job.file.clone(),
        messages: job.messages.clone(),
        outcome,
    }
}

fn resolve_target(
    job: &JobDefinition,
    guard: &WorkspaceGuard,
    workspace_relative: bool,
) -> Result<PathBuf, RunError> {
    let configured = PathBuf::from(&job.file);
    let resolved = if workspace_relative || configured.is_absolute() {
        guard.workspace_root().join(&configured)
    } else {
        std::env::current_dir()
            .map_err(|source| EditError::Io {
                path: configured.clone(),
                source,
            })?
            .join(&configured)
    };

    if !resolved.exists() {
        return Err(RunError::MissingFile { file: resolved });
    }

    Ok(guard.validate_path(&resolved)?)
}

fn run_job(
    job: &JobDefinition,
    guard: &WorkspaceGuard,
    workspace_relative: bool,
    mode: RunMode,
) -> Result<JobOutcome, RunError> {
    let target = resolve_target(job, guard, workspace_relative)?;

    let mut source = SourceFile::read(&target)?;
    let result = apply_rules(&mut source, &job.rules);

    let bytes_written = if result.changed && mode == RunMode::Apply {
        match source.commit()? {
            CommitResult::Written { bytes, .. } => Some(bytes),
            CommitResult::Unchanged { .. } => None,
        }
    } else {
        None
    };
    let written = bytes_written.is_some();
    tracing::info!(
        job = %job.id,
        file = %target.display(),
        changed = result.changed,
        bytes_written = bytes_written.unwrap_or(0),
        "job finished"
    );

    Ok(JobOutcome::Patched {
        before: source.original().to_string(),
        after: source.text().to_string(),
        result,
        written,
    })
}
