use crate::config::version::VersionGate;
use crate::imports::ImportDecl;
use crate::patcher::{PatchReason, PatchResult};
use crate::rules::{RegionEnd, Rule};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct JobConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

impl JobConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.jobs.is_empty() {
            issues.push(ValidationIssue::EmptyJobList);
        }

        if let Err(e) = VersionGate::parse(self.meta.version_range.as_deref()) {
            issues.push(ValidationIssue::InvalidCombo {
                job_id: None,
                message: e.to_string(),
            });
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            let id = Some(job.id.clone());

            if job.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    job_id: None,
                    field: "id",
                });
            } else if !seen.insert(job.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId(job.id.clone()));
            }
            if job.file.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    job_id: id.clone(),
                    field: "file",
                });
            }
            if job.rules.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    job_id: id.clone(),
                    field: "rules",
                });
            }

            for rule in &job.rules {
                match rule {
                    Rule::MarkerCheck { pattern } => {
                        if pattern.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                job_id: id.clone(),
                                field: "rules.pattern",
                            });
                        }
                    }
                    Rule::Replace { from, .. } => {
                        if from.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                job_id: id.clone(),
                                field: "rules.from",
                            });
                        }
                    }
                    Rule::WrapRegion {
                        start,
                        prefix,
                        suffix,
                        end,
                    } => {
                        if start.is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                job_id: id.clone(),
                                field: "rules.start",
                            });
                        }
                        if prefix.is_empty() && suffix.is_empty() {
                            issues.push(ValidationIssue::InvalidCombo {
                                job_id: id.clone(),
                                message: "wrap-region needs a prefix or a suffix".to_string(),
                            });
                        }
                        match end {
                            RegionEnd::Last { closer } if closer.is_empty() => {
                                issues.push(ValidationIssue::MissingField {
                                    job_id: id.clone(),
                                    field: "rules.end.closer",
                                });
                            }
                            RegionEnd::Marker { text } if text.is_empty() => {
                                issues.push(ValidationIssue::MissingField {
                                    job_id: id.clone(),
                                    field: "rules.end.text",
                                });
                            }
                            _ => {}
                        }
                    }
                    Rule::EnsureImport { line, satisfied_by } => {
                        for candidate in std::iter::once(line).chain(satisfied_by) {
                            match ImportDecl::parse(candidate) {
                                None => issues.push(ValidationIssue::InvalidCombo {
                                    job_id: id.clone(),
                                    message: format!(
                                        "ensure-import line is not an import: {candidate:?}"
                                    ),
                                }),
                                Some(decl) if decl.type_only => {
                                    issues.push(ValidationIssue::InvalidCombo {
                                        job_id: id.clone(),
                                        message: format!(
                                            "ensure-import line binds no runtime names: {candidate:?}"
                                        ),
                                    })
                                }
                                Some(_) => {}
                            }
                        }
                    }
                    Rule::HoistDirective { directive } => {
                        if directive.trim().is_empty() {
                            issues.push(ValidationIssue::MissingField {
                                job_id: id.clone(),
                                field: "rules.directive",
                            });
                        }
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// semver requirement matched against the project's package.json version
    #[serde(default)]
    pub version_range: Option<String>,
    #[serde(default)]
    pub workspace_relative: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobDefinition {
    pub id: String,
    pub file: String,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub messages: Option<Messages>,
    /// Never write, even under `apply`
    #[serde(default)]
    pub check_only: bool,
}

/// Status lines printed for a job instead of the default report.
///
/// `{path}` is replaced with the job's configured file path.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    /// Printed before `applied` when the job changes (or would change) its file
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub applied: Option<String>,
    /// Printed after `applied`
    #[serde(default)]
    pub after: Option<String>,
    /// Printed only when a marker check stopped the job
    #[serde(default)]
    pub already_patched: Option<String>,
    #[serde(default)]
    pub not_found: Option<String>,
}

impl Messages {
    /// Lines to print for `result`; empty means stay silent.
    pub fn render(&self, result: &PatchResult, path: &str) -> Vec<String> {
        let fill = |template: &Option<String>| template.as_ref().map(|t| t.replace("{path}", path));

        match result.reason {
            PatchReason::Applied { .. } => [&self.before, &self.applied, &self.after]
                .into_iter()
                .filter_map(fill)
                .collect(),
            PatchReason::AlreadyPatched { marker: Some(_) } => {
                fill(&self.already_patched).into_iter().collect()
            }
            // Every rule ran and had nothing to do
            PatchReason::AlreadyPatched { marker: None } => [&self.before, &self.after]
                .into_iter()
                .filter_map(fill)
                .collect(),
            PatchReason::PatternNotFound { .. } => fill(&self.not_found).into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyJobList,
    DuplicateId(String),
    MissingField {
        job_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        job_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyJobList => write!(f, "job config contains no jobs"),
            ValidationIssue::DuplicateId(id) => write!(f, "job id '{id}' is used more than once"),
            ValidationIssue::MissingField { job_id, field } => match job_id {
                Some(id) => write!(f, "job '{id}' missing required field '{field}'"),
                None => write!(f, "job missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo { job_id, message } => match job_id {
                Some(id) => write!(f, "job '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid job configuration: {message}"),
            },
        }
    }
}
