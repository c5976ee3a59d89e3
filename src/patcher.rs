//! Idempotent patch-and-rewrite over a single file.
//!
//! A job's rules run in order against the in-memory text. A marker hit stops
//! everything and leaves the file untouched; so does a rule whose required
//! pattern is missing, so a half-applied wrap never reaches disk.

use crate::edit::{CommitResult, EditError, SourceFile};
use crate::rules::{Rule, RuleOutcome};
use std::fmt;
use std::path::{Path, PathBuf};

/// Minimum similarity for a line to be offered as a "did you mean" hint.
const HINT_THRESHOLD: f64 = 0.6;

/// Why a patch did or did not change its file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchReason {
    /// Marker present, or every rule was a no-op
    AlreadyPatched { marker: Option<String> },
    /// At least one rule changed the text
    Applied { rules_applied: usize },
    /// A rule could not find what it needed; the file was left alone
    PatternNotFound {
        rule: usize,
        kind: &'static str,
        pattern: String,
        closest: Option<String>,
    },
}

/// Result of running one rule list over one file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for applied/already-patched/not-found"]
pub struct PatchResult {
    pub file: PathBuf,
    /// True iff the file content differs (or, in check mode, would differ)
    pub changed: bool,
    pub reason: PatchReason,
}

impl PatchResult {
    pub fn is_applied(&self) -> bool {
        matches!(self.reason, PatchReason::Applied { .. })
    }

    pub fn is_already_patched(&self) -> bool {
        matches!(self.reason, PatchReason::AlreadyPatched { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.reason, PatchReason::PatternNotFound { .. })
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            PatchReason::AlreadyPatched { marker: Some(marker) } => {
                write!(f, "Already patched {} (found `{}`)", self.file.display(), marker)
            }
            PatchReason::AlreadyPatched { marker: None } => {
                write!(f, "Already patched {}", self.file.display())
            }
            PatchReason::Applied { rules_applied } => write!(
                f,
                "Applied {} rule(s) to {}",
                rules_applied,
                self.file.display()
            ),
            PatchReason::PatternNotFound {
                rule,
                kind,
                pattern,
                closest,
            } => {
                write!(
                    f,
                    "Pattern not found in {} (rule #{} {}): {:?}",
                    self.file.display(),
                    rule + 1,
                    kind,
                    pattern
                )?;
                if let Some(line) = closest {
                    write!(f, "; closest line: {:?}", line)?;
                }
                Ok(())
            }
        }
    }
}

/// Run `rules` over the text of `file`, leaving the result in memory.
///
/// On success `file.text()` holds the patched text; on a marker hit or a
/// missing pattern it holds the original.
pub fn apply_rules(file: &mut SourceFile, rules: &[Rule]) -> PatchResult {
    let mut text = file.original().to_string();
    let mut rules_applied = 0;

    for (idx, rule) in rules.iter().enumerate() {
        match rule.evaluate(&text) {
            RuleOutcome::Halt => {
                file.discard();
                let marker = match rule {
                    Rule::MarkerCheck { pattern } => Some(pattern.clone()),
                    _ => None,
                };
                tracing::debug!(file = %file.path().display(), rule = idx, "marker present, skipping");
                return PatchResult {
                    file: file.path().to_path_buf(),
                    changed: false,
                    reason: PatchReason::AlreadyPatched { marker },
                };
            }
            RuleOutcome::Changed(next) => {
                tracing::debug!(file = %file.path().display(), rule = idx, kind = rule.kind(), "rule applied");
                text = next;
                rules_applied += 1;
            }
            RuleOutcome::Unchanged => {
                tracing::debug!(file = %file.path().display(), rule = idx, kind = rule.kind(), "rule had nothing to do");
            }
            RuleOutcome::NotFound { pattern } => {
                file.discard();
                let closest = closest_line(&text, &pattern);
                tracing::warn!(file = %file.path().display(), rule = idx, kind = rule.kind(), %pattern, "pattern not found");
                return PatchResult {
                    file: file.path().to_path_buf(),
                    changed: false,
                    reason: PatchReason::PatternNotFound {
                        rule: idx,
                        kind: rule.kind(),
                        pattern,
                        closest,
                    },
                };
            }
        }
    }

    if text == file.original() {
        return PatchResult {
            file: file.path().to_path_buf(),
            changed: false,
            reason: PatchReason::AlreadyPatched { marker: None },
        };
    }

    file.set_text(text);
    PatchResult {
        file: file.path().to_path_buf(),
        changed: true,
        reason: PatchReason::Applied { rules_applied },
    }
}

/// Patch a file in place. The file is rewritten if and only if `changed`.
pub fn patch(path: impl AsRef<Path>, rules: &[Rule]) -> Result<PatchResult, EditError> {
    let mut file = SourceFile::read(path.as_ref())?;
    let result = apply_rules(&mut file, rules);
    if result.changed {
        match file.commit()? {
            CommitResult::Written { file: path, bytes } => {
                tracing::info!(file = %path.display(), bytes, "patched");
            }
            CommitResult::Unchanged { file: path } => {
                tracing::debug!(file = %path.display(), "nothing to write");
            }
        }
    }
    Ok(result)
}

/// Compute what [`patch`] would do without writing anything.
pub fn check(path: impl AsRef<Path>, rules: &[Rule]) -> Result<PatchResult, EditError> {
    let mut file = SourceFile::read(path.as_ref())?;
    Ok(apply_rules(&mut file, rules))
}

/// The line of `text` most similar to the first line of `pattern`.
fn closest_line(text: &str, pattern: &str) -> Option<String> {
    let needle = pattern.lines().find(|l| !l.trim().is_empty())?.trim();
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| (strsim::normalized_levenshtein(line, needle), line))
        .filter(|(score, _)| *score >= HINT_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, line)| line.to_string())
}
