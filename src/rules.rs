//! Edit rules and their pure text semantics.
//!
//! A rule never touches the filesystem. [`Rule::evaluate`] takes the current
//! text and says what to do with it; the patcher strings the results together.

use crate::directive::{directive_name, lines_with_offsets, prologue, prologue_end};
use crate::imports;
use crate::scan;
use serde::Deserialize;

/// One edit directive in a job's ordered rule list.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Rule {
    /// Stop the whole job, leaving the file untouched, if `pattern` is present.
    MarkerCheck { pattern: String },

    /// Literal replacement of the first (or every) occurrence of `from`.
    Replace {
        from: String,
        to: String,
        #[serde(default)]
        all: bool,
        /// Report a missing `from` instead of skipping silently
        #[serde(default)]
        required: bool,
    },

    /// `prefix` takes the place of `start`; `suffix` goes after the region end.
    WrapRegion {
        start: String,
        prefix: String,
        suffix: String,
        #[serde(default)]
        end: RegionEnd,
    },

    /// Insert an import line unless everything it binds is already imported,
    /// or one of the `satisfied_by` alternatives is.
    EnsureImport {
        line: String,
        #[serde(default)]
        satisfied_by: Vec<String>,
    },

    /// Move a directive such as `"use client"` to the top of the file.
    HoistDirective { directive: String },
}

/// How a [`Rule::WrapRegion`] finds the end of the region it wraps.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RegionEnd {
    /// Close of the first top-level block after `start`
    #[default]
    Balanced,
    /// Last occurrence of `closer` anywhere in the file
    Last { closer: String },
    /// First occurrence of an explicit marker after `start`
    Marker { text: String },
}

/// What a single rule decided about the current text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Marker present; the job stops and the file stays as it was.
    Halt,
    /// The rule rewrote the text.
    Changed(String),
    /// Nothing to do (already applied, or an optional pattern was absent).
    Unchanged,
    /// A pattern the rule depends on is missing.
    NotFound { pattern: String },
}

impl Rule {
    /// Short kebab-case name, as used in job files.
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::MarkerCheck { .. } => "marker-check",
            Rule::Replace { .. } => "replace",
            Rule::WrapRegion { .. } => "wrap-region",
            Rule::EnsureImport { .. } => "ensure-import",
            Rule::HoistDirective { .. } => "hoist-directive",
        }
    }

    pub fn evaluate(&self, text: &str) -> RuleOutcome {
        match self {
            Rule::MarkerCheck { pattern } => {
                if !pattern.is_empty() && text.contains(pattern.as_str()) {
                    RuleOutcome::Halt
                } else {
                    RuleOutcome::Unchanged
                }
            }
            Rule::Replace {
                from,
                to,
                all,
                required,
            } => replace(text, from, to, *all, *required),
            Rule::WrapRegion {
                start,
                prefix,
                suffix,
                end,
            } => wrap_region(text, start, prefix, suffix, end),
            Rule::EnsureImport { line, satisfied_by } => ensure_import(text, line, satisfied_by),
            Rule::HoistDirective { directive } => hoist_directive(text, directive),
        }
    }
}

fn replace(text: &str, from: &str, to: &str, all: bool, required: bool) -> RuleOutcome {
    if from.is_empty() {
        return RuleOutcome::Unchanged;
    }

    // A replacement that keeps `from` inside `to` would grow on every run
    let already = !to.is_empty() && text.contains(to);
    if already && (to.contains(from) || !text.contains(from)) {
        return RuleOutcome::Unchanged;
    }

    if !text.contains(from) {
        return if required {
            RuleOutcome::NotFound {
                pattern: from.to_string(),
            }
        } else {
            RuleOutcome::Unchanged
        };
    }

    let replaced = if all {
        text.replace(from, to)
    } else {
        text.replacen(from, to, 1)
    };
    RuleOutcome::Changed(replaced)
}

fn wrap_region(text: &str, start: &str, prefix: &str, suffix: &str, end: &RegionEnd) -> RuleOutcome {
    if !prefix.is_empty() && text.contains(prefix) {
        return RuleOutcome::Unchanged;
    }

    let Some(start_at) = text.find(start).filter(|_| !start.is_empty()) else {
        return RuleOutcome::NotFound {
            pattern: start.to_string(),
        };
    };
    let after_start = start_at + start.len();

    let region_end = match end {
        RegionEnd::Balanced => scan::block_end(text, start_at)
            .map(|close| close + 1)
            .filter(|&e| e >= after_start),
        RegionEnd::Last { closer } => text
            .rfind(closer.as_str())
            .filter(|&i| !closer.is_empty() && i >= after_start)
            .map(|i| i + closer.len()),
        RegionEnd::Marker { text: marker } => text[after_start..]
            .find(marker.as_str())
            .filter(|_| !marker.is_empty())
            .map(|i| after_start + i + marker.len()),
    };

    let Some(region_end) = region_end else {
        let pattern = match end {
            RegionEnd::Balanced => format!("closing brace of block after `{start}`"),
            RegionEnd::Last { closer } => closer.clone(),
            RegionEnd::Marker { text } => text.clone(),
        };
        return RuleOutcome::NotFound { pattern };
    };

    let mut wrapped = String::with_capacity(text.len() + prefix.len() + suffix.len());
    wrapped.push_str(&text[..start_at]);
    wrapped.push_str(prefix);
    wrapped.push_str(&text[after_start..region_end]);
    wrapped.push_str(suffix);
    wrapped.push_str(&text[region_end..]);
    RuleOutcome::Changed(wrapped)
}

fn ensure_import(text: &str, line: &str, satisfied_by: &[String]) -> RuleOutcome {
    let line = line.trim();
    if line.is_empty() || imports::is_satisfied_by_any(text, line, satisfied_by) {
        return RuleOutcome::Unchanged;
    }

    let at = prologue_end(text);
    let mut out = String::with_capacity(text.len() + line.len() + 2);
    out.push_str(&text[..at]);
    // Directive-only file without a trailing newline
    if at > 0 && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(line);
    out.push('\n');
    out.push_str(&text[at..]);
    RuleOutcome::Changed(out)
}

fn hoist_directive(text: &str, directive: &str) -> RuleOutcome {
    let name = directive_name(directive).unwrap_or_else(|| directive.trim());
    if name.is_empty() || prologue(text).contains(&name) {
        return RuleOutcome::Unchanged;
    }

    let Some((start, line)) =
        lines_with_offsets(text).find(|(_, line)| directive_name(line) == Some(name))
    else {
        return RuleOutcome::Unchanged;
    };

    let mut rest = String::with_capacity(text.len());
    rest.push_str(&text[..start]);
    rest.push_str(&text[start + line.len()..]);
    let rest = rest.trim_start_matches(['\n', '\r']);

    RuleOutcome::Changed(format!("{}\n\n{}", line.trim(), rest))
}
