//! ES module import statements: finding them and reading their local bindings.
//!
//! One predicate decides whether an import is already present: an import line
//! is satisfied when every local name it binds is bound by an existing
//! import. Default (`import React from`), namespace (`import * as React
//! from`) and named (`import { memo } from`) forms all count. Type-only
//! imports are erased at compile time and never satisfy a value import.

use crate::directive::lines_with_offsets;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Statements longer than this without a module specifier are not imports.
const MAX_STATEMENT_LINES: usize = 64;

fn from_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^import\s+(?P<clause>[\s\S]*?)\s*\bfrom\s*['"](?P<source>[^'"]+)['"]"#)
            .expect("import regex is valid")
    })
}

fn side_effect() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^import\s*['"](?P<source>[^'"]+)['"]"#).expect("import regex is valid")
    })
}

/// A parsed import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module specifier, e.g. `react`
    pub source: String,
    /// Local names usable as values after this import
    pub bindings: Vec<String>,
    /// `import type ...`
    pub type_only: bool,
}

impl ImportDecl {
    /// Parse one import statement. Returns `None` for anything else.
    pub fn parse(statement: &str) -> Option<Self> {
        let statement = statement.trim();

        if let Some(caps) = side_effect().captures(statement) {
            return Some(Self {
                source: caps["source"].to_string(),
                bindings: Vec::new(),
                type_only: false,
            });
        }

        let caps = from_clause().captures(statement)?;
        let mut clause = caps["clause"].trim();
        let mut type_only = false;
        if let Some(rest) = clause.strip_prefix("type") {
            if rest.starts_with(char::is_whitespace) || rest.starts_with('{') {
                type_only = true;
                clause = rest.trim_start();
            }
        }

        Some(Self {
            source: caps["source"].to_string(),
            bindings: parse_clause(clause)?,
            type_only,
        })
    }

    /// Names this import makes available at runtime.
    pub fn value_bindings(&self) -> &[String] {
        if self.type_only {
            &[]
        } else {
            &self.bindings
        }
    }
}

/// Split an import clause into local names. Type-only specifiers are dropped.
fn parse_clause(clause: &str) -> Option<Vec<String>> {
    let mut names = Vec::new();

    let (outside, named) = match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            format!("{}{}", &clause[..open], &clause[close + 1..]),
            Some(&clause[open + 1..close]),
        ),
        (None, None) => (clause.to_string(), None),
        _ => return None,
    };

    for part in outside.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let name = match part.strip_prefix('*') {
            Some(rest) => rest.trim_start().strip_prefix("as")?.trim(),
            None => part,
        };
        if !is_identifier(name) {
            return None;
        }
        names.push(name.to_string());
    }

    if let Some(named) = named {
        for specifier in named.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if specifier.starts_with("type ") {
                continue;
            }
            let local = match specifier.rsplit_once(" as ") {
                Some((_, alias)) => alias.trim(),
                None => specifier,
            };
            if !is_identifier(local) {
                return None;
            }
            names.push(local.to_string());
        }
    }

    Some(names)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// True if `line` begins an import statement (not a dynamic `import(...)`).
fn starts_import(line: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix("import") else {
        return false;
    };
    matches!(
        rest.chars().next(),
        Some(c) if c.is_whitespace() || c == '{' || c == '*' || c == '\'' || c == '"'
    )
}

/// Every import statement in `text`, in order.
///
/// A statement starts on a line beginning with `import` and may span several
/// lines until its module specifier closes.
pub fn find_imports(text: &str) -> Vec<ImportDecl> {
    let lines: Vec<(usize, &str)> = lines_with_offsets(text).collect();
    let mut imports = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let (start, line) = lines[i];
        if !starts_import(line) {
            i += 1;
            continue;
        }

        let mut consumed = 0;
        for j in i..lines.len().min(i + MAX_STATEMENT_LINES) {
            let (line_start, line) = lines[j];
            let end = line_start + line.len();
            if let Some(decl) = ImportDecl::parse(&text[start..end]) {
                imports.push(decl);
                consumed = j - i + 1;
                break;
            }
        }

        i += consumed.max(1);
    }

    imports
}

/// All value names bound by imports in `text`.
pub fn bound_names(text: &str) -> BTreeSet<String> {
    find_imports(text)
        .iter()
        .flat_map(|decl| decl.value_bindings().iter().cloned())
        .collect()
}

/// Whether `text` already imports everything `import_line` would bind.
///
/// An `import_line` that binds nothing (a side-effect import) is satisfied
/// only by an import of the same module.
pub fn is_satisfied(text: &str, import_line: &str) -> bool {
    let Some(wanted) = ImportDecl::parse(import_line) else {
        return text.contains(import_line.trim());
    };

    if wanted.bindings.is_empty() {
        return find_imports(text)
            .iter()
            .any(|decl| decl.source == wanted.source);
    }

    let bound = bound_names(text);
    wanted.bindings.iter().all(|name| bound.contains(name))
}

/// [`is_satisfied`] for `import_line` or any of its accepted alternatives.
///
/// `import React from 'react'` with the alternative `import { memo } from
/// 'react'` is satisfied by either form.
pub fn is_satisfied_by_any(text: &str, import_line: &str, alternatives: &[String]) -> bool {
    is_satisfied(text, import_line) || alternatives.iter().any(|alt| is_satisfied(text, alt))
}
