//! Directive prologue helpers (`"use client"`, `'use strict'`, ...).

/// If `line` is a directive statement, return its unquoted name.
///
/// Accepts either quote style and an optional trailing semicolon.
pub fn directive_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let quote = trimmed.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = trimmed.strip_prefix(quote)?.strip_suffix(quote)?;
    if inner.is_empty() || inner.contains(quote) {
        return None;
    }
    Some(inner)
}

/// Iterate lines together with their starting byte offset.
///
/// Each yielded line includes its trailing `\n`, if any.
pub(crate) fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        (start, line)
    })
}

/// Directive names in the leading prologue of `text`.
pub fn prologue(text: &str) -> Vec<&str> {
    let mut names = Vec::new();
    for (_, line) in lines_with_offsets(text) {
        if line.trim().is_empty() {
            continue;
        }
        match directive_name(line) {
            Some(name) => names.push(name),
            None => break,
        }
    }
    names
}

/// Byte offset where the first statement after the directive prologue begins.
///
/// Blank lines directly after the prologue are skipped so inserted text lands
/// next to the existing code rather than the directive. Returns 0 when the
/// file does not start with a directive.
pub fn prologue_end(text: &str) -> usize {
    let mut seen_directive = false;
    for (start, line) in lines_with_offsets(text) {
        if line.trim().is_empty() {
            continue;
        }
        if directive_name(line).is_some() {
            seen_directive = true;
            continue;
        }
        return if seen_directive { start } else { 0 };
    }
    if seen_directive {
        text.len()
    } else {
        0
    }
}
