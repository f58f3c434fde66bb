//! Read-only inspection of docstring literals in binding source.
//!
//! Companion to the sync pipeline: lists every existing documentation
//! literal with its binding name and exact line/column span, so extraction
//! can be verified independently of the write path. Never mutates anything.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::warn;

use crate::bindings::BindingLocator;
use crate::patch::unescape_literal;

static RE_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"#include\s*"([^"]+)""#).unwrap());

/// One docstring literal found in a scanned file. Spans are 1-based and
/// inclusive of the surrounding quotes.
#[derive(Debug, Serialize)]
pub struct LiteralEntry {
    pub file: String,
    pub binding: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    /// Decoded text (escapes resolved).
    pub text: String,
}

/// List every docstring literal in `path`, plus those in binding fragments
/// pulled in via `#include "..."` resolved against the file's directory and
/// `include_dirs` (one level deep).
pub fn inspect_file(
    path: &Path,
    include_dirs: &[PathBuf],
    marker: &str,
) -> Result<Vec<LiteralEntry>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let locator = BindingLocator::new(marker);
    let mut entries = literals_in(&locator, &source, &path.display().to_string())?;

    for include in resolve_includes(&source, path, include_dirs) {
        match std::fs::read_to_string(&include) {
            Ok(text) => {
                entries.extend(literals_in(&locator, &text, &include.display().to_string())?)
            }
            Err(e) => warn!("skipping include {}: {e}", include.display()),
        }
    }
    Ok(entries)
}

/// Pure scan of one buffer.
fn literals_in(locator: &BindingLocator, source: &str, file: &str) -> Result<Vec<LiteralEntry>> {
    let mut entries = Vec::new();
    for site in locator.locate(source)? {
        let (Some(literal), Some(span)) = (&site.existing_literal, &site.literal_span) else {
            continue;
        };
        // spans include the quotes around the literal content
        let start = site.body_start + span.start - 1;
        let end = site.body_start + span.end;
        let (line, column) = line_col(source, start);
        let (end_line, end_column) = line_col(source, end);
        entries.push(LiteralEntry {
            file: file.to_string(),
            binding: site.binding_name.clone(),
            line,
            column,
            end_line,
            end_column,
            text: unescape_literal(literal),
        });
    }
    Ok(entries)
}

/// Resolve `#include "..."` directives to existing files.
fn resolve_includes(source: &str, path: &Path, include_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();
    if let Some(parent) = path.parent() {
        roots.push(parent.to_path_buf());
    }
    roots.extend(include_dirs.iter().cloned());

    RE_INCLUDE
        .captures_iter(source)
        .filter_map(|caps| {
            let name = &caps[1];
            roots.iter().map(|r| r.join(name)).find(|p| p.is_file())
        })
        .collect()
}

/// 1-based line/column of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let column = offset - before.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_is_one_based() {
        let text = "ab\ncdef\ng";
        assert_eq!(line_col(text, 0), (1, 1));
        assert_eq!(line_col(text, 3), (2, 1));
        assert_eq!(line_col(text, 6), (2, 4));
        assert_eq!(line_col(text, 8), (3, 1));
    }

    #[test]
    fn lists_literals_with_spans() {
        let source = "cls\n    .def(\"snap\", &Core::snapImage, \"Acquires one frame.\" RGIL);\n";
        let locator = BindingLocator::new("RGIL");
        let entries = literals_in(&locator, source, "test.cc").unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.binding, "snap");
        assert_eq!(e.text, "Acquires one frame.");
        assert_eq!((e.line, e.column), (2, 36));
        assert_eq!(e.end_line, 2);
        assert!(e.end_column > e.column);
    }

    #[test]
    fn undocumented_sites_are_not_listed() {
        let source = r#"cls.def("snap", &Core::snapImage RGIL);"#;
        let locator = BindingLocator::new("RGIL");
        let entries = literals_in(&locator, source, "test.cc").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn escapes_are_decoded() {
        let source = r#"cls.def("snap", &Core::snapImage, "Say \"cheese\".\nNow." RGIL);"#;
        let locator = BindingLocator::new("RGIL");
        let entries = literals_in(&locator, source, "test.cc").unwrap();
        assert_eq!(entries[0].text, "Say \"cheese\".\nNow.");
    }
}
