//! Call-site discovery in wrapper binding source.
//!
//! Scans for `.def("name", <body>)` statements. The body is bounded by the
//! statement scanner, never by a first-`)` regex — bodies routinely contain
//! lambdas, nested calls and string literals. Sites are yielded in source
//! order and a match consumes its full span before scanning resumes.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::arity::count_args;
use crate::scan::{self, ScanError};

static RE_DEF_HEAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.def\s*\(").unwrap());
/// `&Class::identifier`-shaped member-pointer reference.
static RE_BOUND_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&((?:\w+::)+\w+)").unwrap());
/// Explicit overload-resolution helper, e.g. `nb::overload_cast<...>`.
static RE_OVERLOAD_CAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"overload_cast\s*<").unwrap());
/// Member-pointer reference followed directly by a parameter-type list.
static RE_MEMBER_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:\w+::)+\w+\s*\(").unwrap());

/// One discovered `.def("name", ...)` call expression. Transient: created
/// during a scan, consumed by the patcher, then discarded.
#[derive(Debug)]
pub struct CallSite {
    /// Offset of the leading `.` in the source text.
    pub start: usize,
    /// One past the closing `)`.
    pub end: usize,
    /// Absolute offset where `body` begins.
    pub body_start: usize,
    /// `.def("name",` through the whitespace before the body.
    pub prefix: String,
    /// Everything between the name argument and the closing paren.
    pub body: String,
    /// The closing delimiter.
    pub suffix: String,
    /// The exposed name — the first (string literal) argument.
    pub binding_name: String,
    /// Qualified native symbol the site binds, when resolvable.
    pub bound_symbol: Option<String>,
    /// Parameter count, when a symbol was resolved.
    pub arity: Option<usize>,
    /// Escaped content of the docstring literal already present, if any.
    pub existing_literal: Option<String>,
    /// Byte range of that literal's content within `body`.
    pub literal_span: Option<Range<usize>>,
}

pub struct BindingLocator {
    existing_literal: Regex,
}

impl BindingLocator {
    /// `marker` is the fixed token a docstring literal must precede
    /// (the original convention: a release-GIL macro at the end of the body).
    pub fn new(marker: &str) -> Self {
        let existing_literal = Regex::new(&format!(
            r#"(?s),\s*"((?:[^"\\]|\\.)*)"\s*{}"#,
            regex::escape(marker)
        ))
        .unwrap();
        Self { existing_literal }
    }

    /// Scan wrapper source and yield every binding call site in source order.
    ///
    /// `.def(...)` heads whose first argument is not a string literal (such
    /// as constructor bindings) are not call sites; scanning resumes without
    /// consuming the trailing text. An unbalanced statement is fatal.
    pub fn locate(&self, source: &str) -> Result<Vec<CallSite>, ScanError> {
        let bytes = source.as_bytes();
        let mut sites = Vec::new();
        let mut pos = 0;

        while let Some(head) = RE_DEF_HEAD.find_at(source, pos) {
            let open = head.end() - 1;
            let close = scan::matching_delimiter(source, open)?;

            let name_start = skip_ws(bytes, open + 1, close);
            if bytes.get(name_start) != Some(&b'"') {
                // e.g. `.def(nb::init<>())` — no exposed name, not a site
                pos = open + 1;
                continue;
            }
            let name_close = scan::skip_string(bytes, name_start)?;
            let binding_name = source[name_start + 1..name_close].to_string();

            let after_name = skip_ws(bytes, name_close + 1, close);
            if bytes.get(after_name) != Some(&b',') {
                pos = close + 1;
                continue;
            }
            let body_start = skip_ws(bytes, after_name + 1, close);
            let body = source[body_start..close].to_string();

            let bound_symbol = RE_BOUND_SYMBOL
                .captures(&body)
                .map(|c| c[1].to_string());
            let arity = bound_symbol.as_ref().map(|_| resolve_arity(&body));
            let (existing_literal, literal_span) = match self.existing_literal.captures(&body) {
                Some(caps) => {
                    let lit = caps.get(1).unwrap();
                    (Some(lit.as_str().to_string()), Some(lit.range()))
                }
                None => (None, None),
            };

            sites.push(CallSite {
                start: head.start(),
                end: close + 1,
                body_start,
                prefix: source[head.start()..body_start].to_string(),
                body,
                suffix: ")".to_string(),
                binding_name,
                bound_symbol,
                arity,
                existing_literal,
                literal_span,
            });
            pos = close + 1;
        }
        Ok(sites)
    }
}

/// Resolve the parameter count of a call-site body.
///
/// An explicit, ordered list of independent strategies combined by
/// first-success-wins — binding declarations vary in how explicitly they
/// spell out overload disambiguation, so resolution degrades gracefully:
/// overload-cast type list, then explicit member signature, then counting
/// the `"_a` positional-argument name markers (which always succeeds).
fn resolve_arity(body: &str) -> usize {
    let strategies: [&dyn Fn(&str) -> Option<usize>; 3] = [
        &arity_from_overload_cast,
        &arity_from_member_signature,
        &arity_from_arg_markers,
    ];
    strategies
        .iter()
        .find_map(|strategy| strategy(body))
        .unwrap_or(0)
}

fn arity_from_overload_cast(body: &str) -> Option<usize> {
    let head = RE_OVERLOAD_CAST.find(body)?;
    let open = head.end() - 1;
    let close = scan::matching_angle(body, open).ok()?;
    Some(count_args(&body[open + 1..close]))
}

fn arity_from_member_signature(body: &str) -> Option<usize> {
    let head = RE_MEMBER_SIGNATURE.find(body)?;
    let open = head.end() - 1;
    let close = scan::matching_delimiter(body, open).ok()?;
    Some(count_args(&body[open + 1..close]))
}

fn arity_from_arg_markers(body: &str) -> Option<usize> {
    Some(body.matches("\"_a").count())
}

fn skip_ws(bytes: &[u8], mut at: usize, limit: usize) -> usize {
    while at < limit && bytes[at].is_ascii_whitespace() {
        at += 1;
    }
    at
}
