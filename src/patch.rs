//! Pure call-site patching: documentation lookup, literal escaping, and
//! byte-exact insertion or replacement of the docstring literal.

use std::fmt;

use crate::bindings::CallSite;
use crate::docs::DocIndex;

/// What the patcher did to a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A docstring literal was inserted before the marker.
    Added,
    /// An existing literal was replaced with different text.
    Updated,
    /// The literal already matches, or the marker is absent.
    Unchanged,
    /// No symbol or no documentation — the site is never touched.
    Skipped,
}

/// Result of patching one call site.
pub struct Patched {
    /// Full new text for the site (prefix + body + suffix).
    pub text: String,
    pub outcome: Outcome,
}

/// Compute the patched text for one call site. Pure: no I/O, and bytes
/// outside the literal insertion/replacement point are carried through
/// untouched.
pub fn patch_site(site: &CallSite, index: &DocIndex, marker: &str) -> Patched {
    let unchanged = |outcome| Patched {
        text: format!("{}{}{}", site.prefix, site.body, site.suffix),
        outcome,
    };

    let Some(symbol) = site.bound_symbol.as_deref() else {
        return unchanged(Outcome::Skipped);
    };
    let Some(doc) = index.lookup(symbol, site.arity.unwrap_or(0)) else {
        return unchanged(Outcome::Skipped);
    };
    let escaped = escape_literal(doc);

    if let (Some(existing), Some(span)) = (&site.existing_literal, &site.literal_span) {
        if *existing == escaped {
            return unchanged(Outcome::Unchanged);
        }
        let mut body = String::with_capacity(site.body.len() + escaped.len());
        body.push_str(&site.body[..span.start]);
        body.push_str(&escaped);
        body.push_str(&site.body[span.end..]);
        return Patched {
            text: format!("{}{}{}", site.prefix, body, site.suffix),
            outcome: Outcome::Updated,
        };
    }

    // No literal yet: insert one immediately before the marker token.
    let Some(marker_at) = find_marker(&site.body, marker) else {
        return unchanged(Outcome::Unchanged);
    };
    let before = site.body[..marker_at].trim_end();
    let after = &site.body[marker_at..];
    Patched {
        text: format!("{}{}, \"{}\" {}{}", site.prefix, before, escaped, after, site.suffix),
        outcome: Outcome::Added,
    }
}

/// First occurrence of `marker` as a standalone token (preceded by
/// whitespace, not glued to an identifier).
fn find_marker(body: &str, marker: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut from = 0;
    while let Some(rel) = body[from..].find(marker) {
        let at = from + rel;
        let pre_ws = at > 0 && bytes[at - 1].is_ascii_whitespace();
        let post_ok = body[at + marker.len()..]
            .bytes()
            .next()
            .map(|b| !(b.is_ascii_alphanumeric() || b == b'_'))
            .unwrap_or(true);
        if pre_ws && post_ok {
            return Some(at);
        }
        from = at + marker.len();
    }
    None
}

/// Escape text for a double-quoted C/C++ string literal. Quotes and
/// backslashes are backslash-escaped, newlines/tabs become `\n`/`\t`, and
/// remaining control characters use `\uXXXX` (fixed-width, so a following
/// hex digit in the text cannot extend the escape).
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str(r"\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str(r"\n"),
            '\t' => out.push_str(r"\t"),
            '\r' => out.push_str(r"\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_literal`]: decode a literal's source spelling back to
/// its text. Unknown escapes are kept as written.
pub fn unescape_literal(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Added => "added",
            Outcome::Updated => "updated",
            Outcome::Unchanged => "unchanged",
            Outcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}
