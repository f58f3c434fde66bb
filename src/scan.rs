//! Delimiter-aware statement scanning.
//!
//! The single primitive behind call-site extraction, overload type-list
//! extraction, and statement-end detection: given the offset of an opening
//! delimiter, find its matching closer while skipping string literals.
//! A regex cannot do this — bodies contain nested lambdas, escaped quotes,
//! and C++ raw strings whose content is entirely opaque.

use thiserror::Error;

/// Scanning failures. All of them mean the input cannot be trusted enough
/// to patch, so callers treat them as fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Input ended before nesting returned to zero.
    #[error("unbalanced delimiter opened at byte {opened_at}")]
    Unbalanced { opened_at: usize },

    /// A closer appeared that does not match the innermost opener.
    #[error("mismatched closer `{found}` at byte {at}")]
    Mismatched { found: char, at: usize },

    /// The offset handed in does not sit on a recognized opener.
    #[error("no opening delimiter at byte {at}")]
    NotAnOpener { at: usize },

    /// A string literal never terminates.
    #[error("unterminated string literal starting at byte {opened_at}")]
    UnterminatedString { opened_at: usize },
}

/// Return the offset of the closer matching the opener at `open_at`.
///
/// Tracks nested `()`, `[]` and `{}` with a stack, and skips double-quoted
/// strings (backslash escapes honored) and raw string literals of the form
/// `R"delim( ... )delim"` (with optional `u8`/`u`/`U`/`L` encoding prefix),
/// whose content is taken verbatim.
pub fn matching_delimiter(text: &str, open_at: usize) -> Result<usize, ScanError> {
    let bytes = text.as_bytes();
    let first = *bytes.get(open_at).ok_or(ScanError::NotAnOpener { at: open_at })?;
    let mut stack: Vec<u8> = vec![closer_for(first).ok_or(ScanError::NotAnOpener { at: open_at })?];

    let mut i = open_at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = if is_raw_string_quote(bytes, i) {
                    skip_raw_string(bytes, i)?
                } else {
                    skip_string(bytes, i)?
                };
            }
            b @ (b'(' | b'[' | b'{') => {
                // closer_for is infallible for these three
                stack.push(closer_for(b).unwrap());
            }
            b @ (b')' | b']' | b'}') => {
                match stack.pop() {
                    Some(expected) if expected == b => {
                        if stack.is_empty() {
                            return Ok(i);
                        }
                    }
                    _ => {
                        return Err(ScanError::Mismatched {
                            found: b as char,
                            at: i,
                        })
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(ScanError::Unbalanced { opened_at: open_at })
}

/// Return the offset of the `>` matching the `<` at `open_at`.
///
/// Used for `overload_cast<...>` type lists. Parenthesized regions are
/// skipped via [`matching_delimiter`] so function-pointer types like
/// `void (*)(int)` cannot unbalance the angle depth; quoted regions are
/// skipped for the same reason.
pub fn matching_angle(text: &str, open_at: usize) -> Result<usize, ScanError> {
    let bytes = text.as_bytes();
    if bytes.get(open_at) != Some(&b'<') {
        return Err(ScanError::NotAnOpener { at: open_at });
    }
    let mut depth = 1usize;
    let mut i = open_at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = if is_raw_string_quote(bytes, i) {
                    skip_raw_string(bytes, i)?
                } else {
                    skip_string(bytes, i)?
                };
            }
            b'(' | b'[' | b'{' => {
                i = matching_delimiter(text, i)?;
            }
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(ScanError::Unbalanced { opened_at: open_at })
}

/// Skip a conventional double-quoted string. `quote_at` is the opening `"`;
/// returns the offset of the closing `"`.
pub fn skip_string(bytes: &[u8], quote_at: usize) -> Result<usize, ScanError> {
    let mut i = quote_at + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i),
            _ => i += 1,
        }
    }
    Err(ScanError::UnterminatedString { opened_at: quote_at })
}

/// True if the `"` at `quote_at` opens a raw string literal, i.e. it is
/// preceded by a standalone `R`, `LR`, `uR`, `UR` or `u8R` prefix.
fn is_raw_string_quote(bytes: &[u8], quote_at: usize) -> bool {
    if quote_at == 0 || bytes[quote_at - 1] != b'R' {
        return false;
    }
    // Walk back over the full identifier-like run preceding the quote and
    // check it is exactly one of the raw-literal prefixes.
    let mut start = quote_at - 1;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    matches!(&bytes[start..quote_at], b"R" | b"LR" | b"uR" | b"UR" | b"u8R")
}

/// Skip a raw string literal. `quote_at` is the `"` after the `R` prefix;
/// returns the offset of the final `"` of the `)delim"` terminator.
fn skip_raw_string(bytes: &[u8], quote_at: usize) -> Result<usize, ScanError> {
    // delimiter chars run from the quote to the first '('
    let mut paren = quote_at + 1;
    while paren < bytes.len() && bytes[paren] != b'(' {
        paren += 1;
    }
    if paren >= bytes.len() {
        return Err(ScanError::UnterminatedString { opened_at: quote_at });
    }
    let delim = &bytes[quote_at + 1..paren];

    let mut i = paren + 1;
    while i < bytes.len() {
        if bytes[i] == b')'
            && bytes.len() > i + delim.len() + 1
            && &bytes[i + 1..i + 1 + delim.len()] == delim
            && bytes[i + 1 + delim.len()] == b'"'
        {
            return Ok(i + delim.len() + 1);
        }
        i += 1;
    }
    Err(ScanError::UnterminatedString { opened_at: quote_at })
}

fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
