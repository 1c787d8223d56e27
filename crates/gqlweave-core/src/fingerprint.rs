//! Literal fingerprinting.
//!
//! A fingerprint is the SHA-256 of the schema fingerprint followed by the
//! literal's normalized text. Normalization drops every GraphQL ignored token
//! (whitespace, line terminators, commas, comments, BOM) and keeps a single
//! space only where two adjacent tokens would otherwise merge. Block strings
//! are re-printed with their common indentation removed, so re-indenting a
//! literal never changes its fingerprint.

use sha2::{Digest, Sha256};

/// Compute the cache key for a literal under a schema fingerprint.
pub fn fingerprint(schema_hash: &str, literal: &str) -> String {
    fingerprint_normalized(schema_hash, &normalize(literal))
}

/// Compute the cache key from already-normalized literal text.
pub fn fingerprint_normalized(schema_hash: &str, normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schema_hash.as_bytes());
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Punctuator,
    Word,
    String,
}

/// Strip ignored characters from GraphQL source text.
///
/// String values are preserved byte for byte and block strings are dedented.
/// Input that is not valid GraphQL is still normalized token by token;
/// validation belongs to the generation engine.
pub fn normalize(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut prev: Option<TokenKind> = None;
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let (kind, end) = match c {
            b' ' | b'\t' | b'\n' | b'\r' | b',' => {
                pos += 1;
                continue;
            }
            b'#' => {
                while pos < bytes.len() && bytes[pos] != b'\n' && bytes[pos] != b'\r' {
                    pos += 1;
                }
                continue;
            }
            b'"' => (TokenKind::String, scan_string(bytes, pos)),
            b'.' if bytes[pos..].starts_with(b"...") => (TokenKind::Punctuator, pos + 3),
            b'!' | b'$' | b'&' | b'(' | b')' | b':' | b'=' | b'@' | b'[' | b']' | b'{'
            | b'|' | b'}' => (TokenKind::Punctuator, pos + 1),
            _ if source[pos..].starts_with('\u{feff}') => {
                pos += '\u{feff}'.len_utf8();
                continue;
            }
            _ => (TokenKind::Word, scan_word(bytes, pos)),
        };

        if kind != TokenKind::Punctuator && prev.is_some_and(|p| p != TokenKind::Punctuator) {
            out.push(' ');
        }
        let token = &source[pos..end];
        match dedent_block_string(token) {
            Some(block) => out.push_str(&block),
            None => out.push_str(token),
        }
        prev = Some(kind);
        pos = end;
    }

    out
}

/// End offset of a string or block string starting at `start`.
fn scan_string(bytes: &[u8], start: usize) -> usize {
    if bytes[start..].starts_with(b"\"\"\"") {
        let mut pos = start + 3;
        while pos < bytes.len() {
            if bytes[pos..].starts_with(b"\\\"\"\"") {
                pos += 4;
            } else if bytes[pos..].starts_with(b"\"\"\"") {
                return pos + 3;
            } else {
                pos += 1;
            }
        }
        return bytes.len();
    }

    let mut pos = start + 1;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'"' => return pos + 1,
            b'\n' | b'\r' => return pos,
            _ => pos += 1,
        }
    }
    bytes.len().min(pos)
}

/// Re-print a terminated block string token with its common indentation and
/// leading/trailing blank lines removed. `None` for any other token.
fn dedent_block_string(token: &str) -> Option<String> {
    const QUOTES: &str = "\"\"\"";
    if token.len() < 2 * QUOTES.len() || !token.starts_with(QUOTES) || !token.ends_with(QUOTES) {
        return None;
    }
    let raw = &token[QUOTES.len()..token.len() - QUOTES.len()];

    let mut body = block_string_value(raw);
    if block_string_indentation(&body) > 0 {
        body.insert(0, '\n');
    }
    let trailing_quote = body.ends_with('"') && !body.ends_with("\\\"\"\"");
    if trailing_quote || body.ends_with('\\') {
        body.push('\n');
    }
    Some(format!("{QUOTES}{body}{QUOTES}"))
}

fn block_string_value(raw: &str) -> String {
    let indent = block_string_indentation(raw);
    let mut lines: Vec<&str> = split_lines(raw)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line
            } else {
                &line[indent.min(line.len())..]
            }
        })
        .collect();

    while lines.first().is_some_and(|l| is_blank(l)) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| is_blank(l)) {
        lines.pop();
    }
    lines.join("\n")
}

/// Smallest indentation of any non-blank line after the first.
fn block_string_indentation(value: &str) -> usize {
    split_lines(value)
        .into_iter()
        .skip(1)
        .filter(|line| !is_blank(line))
        .map(leading_whitespace)
        .min()
        .unwrap_or(0)
}

fn split_lines(value: &str) -> Vec<&str> {
    let bytes = value.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\n' => {
                lines.push(&value[start..pos]);
                pos += 1;
                start = pos;
            }
            b'\r' => {
                lines.push(&value[start..pos]);
                pos += if bytes.get(pos + 1) == Some(&b'\n') { 2 } else { 1 };
                start = pos;
            }
            _ => pos += 1,
        }
    }
    lines.push(&value[start..]);
    lines
}

fn leading_whitespace(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

fn is_blank(line: &str) -> bool {
    leading_whitespace(line) == line.len()
}

/// End offset of a name or number token starting at `start`.
fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut pos = start;
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\n' | b'\r' | b',' | b'#' | b'"' | b'!' | b'$' | b'&' | b'('
            | b')' | b':' | b'=' | b'@' | b'[' | b']' | b'{' | b'|' | b'}' => break,
            b'.' if bytes[pos..].starts_with(b"...") => break,
            // Multi-byte UTF-8 sequences never contain ASCII bytes, so the
            // returned offset always lands on a char boundary.
            _ => pos += 1,
        }
    }
    pos.max(start + 1).min(bytes.len())
}
