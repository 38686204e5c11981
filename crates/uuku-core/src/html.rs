//! Text extraction from directory listings and build pages.
//!
//! Both upstream pages are semi-structured HTML with a stable but
//! undocumented layout. The resolvers only need the visible text, in
//! document order: anchor text of directory entries on the index, and the
//! status lines plus file links on a build page. Markup is stripped, each
//! text run is split into lines, and every trimmed, non-empty line becomes
//! one token.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("entity pattern is valid")
});

/// The document could not be split into tags and text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `<` opening a tag has no closing `>`.
    #[error("unterminated tag at byte {offset}")]
    UnterminatedTag { offset: usize },

    /// A `<!--` has no closing `-->`.
    #[error("unterminated comment at byte {offset}")]
    UnterminatedComment { offset: usize },
}

/// Split `html` into its visible text tokens, in document order.
///
/// A `<` that is not followed by a tag name, `/`, `!` or `?` is treated as
/// literal text, the way browsers do.
///
/// # Errors
///
/// Returns [`ParseError`] when a tag or comment is left open at the end of
/// the document.
pub fn text_tokens(html: &str) -> Result<Vec<String>, ParseError> {
    let bytes = html.as_bytes();
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut pos = 0;

    while let Some(rel) = html[pos..].find('<') {
        let start = pos + rel;
        match bytes.get(start + 1).copied() {
            Some(b'!') if html[start..].starts_with("<!--") => {
                text.push_str(&html[pos..start]);
                flush(&mut text, &mut tokens);
                let body = start + 4;
                let end = html[body..]
                    .find("-->")
                    .ok_or(ParseError::UnterminatedComment { offset: start })?;
                pos = body + end + 3;
            }
            Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?') => {
                text.push_str(&html[pos..start]);
                flush(&mut text, &mut tokens);
                let end =
                    tag_end(bytes, start).ok_or(ParseError::UnterminatedTag { offset: start })?;
                pos = end + 1;
            }
            _ => {
                text.push_str(&html[pos..=start]);
                pos = start + 1;
            }
        }
    }
    text.push_str(&html[pos..]);
    flush(&mut text, &mut tokens);

    Ok(tokens)
}

/// Index of the `>` closing the tag opened at `start`. A `>` inside a quoted
/// attribute value does not close the tag.
fn tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote = None;
    let mut after_eq = false;
    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'>' => return Some(i),
            b'"' | b'\'' if after_eq => quote = Some(b),
            b'=' => {
                after_eq = true;
                continue;
            }
            _ if b.is_ascii_whitespace() => continue,
            _ => {}
        }
        after_eq = false;
    }
    None
}

fn flush(text: &mut String, tokens: &mut Vec<String>) {
    for line in text.lines() {
        let decoded = decode_entities(line);
        let trimmed = decoded.trim();
        if !trimmed.is_empty() {
            tokens.push(trimmed.to_string());
        }
    }
    text.clear();
}

/// Replace character references (`&amp;`, `&#47;`, `&#x2F;`) with the
/// characters they stand for. Unknown named references are left as is.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY
        .replace_all(s, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
