//! JSON decoding shared by the policy and input parsers
//!
//! - Nesting is accepted up to [`MAX_NESTING_DEPTH`] levels and decoded on a
//!   growable stack rather than the caller's
//! - Lone UTF-16 surrogate escapes decode as U+FFFD instead of failing
//! - Trailing characters after the document are rejected

use serde::de::{DeserializeOwned, Error as _};
use std::borrow::Cow;

/// Deepest array/object nesting accepted in a document, root included
pub const MAX_NESTING_DEPTH: usize = 10_000;

const REPLACEMENT_ESCAPE: &[u8; 6] = b"\\ufffd";

/// Decode a complete JSON document
pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> serde_json::Result<T> {
    let bytes = prepare(bytes)?;

    let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
    deserializer.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;

    Ok(value)
}

/// Check the nesting depth and rewrite lone surrogate escapes
///
/// Borrows the payload unless a rewrite is needed. The rewrite keeps every
/// byte offset, since `\ufffd` is as long as the escape it replaces.
fn prepare(bytes: &[u8]) -> serde_json::Result<Cow<'_, [u8]>> {
    let mut lone_escapes = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];

        if in_string {
            match byte {
                b'"' => in_string = false,
                b'\\' if bytes.get(i + 1) == Some(&b'u') => match unicode_escape(bytes, i) {
                    Some(0xD800..=0xDBFF) => {
                        if matches!(unicode_escape(bytes, i + 6), Some(0xDC00..=0xDFFF)) {
                            i += 12;
                        } else {
                            lone_escapes.push(i);
                            i += 6;
                        }
                        continue;
                    }
                    Some(0xDC00..=0xDFFF) => {
                        lone_escapes.push(i);
                        i += 6;
                        continue;
                    }
                    Some(_) => {
                        i += 6;
                        continue;
                    }
                    // Malformed escape, left for the decoder to report
                    None => {
                        i += 2;
                        continue;
                    }
                },
                b'\\' => {
                    i += 2;
                    continue;
                }
                _ => {}
            }
        } else {
            match byte {
                b'"' => in_string = true,
                b'[' | b'{' => {
                    depth += 1;
                    if depth > MAX_NESTING_DEPTH {
                        return Err(serde_json::Error::custom(format!(
                            "nesting exceeds {} levels",
                            MAX_NESTING_DEPTH
                        )));
                    }
                }
                b']' | b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        i += 1;
    }

    if lone_escapes.is_empty() {
        return Ok(Cow::Borrowed(bytes));
    }

    let mut rewritten = bytes.to_vec();
    for start in lone_escapes {
        rewritten[start..start + REPLACEMENT_ESCAPE.len()].copy_from_slice(REPLACEMENT_ESCAPE);
    }
    Ok(Cow::Owned(rewritten))
}

/// Code unit of a `\uXXXX` escape starting at `at`
fn unicode_escape(bytes: &[u8], at: usize) -> Option<u16> {
    let escape = bytes.get(at..at + 6)?;
    if &escape[..2] != b"\\u" || !escape[2..].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let digits = std::str::from_utf8(&escape[2..]).ok()?;
    u16::from_str_radix(digits, 16).ok()
}
