//! Chapter selection expressions
//!
//! A selection expression is a comma-separated list of tokens, each a
//! single signed integer or a range `a-b` of signed integers. Negative
//! values count from the end: `-1` is the last known chapter, `-2` the
//! second-to-last. `"all"` selects every chapter. This grammar is shared
//! by direct user input and the batch drivers (latest-all, tag-all reuse
//! it for page ranges), so it is parsed exactly as specified here.

use crate::error::{Error, Result};
use std::collections::HashSet;

/// Resolve a selection expression against the highest known chapter index.
///
/// Returns the concrete chapter indices in first-seen order, de-duplicated,
/// each at least 1. An empty expression means `"-1"` (the latest chapter).
/// `select_all` (or a literal `"all"` token) bypasses parsing and returns
/// the full ascending sequence `1..=last_index`.
///
/// Ranges are expanded inclusively in ascending order after resolving both
/// bounds, regardless of which bound is larger ("3-1" means 1,2,3).
/// Tokens that resolve below 1 (e.g. `-5` against a 3-chapter comic) are
/// dropped; indices above `last_index` are kept and fail later as
/// chapter-not-found.
///
/// # Errors
///
/// [`Error::Specifier`] if `last_index` is 0 or a token is neither an
/// integer nor a well-formed range.
///
/// # Examples
///
/// ```
/// use comic_dl::specifier::resolve;
///
/// assert_eq!(resolve("-1", 100, false).unwrap(), vec![100]);
/// assert_eq!(resolve("1-5,7,9-10", 100, false).unwrap(), vec![1, 2, 3, 4, 5, 7, 9, 10]);
/// assert_eq!(resolve("all", 5, false).unwrap(), vec![1, 2, 3, 4, 5]);
/// ```
pub fn resolve(spec: &str, last_index: u32, select_all: bool) -> Result<Vec<u32>> {
    if last_index < 1 {
        return Err(Error::Specifier {
            spec: spec.to_string(),
            reason: "last chapter index is unknown".to_string(),
        });
    }

    let spec = spec.trim();
    if select_all || spec.eq_ignore_ascii_case("all") {
        return Ok((1..=last_index).collect());
    }

    let spec = if spec.is_empty() { "-1" } else { spec };

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut push = |index: i64| {
        // Indices that resolve below 1 are dropped, not clamped.
        if index >= 1 && index <= u32::MAX as i64 {
            let index = index as u32;
            if seen.insert(index) {
                result.push(index);
            }
        }
    };

    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(invalid(spec, token, "empty token"));
        }
        match parse_token(token) {
            Some(Token::Single(v)) => push(resolve_index(v, last_index)),
            Some(Token::Range(a, b)) => {
                let a = resolve_index(a, last_index);
                let b = resolve_index(b, last_index);
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                for index in lo..=hi {
                    push(index);
                }
            }
            None => {
                return Err(invalid(spec, token, "not an integer or range"));
            }
        }
    }

    Ok(result)
}

enum Token {
    Single(i64),
    Range(i64, i64),
}

/// Parse one comma-separated token.
///
/// A whole-token integer parse wins first, so "-1" is a single negative
/// index rather than a malformed range. Otherwise every interior '-' is
/// tried as the range separator, which makes signed bounds like "-3--1"
/// parse correctly.
fn parse_token(token: &str) -> Option<Token> {
    if let Ok(v) = token.parse::<i64>() {
        return Some(Token::Single(v));
    }
    for (pos, ch) in token.char_indices().skip(1) {
        if ch != '-' {
            continue;
        }
        let (left, right) = (&token[..pos], &token[pos + 1..]);
        if let (Ok(a), Ok(b)) = (left.parse::<i64>(), right.parse::<i64>()) {
            return Some(Token::Range(a, b));
        }
    }
    None
}

/// `-1` denotes the last index, `-2` the second-to-last.
fn resolve_index(value: i64, last_index: u32) -> i64 {
    if value < 0 {
        last_index as i64 + 1 + value
    } else {
        value
    }
}

fn invalid(spec: &str, token: &str, reason: &str) -> Error {
    Error::Specifier {
        spec: spec.to_string(),
        reason: format!("token {token:?}: {reason}"),
    }
}
