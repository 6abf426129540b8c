use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AcxError, Result};

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9A-Za-z]+(\.[0-9A-Za-z]+)*$").expect("valid regex"))
}

/// Normalize an account code as it is ingested.
///
/// Spreadsheet exports drop the trailing zero of the second segment
/// (`2.10` becomes `2.1`), so a single-character second segment is padded
/// on the right with `0`. The root and deeper segments are kept as written.
pub fn normalize_code(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if !code_pattern().is_match(trimmed) {
        return Err(AcxError::InvalidCode(raw.to_string()));
    }
    let segments: Vec<String> = trimmed
        .split('.')
        .enumerate()
        .map(|(i, seg)| {
            if i == 1 && seg.len() == 1 {
                format!("{seg}0")
            } else {
                seg.to_string()
            }
        })
        .collect();
    Ok(segments.join("."))
}

/// Depth in the hierarchy: one plus the number of separators.
pub fn level_of(code: &str) -> i64 {
    1 + code.matches('.').count() as i64
}

/// `A.B.C` → `A.B`; root codes have no parent.
pub fn parent_of(code: &str) -> Option<&str> {
    code.rsplit_once('.').map(|(parent, _)| parent)
}

pub fn is_ancestor_or_self(ancestor: &str, code: &str) -> bool {
    code == ancestor
        || (code.len() > ancestor.len()
            && code.starts_with(ancestor)
            && code.as_bytes()[ancestor.len()] == b'.')
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    if numeric(a) && numeric(b) {
        let a_trim = a.trim_start_matches('0');
        let b_trim = b.trim_start_matches('0');
        a_trim
            .len()
            .cmp(&b_trim.len())
            .then_with(|| a_trim.cmp(b_trim))
            .then_with(|| a.cmp(b))
    } else {
        a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
    }
}

/// Segment-aware ordering of dot-separated codes: numeric segments compare
/// by value (`9` < `10`), and a parent sorts before its children.
pub fn compare_codes(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => match compare_segment(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}
