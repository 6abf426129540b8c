use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codes::compare_codes;
use crate::error::AcxError;

/// Result ordering offered by the search view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Best full-text score first, ties by account code.
    Relevance,
    /// Account code ascending, score ignored.
    #[default]
    AccountCode,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relevance => f.write_str("Relevance"),
            Self::AccountCode => f.write_str("Account Code"),
        }
    }
}

impl FromStr for SortMode {
    type Err = AcxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relevance" | "rank" | "score" => Ok(Self::Relevance),
            "code" | "account_code" | "account-code" => Ok(Self::AccountCode),
            other => Err(AcxError::Other(format!("Unknown sort mode: {other}"))),
        }
    }
}

/// One entry of a result list.
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i64,
    pub account_code: String,
    pub description: String,
    pub level: i64,
    pub score: f64,
}

fn by_code(a: &SearchHit, b: &SearchHit) -> Ordering {
    compare_codes(&a.account_code, &b.account_code)
}

/// Order hits for presentation. Deterministic for a fixed input set:
/// codes are unique, so the tie-break is total.
pub fn rank(hits: &mut [SearchHit], mode: SortMode) {
    match mode {
        SortMode::Relevance => hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| by_code(a, b))
        }),
        SortMode::AccountCode => hits.sort_by(by_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(code: &str, score: f64) -> SearchHit {
        SearchHit {
            id: 0,
            account_code: code.to_string(),
            description: String::new(),
            level: crate::codes::level_of(code),
            score,
        }
    }

    fn codes(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.account_code.as_str()).collect()
    }

    #[test]
    fn test_account_code_mode_is_numeric_aware() {
        let mut hits = vec![hit("2.10", 9.0), hit("2.1", 0.1), hit("2.9", 5.0)];
        rank(&mut hits, SortMode::AccountCode);
        assert_eq!(codes(&hits), vec!["2.1", "2.9", "2.10"]);
    }

    #[test]
    fn test_relevance_mode_orders_by_score() {
        let mut hits = vec![hit("1", 0.5), hit("2", 3.0), hit("3", 1.5)];
        rank(&mut hits, SortMode::Relevance);
        assert_eq!(codes(&hits), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_relevance_ties_break_by_code() {
        let mut hits = vec![hit("2.10", 1.0), hit("3", 2.0), hit("2.9", 1.0)];
        rank(&mut hits, SortMode::Relevance);
        assert_eq!(codes(&hits), vec!["3", "2.9", "2.10"]);
    }

    #[test]
    fn test_parse_sort_mode() {
        assert_eq!("Relevance".parse::<SortMode>().unwrap(), SortMode::Relevance);
        assert_eq!("code".parse::<SortMode>().unwrap(), SortMode::AccountCode);
        assert!("date".parse::<SortMode>().is_err());
        assert_eq!(SortMode::default(), SortMode::AccountCode);
    }
}
