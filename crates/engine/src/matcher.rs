use crate::row::Row;
use serde::{Deserialize, Serialize};
use tallysheet_sheet::CellValue;

/// A predicate over a single cell of a row. Used by boundary grouping
/// rules, qualifiers, and the signed-accumulation `subtract_when` option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Cell equals the given value (numeric values compare numerically).
    Equals(CellValue),
    /// Cell differs from the given value.
    NotEquals(CellValue),
    /// Cell text contains the given substring.
    Contains(String),
    /// Cell is blank (or the column is absent).
    IsBlank,
    /// Cell holds a numeric value.
    IsNumber,
    /// Cell is numeric and strictly greater than the given bound.
    GreaterThan(f64),
    /// Cell is numeric and strictly less than the given bound.
    LessThan(f64),
}

/// Outcome of matching a row against a `RowMatcher`.
///
/// `MissingCell` is distinct from `NotMatched` so that must-have
/// qualifiers can tell "present but different" apart from "absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    Matched,
    NotMatched,
    MissingCell,
}

/// A named-column predicate over a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowMatcher {
    pub column: String,
    pub predicate: Predicate,
}

impl RowMatcher {
    /// Build a matcher over a column.
    #[must_use]
    pub fn new(column: &str, predicate: Predicate) -> Self {
        RowMatcher {
            column: column.to_string(),
            predicate,
        }
    }

    /// Convenience equality matcher.
    #[must_use]
    pub fn equals<V: Into<CellValue>>(column: &str, value: V) -> Self {
        Self::new(column, Predicate::Equals(value.into()))
    }

    /// Match a row against this predicate.
    #[must_use]
    pub fn matches(&self, row: &Row) -> MatchResult {
        let cell = row.get(&self.column);

        // IsBlank is the one predicate a missing cell can satisfy
        if matches!(self.predicate, Predicate::IsBlank) {
            return if cell.map_or(true, CellValue::is_blank) {
                MatchResult::Matched
            } else {
                MatchResult::NotMatched
            };
        }

        let Some(cell) = cell else {
            return MatchResult::MissingCell;
        };
        if cell.is_blank() {
            return MatchResult::MissingCell;
        }

        let matched = match &self.predicate {
            Predicate::Equals(v) => cells_equal(cell, v),
            Predicate::NotEquals(v) => !cells_equal(cell, v),
            Predicate::Contains(s) => cell.as_str().contains(s.as_str()),
            Predicate::IsNumber => cell.as_float().is_some(),
            Predicate::GreaterThan(bound) => cell.as_float().is_some_and(|f| f > *bound),
            Predicate::LessThan(bound) => cell.as_float().is_some_and(|f| f < *bound),
            Predicate::IsBlank => unreachable!("handled above"),
        };

        if matched {
            MatchResult::Matched
        } else {
            MatchResult::NotMatched
        }
    }
}

/// Loose cell equality: numeric values compare numerically (so `Int(10)`
/// equals `Float(10.0)`), everything else compares by text.
fn cells_equal(a: &CellValue, b: &CellValue) -> bool {
    if let (Some(x), Some(y)) = (a.as_float(), b.as_float()) {
        return (x - y).abs() < f64::EPSILON;
    }
    a.as_str() == b.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn row(pairs: Vec<(&str, CellValue)>) -> Row {
        let cells: IndexMap<String, CellValue> =
            pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Row::new(1, cells)
    }

    #[test]
    fn test_equals_text() {
        let r = row(vec![("flag", CellValue::String("include".into()))]);
        assert_eq!(
            RowMatcher::equals("flag", "include").matches(&r),
            MatchResult::Matched
        );
        assert_eq!(
            RowMatcher::equals("flag", "exclude").matches(&r),
            MatchResult::NotMatched
        );
    }

    #[test]
    fn test_equals_numeric_loose() {
        let r = row(vec![("code", CellValue::Float(4000.0))]);
        assert_eq!(
            RowMatcher::equals("code", 4000).matches(&r),
            MatchResult::Matched
        );
    }

    #[test]
    fn test_missing_cell() {
        let r = row(vec![("flag", CellValue::Null)]);
        assert_eq!(
            RowMatcher::equals("flag", "include").matches(&r),
            MatchResult::MissingCell
        );
        assert_eq!(
            RowMatcher::equals("other", "x").matches(&r),
            MatchResult::MissingCell
        );
    }

    #[test]
    fn test_is_blank() {
        let r = row(vec![("a", CellValue::Null), ("b", CellValue::Int(1))]);
        let blank = RowMatcher::new("a", Predicate::IsBlank);
        assert_eq!(blank.matches(&r), MatchResult::Matched);
        let not_blank = RowMatcher::new("b", Predicate::IsBlank);
        assert_eq!(not_blank.matches(&r), MatchResult::NotMatched);
    }

    #[test]
    fn test_numeric_bounds() {
        let r = row(vec![("amt", CellValue::Float(10.0))]);
        assert_eq!(
            RowMatcher::new("amt", Predicate::GreaterThan(5.0)).matches(&r),
            MatchResult::Matched
        );
        assert_eq!(
            RowMatcher::new("amt", Predicate::LessThan(5.0)).matches(&r),
            MatchResult::NotMatched
        );
    }

    #[test]
    fn test_contains() {
        let r = row(vec![("desc", CellValue::String("opening balance".into()))]);
        assert_eq!(
            RowMatcher::new("desc", Predicate::Contains("balance".into())).matches(&r),
            MatchResult::Matched
        );
    }
}
