use crate::error::{EngineError, EngineResult};
use crate::matcher::{MatchResult, RowMatcher};
use crate::row::Row;
use serde::{Deserialize, Serialize};

/// Unit key used when blank grouping keys are folded together.
pub const UNASSIGNED_KEY: &str = "(unassigned)";

/// Policy for rows whose grouping key is blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Blank key is a partition error.
    #[default]
    Error,
    /// Blank-key rows fold into a single trailing `(unassigned)` unit.
    GroupAsUnassigned,
}

/// How data rows are grouped into iteration units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingRule {
    /// Consecutive rows sharing the key column's value form a unit.
    ByKey {
        column: String,
        #[serde(default)]
        on_missing_key: MissingKeyPolicy,
    },
    /// A row matching `start` opens a unit. With no `end` matcher, the
    /// unit runs until the next start marker; with one, the matching row
    /// closes the unit (inclusive) and an unclosed unit is an error.
    Boundary {
        start: RowMatcher,
        #[serde(default)]
        end: Option<RowMatcher>,
    },
}

/// An ordered, non-empty group of rows evaluated together for one
/// calculation pass. Units partition the data rows exactly.
#[derive(Debug, Clone)]
pub struct Unit {
    key: String,
    rows: Vec<Row>,
}

impl Unit {
    /// The unit's grouping key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The unit's rows, in original sheet order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition ordered rows into units per the grouping rule.
///
/// Output units preserve original row order and are non-overlapping and
/// exhaustive over the input rows.
///
/// # Errors
///
/// `Partition` if the input is empty, a boundary unit never closes, a row
/// falls outside every boundary unit, or a grouping key is blank under the
/// `Error` policy.
pub fn partition(rows: Vec<Row>, rule: &GroupingRule) -> EngineResult<Vec<Unit>> {
    if rows.is_empty() {
        return Err(EngineError::Partition("no data rows to partition".into()));
    }

    match rule {
        GroupingRule::ByKey {
            column,
            on_missing_key,
        } => partition_by_key(rows, column, *on_missing_key),
        GroupingRule::Boundary { start, end } => partition_by_boundary(rows, start, end.as_ref()),
    }
}

fn partition_by_key(
    rows: Vec<Row>,
    column: &str,
    on_missing_key: MissingKeyPolicy,
) -> EngineResult<Vec<Unit>> {
    let mut units: Vec<Unit> = Vec::new();
    let mut unassigned: Vec<Row> = Vec::new();

    for row in rows {
        let key = match row.get(column) {
            Some(cell) if !cell.is_blank() => cell.as_str(),
            _ => match on_missing_key {
                MissingKeyPolicy::Error => {
                    return Err(EngineError::Partition(format!(
                        "blank grouping key '{column}' at row {}",
                        row.index()
                    )));
                }
                MissingKeyPolicy::GroupAsUnassigned => {
                    unassigned.push(row);
                    continue;
                }
            },
        };

        match units.last_mut() {
            Some(unit) if unit.key == key => unit.rows.push(row),
            _ => units.push(Unit {
                key,
                rows: vec![row],
            }),
        }
    }

    if !unassigned.is_empty() {
        units.push(Unit {
            key: UNASSIGNED_KEY.to_string(),
            rows: unassigned,
        });
    }

    Ok(units)
}

fn partition_by_boundary(
    rows: Vec<Row>,
    start: &RowMatcher,
    end: Option<&RowMatcher>,
) -> EngineResult<Vec<Unit>> {
    let mut units: Vec<Unit> = Vec::new();
    let mut current: Option<Unit> = None;

    for row in rows {
        let starts = start.matches(&row) == MatchResult::Matched;

        match end {
            None => {
                // Start-marker-only mode: a marker closes the previous unit
                if starts {
                    if let Some(unit) = current.take() {
                        units.push(unit);
                    }
                    current = Some(Unit {
                        key: boundary_key(&row, start, units.len()),
                        rows: vec![row],
                    });
                } else if let Some(unit) = current.as_mut() {
                    unit.rows.push(row);
                } else {
                    return Err(EngineError::Partition(format!(
                        "row {} precedes the first unit start marker",
                        row.index()
                    )));
                }
            }
            Some(end_matcher) => {
                let ends = end_matcher.matches(&row) == MatchResult::Matched;
                if current.is_none() {
                    if !starts {
                        return Err(EngineError::Partition(format!(
                            "row {} falls outside every boundary unit",
                            row.index()
                        )));
                    }
                    current = Some(Unit {
                        key: boundary_key(&row, start, units.len()),
                        rows: Vec::new(),
                    });
                }
                if let Some(unit) = current.as_mut() {
                    unit.rows.push(row);
                }
                if ends {
                    units.extend(current.take());
                }
            }
        }
    }

    if let Some(unit) = current {
        if end.is_some() {
            return Err(EngineError::Partition(format!(
                "unit '{}' never closes",
                unit.key
            )));
        }
        units.push(unit);
    }

    Ok(units)
}

/// Key for a boundary unit: the start row's value in the matched column,
/// or a positional name when that cell is blank.
fn boundary_key(row: &Row, start: &RowMatcher, position: usize) -> String {
    match row.get(&start.column) {
        Some(cell) if !cell.is_blank() => cell.as_str(),
        _ => format!("unit-{}", position + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Predicate;
    use indexmap::IndexMap;
    use tallysheet_sheet::CellValue;

    fn row(index: usize, pairs: Vec<(&str, CellValue)>) -> Row {
        let cells: IndexMap<String, CellValue> =
            pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Row::new(index, cells)
    }

    fn keyed_rows(keys: &[&str]) -> Vec<Row> {
        keys.iter()
            .enumerate()
            .map(|(i, k)| {
                let cell = if k.is_empty() {
                    CellValue::Null
                } else {
                    CellValue::String((*k).to_string())
                };
                row(i + 1, vec![("Account", cell)])
            })
            .collect()
    }

    #[test]
    fn test_by_key_consecutive_groups() {
        let rule = GroupingRule::ByKey {
            column: "Account".into(),
            on_missing_key: MissingKeyPolicy::Error,
        };
        let units = partition(keyed_rows(&["a", "a", "b", "a"]), &rule).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].key(), "a");
        assert_eq!(units[0].len(), 2);
        assert_eq!(units[1].key(), "b");
        assert_eq!(units[2].key(), "a"); // non-adjacent keys stay separate
    }

    #[test]
    fn test_partition_is_exhaustive_and_disjoint() {
        let rule = GroupingRule::ByKey {
            column: "Account".into(),
            on_missing_key: MissingKeyPolicy::Error,
        };
        let rows = keyed_rows(&["a", "b", "b", "c", "c", "c"]);
        let indices: Vec<usize> = rows.iter().map(Row::index).collect();

        let units = partition(rows, &rule).unwrap();
        let mut seen: Vec<usize> = units
            .iter()
            .flat_map(|u| u.rows().iter().map(Row::index))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, indices);
    }

    #[test]
    fn test_empty_input_errors() {
        let rule = GroupingRule::ByKey {
            column: "Account".into(),
            on_missing_key: MissingKeyPolicy::Error,
        };
        assert!(matches!(
            partition(Vec::new(), &rule),
            Err(EngineError::Partition(_))
        ));
    }

    #[test]
    fn test_blank_key_error_policy() {
        let rule = GroupingRule::ByKey {
            column: "Account".into(),
            on_missing_key: MissingKeyPolicy::Error,
        };
        assert!(matches!(
            partition(keyed_rows(&["a", ""]), &rule),
            Err(EngineError::Partition(_))
        ));
    }

    #[test]
    fn test_blank_key_unassigned_policy() {
        let rule = GroupingRule::ByKey {
            column: "Account".into(),
            on_missing_key: MissingKeyPolicy::GroupAsUnassigned,
        };
        let units = partition(keyed_rows(&["a", "", "b", ""]), &rule).unwrap();
        assert_eq!(units.len(), 3);
        let last = units.last().unwrap();
        assert_eq!(last.key(), UNASSIGNED_KEY);
        assert_eq!(last.len(), 2);
    }

    #[test]
    fn test_boundary_start_only() {
        let mk = |i: usize, marker: &str| {
            row(
                i,
                vec![
                    ("Type", CellValue::String(marker.to_string())),
                    ("Name", CellValue::String(format!("r{i}"))),
                ],
            )
        };
        let rows = vec![mk(1, "header"), mk(2, "line"), mk(3, "header"), mk(4, "line")];
        let rule = GroupingRule::Boundary {
            start: RowMatcher::equals("Type", "header"),
            end: None,
        };
        let units = partition(rows, &rule).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].len(), 2);
        assert_eq!(units[1].len(), 2);
    }

    #[test]
    fn test_boundary_unclosed_unit_errors() {
        let rows = vec![
            row(1, vec![("Type", CellValue::String("start".into()))]),
            row(2, vec![("Type", CellValue::String("line".into()))]),
        ];
        let rule = GroupingRule::Boundary {
            start: RowMatcher::equals("Type", "start"),
            end: Some(RowMatcher::equals("Type", "end")),
        };
        assert!(matches!(
            partition(rows, &rule),
            Err(EngineError::Partition(_))
        ));
    }

    #[test]
    fn test_boundary_start_end_closed() {
        let rows = vec![
            row(1, vec![("Type", CellValue::String("start".into()))]),
            row(2, vec![("Type", CellValue::String("line".into()))]),
            row(3, vec![("Type", CellValue::String("end".into()))]),
        ];
        let rule = GroupingRule::Boundary {
            start: RowMatcher::equals("Type", "start"),
            end: Some(RowMatcher::equals("Type", "end")),
        };
        let units = partition(rows, &rule).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].len(), 3);
    }

    #[test]
    fn test_boundary_row_before_first_marker_errors() {
        let rows = vec![
            row(1, vec![("Type", CellValue::String("line".into()))]),
            row(2, vec![("Type", CellValue::String("start".into()))]),
        ];
        let rule = GroupingRule::Boundary {
            start: RowMatcher::equals("Type", "start"),
            end: None,
        };
        assert!(matches!(
            partition(rows, &rule),
            Err(EngineError::Partition(_))
        ));
    }

    #[test]
    fn test_grouping_rule_deserializes() {
        let json = r#"{"by_key": {"column": "Account", "on_missing_key": "group_as_unassigned"}}"#;
        let rule: GroupingRule = serde_json::from_str(json).unwrap();
        assert!(matches!(
            rule,
            GroupingRule::ByKey {
                on_missing_key: MissingKeyPolicy::GroupAsUnassigned,
                ..
            }
        ));
    }

    #[test]
    fn test_predicate_serde() {
        let matcher = RowMatcher::new("Type", Predicate::Contains("total".into()));
        let json = serde_json::to_string(&matcher).unwrap();
        let back: RowMatcher = serde_json::from_str(&json).unwrap();
        assert_eq!(back.column, "Type");
    }
}
