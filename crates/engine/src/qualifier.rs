use crate::error::{EngineError, EngineResult};
use crate::matcher::{MatchResult, RowMatcher};
use crate::resolve::{AssumptionPolicy, MissingDataFlag, MissingKind};
use crate::unit::Unit;
use serde::{Deserialize, Serialize};

/// How a qualifier participates in row selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualifierKind {
    /// Row must match or it is excluded; a blank qualifier cell raises a
    /// missing-data flag unless the qualifier is optional.
    MustHave,
    /// Any match excludes the row outright.
    MustNotHave,
    /// Resolves an auxiliary numeric value without gating inclusion.
    Lookup,
}

/// A named predicate gating row inclusion or resolving a lookup value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qualifier {
    pub name: String,
    pub kind: QualifierKind,
    pub matcher: RowMatcher,
    /// Must-have only: a blank qualifier cell excludes the row without
    /// raising a missing-data flag.
    #[serde(default)]
    pub optional: bool,
    /// Lookup only: the column whose numeric value resolves when the
    /// matcher matches.
    #[serde(default)]
    pub lookup_column: Option<String>,
    /// Policy applied when this qualifier's cell is blank on a must-have
    /// check. Defaults to the run-level default (`Fail`).
    #[serde(default)]
    pub policy: Option<AssumptionPolicy>,
}

impl Qualifier {
    /// Build a must-have qualifier.
    #[must_use]
    pub fn must_have(name: &str, matcher: RowMatcher) -> Self {
        Qualifier {
            name: name.to_string(),
            kind: QualifierKind::MustHave,
            matcher,
            optional: false,
            lookup_column: None,
            policy: None,
        }
    }

    /// Build a must-not-have qualifier.
    #[must_use]
    pub fn must_not_have(name: &str, matcher: RowMatcher) -> Self {
        Qualifier {
            name: name.to_string(),
            kind: QualifierKind::MustNotHave,
            matcher,
            optional: false,
            lookup_column: None,
            policy: None,
        }
    }

    /// Build a lookup qualifier resolving `lookup_column`.
    #[must_use]
    pub fn lookup(name: &str, matcher: RowMatcher, lookup_column: &str) -> Self {
        Qualifier {
            name: name.to_string(),
            kind: QualifierKind::Lookup,
            matcher,
            optional: false,
            lookup_column: Some(lookup_column.to_string()),
            policy: None,
        }
    }
}

/// Per-row inclusion status after qualifier evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Included,
    /// Excluded by a matching must-not-have or a non-matching must-have.
    Excluded { qualifier: String },
    /// Excluded because a required qualifier cell was blank or absent.
    ExcludedMissing { qualifier: String },
}

impl RowStatus {
    #[must_use]
    pub fn is_included(&self) -> bool {
        matches!(self, RowStatus::Included)
    }
}

/// A lookup value resolved for one row, tagged with the qualifier that
/// resolved it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLookup {
    pub qualifier: String,
    pub value: f64,
}

/// Result of evaluating a unit's rows against an ordered qualifier set.
///
/// `statuses` and `lookups` are parallel to the unit's rows. Missing-data
/// flags are surfaced here for the resolver, never dropped.
#[derive(Debug, Clone, Default)]
pub struct QualifierOutcome {
    pub statuses: Vec<RowStatus>,
    pub lookups: Vec<Option<ResolvedLookup>>,
    pub flags: Vec<MissingDataFlag>,
}

impl QualifierOutcome {
    /// Indices (into the unit's rows) of the included rows, in order.
    #[must_use]
    pub fn included_indices(&self) -> Vec<usize> {
        self.statuses
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_included())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Evaluate a unit's rows against the qualifiers, in the fixed order:
/// must-not-have, then must-have, then lookups. A row excluded by a
/// must-not-have match is final: it is never re-checked by the must-have
/// pass and never contributes to accumulation. Lookup ties break to the
/// first matching lookup qualifier in configured order.
///
/// # Errors
///
/// `Qualifier` if a lookup qualifier has no lookup column.
pub fn evaluate(unit: &Unit, qualifiers: &[Qualifier]) -> EngineResult<QualifierOutcome> {
    for q in qualifiers {
        if q.kind == QualifierKind::Lookup && q.lookup_column.is_none() {
            return Err(EngineError::Qualifier(format!(
                "lookup qualifier '{}' has no lookup column",
                q.name
            )));
        }
    }

    let mut outcome = QualifierOutcome::default();

    for row in unit.rows() {
        let mut status = RowStatus::Included;

        // Must-not-have first: any match excludes outright
        for q in qualifiers.iter().filter(|q| q.kind == QualifierKind::MustNotHave) {
            if q.matcher.matches(row) == MatchResult::Matched {
                status = RowStatus::Excluded {
                    qualifier: q.name.clone(),
                };
                break;
            }
        }

        // Must-have second, skipped entirely for already-excluded rows
        if status.is_included() {
            for q in qualifiers.iter().filter(|q| q.kind == QualifierKind::MustHave) {
                match q.matcher.matches(row) {
                    MatchResult::Matched => {}
                    MatchResult::NotMatched => {
                        status = RowStatus::Excluded {
                            qualifier: q.name.clone(),
                        };
                        break;
                    }
                    MatchResult::MissingCell => {
                        if !q.optional {
                            outcome.flags.push(MissingDataFlag::new(
                                unit.key(),
                                row.index(),
                                &q.name,
                                MissingKind::Qualifier,
                            ));
                        }
                        status = RowStatus::ExcludedMissing {
                            qualifier: q.name.clone(),
                        };
                        break;
                    }
                }
            }
        }

        // Lookups last, only for rows that survived the gates
        let lookup = if status.is_included() {
            resolve_lookup(unit, row, qualifiers, &mut outcome.flags)
        } else {
            None
        };

        outcome.statuses.push(status);
        outcome.lookups.push(lookup);
    }

    Ok(outcome)
}

fn resolve_lookup(
    unit: &Unit,
    row: &crate::row::Row,
    qualifiers: &[Qualifier],
    flags: &mut Vec<MissingDataFlag>,
) -> Option<ResolvedLookup> {
    for q in qualifiers.iter().filter(|q| q.kind == QualifierKind::Lookup) {
        if q.matcher.matches(row) != MatchResult::Matched {
            continue;
        }
        // First matching lookup qualifier wins
        let column = q.lookup_column.as_deref()?;
        return match row.number(column) {
            Some(value) => Some(ResolvedLookup {
                qualifier: q.name.clone(),
                value,
            }),
            None => {
                // Row proceeds; computation treats the lookup as missing
                flags.push(MissingDataFlag::new(
                    unit.key(),
                    row.index(),
                    column,
                    MissingKind::Lookup,
                ));
                None
            }
        };
    }
    None
}
