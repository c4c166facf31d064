use crate::result::CalcResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A post-computation bound or consistency check on one output column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanityRule {
    /// Output column (calculated or derived) the rule applies to.
    pub column: String,
    pub check: SanityCheck,
    /// Hard rules downgrade the result to unresolved instead of flagging.
    #[serde(default)]
    pub hard: bool,
}

/// The checks a sanity rule can express.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanityCheck {
    /// Value must be >= 0.
    NonNegative,
    /// Value must lie within the inclusive bounds.
    Range { min: f64, max: f64 },
    /// |value| must not exceed `factor` times |reference column's value|
    /// in the same unit.
    MaxMagnitudeOf { reference: String, factor: f64 },
    /// Value must equal the other column's value within the tolerance
    /// (the debits-equal-credits consistency check).
    Balanced { against: String, tolerance: f64 },
}

/// Outcome counts of a validation pass over one unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationOutcome {
    /// Soft-rule violations (results flagged, values retained).
    pub flagged: usize,
    /// Hard-rule violations (results downgraded to unresolved).
    pub hard_failures: usize,
}

/// Apply the ordered sanity rules to a unit's results in place.
///
/// A failing soft rule downgrades the result to flagged, retaining the
/// value; a failing hard rule downgrades it to unresolved with a reason.
/// Rules over unresolved results (or unresolved references) are skipped;
/// those results already carry their reason.
pub(crate) fn apply_rules(
    results: &mut IndexMap<String, CalcResult>,
    rules: &[SanityRule],
) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for rule in rules {
        let Some(value) = results.get(&rule.column).and_then(CalcResult::value) else {
            continue;
        };

        let violation = match &rule.check {
            SanityCheck::NonNegative => {
                (value < 0.0).then(|| format!("value {value} is negative"))
            }
            SanityCheck::Range { min, max } => (value < *min || value > *max)
                .then(|| format!("value {value} outside [{min}, {max}]")),
            SanityCheck::MaxMagnitudeOf { reference, factor } => {
                match results.get(reference).and_then(CalcResult::value) {
                    Some(reference_value) => (value.abs() > factor * reference_value.abs())
                        .then(|| {
                            format!(
                                "|{value}| exceeds {factor}x the magnitude of '{reference}' \
                                 ({reference_value})"
                            )
                        }),
                    None => continue,
                }
            }
            SanityCheck::Balanced { against, tolerance } => {
                match results.get(against).and_then(CalcResult::value) {
                    Some(other) => ((value - other).abs() > *tolerance)
                        .then(|| format!("value {value} does not balance '{against}' ({other})")),
                    None => continue,
                }
            }
        };

        if let Some(reason) = violation {
            let Some(result) = results.get_mut(&rule.column) else {
                continue;
            };
            if rule.hard {
                result.invalidate(format!("hard rule failed: {reason}"));
                outcome.hard_failures += 1;
            } else {
                result.flag(reason);
                outcome.flagged += 1;
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(pairs: Vec<(&str, f64)>) -> IndexMap<String, CalcResult> {
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), CalcResult::resolved(k, v)))
            .collect()
    }

    #[test]
    fn test_soft_rule_flags_and_retains_value() {
        let mut r = results(vec![("Net", -10.0)]);
        let rules = vec![SanityRule {
            column: "Net".into(),
            check: SanityCheck::NonNegative,
            hard: false,
        }];
        let outcome = apply_rules(&mut r, &rules);
        assert_eq!(outcome.flagged, 1);
        let net = &r["Net"];
        assert!(net.is_flagged());
        assert_eq!(net.value(), Some(-10.0));
    }

    #[test]
    fn test_hard_rule_invalidates() {
        let mut r = results(vec![("Net", -10.0)]);
        let rules = vec![SanityRule {
            column: "Net".into(),
            check: SanityCheck::NonNegative,
            hard: true,
        }];
        let outcome = apply_rules(&mut r, &rules);
        assert_eq!(outcome.hard_failures, 1);
        assert!(r["Net"].is_unresolved());
    }

    #[test]
    fn test_range_rule_passes() {
        let mut r = results(vec![("Total", 50.0)]);
        let rules = vec![SanityRule {
            column: "Total".into(),
            check: SanityCheck::Range {
                min: 0.0,
                max: 100.0,
            },
            hard: false,
        }];
        let outcome = apply_rules(&mut r, &rules);
        assert_eq!(outcome.flagged, 0);
        assert!(r["Total"].is_resolved());
    }

    #[test]
    fn test_magnitude_rule() {
        let mut r = results(vec![("Fee", 500.0), ("Principal", 100.0)]);
        let rules = vec![SanityRule {
            column: "Fee".into(),
            check: SanityCheck::MaxMagnitudeOf {
                reference: "Principal".into(),
                factor: 2.0,
            },
            hard: false,
        }];
        let outcome = apply_rules(&mut r, &rules);
        assert_eq!(outcome.flagged, 1);
    }

    #[test]
    fn test_balanced_rule() {
        let mut r = results(vec![("Debit", 100.0), ("Credit", 100.005)]);
        let rules = vec![SanityRule {
            column: "Debit".into(),
            check: SanityCheck::Balanced {
                against: "Credit".into(),
                tolerance: 0.01,
            },
            hard: false,
        }];
        assert_eq!(apply_rules(&mut r, &rules).flagged, 0);

        let mut r = results(vec![("Debit", 100.0), ("Credit", 90.0)]);
        assert_eq!(apply_rules(&mut r, &rules).flagged, 1);
    }

    #[test]
    fn test_unresolved_results_are_skipped() {
        let mut r: IndexMap<String, CalcResult> = IndexMap::new();
        r.insert("Net".into(), CalcResult::unresolved("Net", "missing"));
        let rules = vec![SanityRule {
            column: "Net".into(),
            check: SanityCheck::NonNegative,
            hard: false,
        }];
        let outcome = apply_rules(&mut r, &rules);
        assert_eq!(outcome.flagged, 0);
        assert!(r["Net"].is_unresolved());
    }
}
