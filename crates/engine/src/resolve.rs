use serde::{Deserialize, Serialize};

/// What kind of element was found missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    /// A blank or non-numeric cell where a calculation input was expected.
    Value,
    /// A blank qualifier cell on a required (must-have) qualifier.
    Qualifier,
    /// A lookup qualifier matched but its value column was unresolvable.
    Lookup,
}

/// A missing-data flag raised during qualifier evaluation or value
/// gathering. Flags are always surfaced to the resolver, never dropped.
#[derive(Debug, Clone)]
pub struct MissingDataFlag {
    /// Unit the flag belongs to.
    pub unit: String,
    /// Source sheet row index.
    pub row: usize,
    /// The missing column or qualifier name.
    pub element: String,
    pub kind: MissingKind,
}

impl MissingDataFlag {
    #[must_use]
    pub fn new(unit: &str, row: usize, element: &str, kind: MissingKind) -> Self {
        MissingDataFlag {
            unit: unit.to_string(),
            row,
            element: element.to_string(),
            kind,
        }
    }
}

/// Configured rule for filling in a missing element. `Fail` is the
/// default when nothing is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssumptionPolicy {
    /// The missing element makes the result unresolved.
    #[default]
    Fail,
    /// Treat the missing value as zero (annotated).
    AssumeZero,
    /// Treat the missing value as the given constant (annotated).
    AssumeValue(f64),
    /// Reuse the previous unit's resolved value for the same column
    /// (annotated); with no previous value this falls back to `Fail`.
    CarryForward,
}

/// Outcome of resolving one missing-data flag. Every resolution carries
/// the note that will be recorded as an annotation; assumptions are
/// never applied silently.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Value { value: f64, note: String },
    Unresolved { note: String },
}

/// Apply an assumption policy to a missing-data flag.
///
/// `previous` is the previous unit's resolved value for the same output
/// column, consulted only by `CarryForward`.
#[must_use]
pub fn resolve(
    flag: &MissingDataFlag,
    policy: AssumptionPolicy,
    previous: Option<f64>,
) -> Resolution {
    let at = format!("'{}' at row {}", flag.element, flag.row);
    match policy {
        AssumptionPolicy::Fail => Resolution::Unresolved {
            note: format!("missing {at} (policy: fail)"),
        },
        AssumptionPolicy::AssumeZero => Resolution::Value {
            value: 0.0,
            note: format!("assumed 0 for missing {at}"),
        },
        AssumptionPolicy::AssumeValue(v) => Resolution::Value {
            value: v,
            note: format!("assumed {v} for missing {at}"),
        },
        AssumptionPolicy::CarryForward => match previous {
            Some(v) => Resolution::Value {
                value: v,
                note: format!("carried forward {v} from previous unit for missing {at}"),
            },
            None => Resolution::Unresolved {
                note: format!("missing {at} (carry-forward with no previous unit)"),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> MissingDataFlag {
        MissingDataFlag::new("4000", 5, "Debit", MissingKind::Value)
    }

    #[test]
    fn test_fail_is_default() {
        assert_eq!(AssumptionPolicy::default(), AssumptionPolicy::Fail);
        let r = resolve(&flag(), AssumptionPolicy::Fail, None);
        assert!(matches!(r, Resolution::Unresolved { .. }));
    }

    #[test]
    fn test_assume_zero_annotates() {
        let r = resolve(&flag(), AssumptionPolicy::AssumeZero, None);
        match r {
            Resolution::Value { value, note } => {
                assert_eq!(value, 0.0);
                assert!(note.contains("assumed 0"));
                assert!(note.contains("Debit"));
                assert!(note.contains("row 5"));
            }
            Resolution::Unresolved { .. } => panic!("expected a value"),
        }
    }

    #[test]
    fn test_assume_value() {
        let r = resolve(&flag(), AssumptionPolicy::AssumeValue(1.5), None);
        assert!(matches!(r, Resolution::Value { value, .. } if value == 1.5));
    }

    #[test]
    fn test_carry_forward() {
        let r = resolve(&flag(), AssumptionPolicy::CarryForward, Some(42.0));
        assert!(matches!(r, Resolution::Value { value, .. } if value == 42.0));

        let none = resolve(&flag(), AssumptionPolicy::CarryForward, None);
        assert!(matches!(none, Resolution::Unresolved { .. }));
    }

    #[test]
    fn test_policy_serde() {
        let p: AssumptionPolicy = serde_json::from_str(r#""assume_zero""#).unwrap();
        assert_eq!(p, AssumptionPolicy::AssumeZero);
        let p: AssumptionPolicy = serde_json::from_str(r#"{"assume_value": 2.5}"#).unwrap();
        assert_eq!(p, AssumptionPolicy::AssumeValue(2.5));
    }
}
