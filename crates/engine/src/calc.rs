use crate::config::{CalcEntry, DerivedEntry};
use crate::error::{EngineError, EngineResult};
use crate::matcher::MatchResult;
use crate::qualifier::{Qualifier, QualifierOutcome, ResolvedLookup};
use crate::resolve::{resolve, MissingDataFlag, MissingKind, Resolution};
use crate::result::CalcResult;
use crate::unit::Unit;
use indexmap::IndexMap;
use std::sync::Arc;

/// A value gathered for accumulation, with its contribution sign.
#[derive(Debug, Clone, Copy)]
pub struct SignedValue {
    pub value: f64,
    pub negate: bool,
}

impl SignedValue {
    /// The signed contribution.
    #[must_use]
    pub fn signed(&self) -> f64 {
        if self.negate {
            -self.value
        } else {
            self.value
        }
    }
}

/// Input handed to an operation: the qualifying values of the target
/// column in row order, and the lookups resolved for the same rows
/// (parallel slices).
#[derive(Debug)]
pub struct OpInput<'a> {
    pub values: &'a [SignedValue],
    pub lookups: &'a [Option<ResolvedLookup>],
}

/// What an operation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum OpOutcome {
    Value(f64),
    Unresolved(String),
}

/// A pure operation over a unit's qualifying values.
pub type Operation = Arc<dyn Fn(&OpInput) -> OpOutcome + Send + Sync>;

/// Per-unit running accumulation state. Owned by one unit's evaluation,
/// never shared, discarded once the final value is taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    /// Fold in one signed value. Accumulation is strictly left-to-right
    /// in row order; reproducibility over precision.
    pub fn add(&mut self, v: SignedValue) {
        self.sum += v.signed();
        self.count += 1;
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

/// Registry mapping operation identifiers to pure functions. New
/// operations register under new identifiers without touching the engine
/// loop.
#[derive(Clone)]
pub struct OpRegistry {
    ops: IndexMap<String, Operation>,
}

impl OpRegistry {
    /// Registry with the standard operations: `sum`, `average`, `count`.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = OpRegistry {
            ops: IndexMap::new(),
        };

        registry.ops.insert(
            "sum".to_string(),
            Arc::new(|input: &OpInput| {
                let mut acc = Accumulator::default();
                for v in input.values {
                    acc.add(*v);
                }
                OpOutcome::Value(acc.sum())
            }) as Operation,
        );

        registry.ops.insert(
            "average".to_string(),
            Arc::new(|input: &OpInput| {
                let mut acc = Accumulator::default();
                for v in input.values {
                    acc.add(*v);
                }
                if acc.count() == 0 {
                    OpOutcome::Unresolved("no qualifying rows to average".to_string())
                } else {
                    OpOutcome::Value(acc.sum() / acc.count() as f64)
                }
            }) as Operation,
        );

        registry.ops.insert(
            "count".to_string(),
            Arc::new(|input: &OpInput| OpOutcome::Value(input.values.len() as f64)) as Operation,
        );

        registry
    }

    /// Register a custom operation under a new identifier.
    ///
    /// # Errors
    ///
    /// `Configuration` if the identifier is already taken.
    pub fn register(&mut self, name: &str, op: Operation) -> EngineResult<()> {
        if self.ops.contains_key(name) {
            return Err(EngineError::Configuration(format!(
                "operation '{name}' is already registered"
            )));
        }
        self.ops.insert(name.to_string(), op);
        Ok(())
    }

    /// Check whether an identifier is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&Operation> {
        self.ops.get(name)
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Compute one output column for one unit.
///
/// `previous` is the previous unit's resolved value for the same column,
/// consulted by carry-forward policies.
///
/// # Errors
///
/// `MissingData` when a required element stays missing under a `fail`
/// policy; `Configuration` if the operation identifier is unregistered
/// (normally caught by the up-front config validation).
pub(crate) fn compute_column(
    unit: &Unit,
    outcome: &QualifierOutcome,
    qualifiers: &[Qualifier],
    column: &str,
    entry: &CalcEntry,
    registry: &OpRegistry,
    default_policy: crate::resolve::AssumptionPolicy,
    previous: Option<f64>,
) -> EngineResult<CalcResult> {
    let op = registry.get(&entry.op).ok_or_else(|| {
        EngineError::Configuration(format!("unknown operation identifier '{}'", entry.op))
    })?;

    let mut notes: Vec<String> = Vec::new();

    // Qualifier and lookup flags raised during evaluation come first:
    // a required qualifier missing under `fail` sinks the whole column.
    for flag in &outcome.flags {
        match flag.kind {
            MissingKind::Qualifier => {
                let policy = qualifiers
                    .iter()
                    .find(|q| q.name == flag.element)
                    .and_then(|q| q.policy)
                    .unwrap_or(default_policy);
                match resolve(flag, policy, previous) {
                    // For a qualifier the assumption keeps the row excluded;
                    // only the annotation is retained.
                    Resolution::Value { note, .. } => notes.push(note),
                    Resolution::Unresolved { note } => {
                        return Err(EngineError::MissingData(note));
                    }
                }
            }
            MissingKind::Lookup => {
                notes.push(format!(
                    "lookup '{}' unresolved at row {}",
                    flag.element, flag.row
                ));
            }
            MissingKind::Value => {}
        }
    }

    // Gather the qualifying values in row order
    let source = entry.source.as_deref().unwrap_or(column);
    let mut values: Vec<SignedValue> = Vec::new();
    let mut lookups: Vec<Option<ResolvedLookup>> = Vec::new();

    for idx in outcome.included_indices() {
        let row = &unit.rows()[idx];
        let negate = entry
            .subtract_when
            .as_ref()
            .is_some_and(|m| m.matches(row) == MatchResult::Matched);

        let value = match row.number(source) {
            Some(v) => v,
            None => {
                let flag =
                    MissingDataFlag::new(unit.key(), row.index(), source, MissingKind::Value);
                let policy = entry.policy.unwrap_or(default_policy);
                match resolve(&flag, policy, previous) {
                    Resolution::Value { value, note } => {
                        notes.push(note);
                        value
                    }
                    Resolution::Unresolved { note } => {
                        return Err(EngineError::MissingData(note));
                    }
                }
            }
        };

        values.push(SignedValue { value, negate });
        lookups.push(outcome.lookups[idx].clone());
    }

    let input = OpInput {
        values: &values,
        lookups: &lookups,
    };

    let mut result = match op(&input) {
        OpOutcome::Value(v) => CalcResult::resolved(column, v),
        OpOutcome::Unresolved(reason) => CalcResult::unresolved(column, reason),
    };
    for note in notes {
        result.push_note(note);
    }
    Ok(result)
}

/// Compute a derived (combining) entry over the unit's per-column
/// results: sum of `add` inputs minus sum of `subtract` inputs. Inputs
/// may reference earlier derived entries. Fails closed to unresolved when
/// any input is unresolved, unless an override default is configured.
pub(crate) fn compute_derived(
    entry: &DerivedEntry,
    results: &IndexMap<String, CalcResult>,
) -> CalcResult {
    let mut total = 0.0;
    let mut result = CalcResult::resolved(&entry.name, 0.0);

    for (name, sign) in entry
        .add
        .iter()
        .map(|n| (n, 1.0))
        .chain(entry.subtract.iter().map(|n| (n, -1.0)))
    {
        let input = match results.get(name) {
            Some(r) => r,
            None => {
                return CalcResult::unresolved(
                    &entry.name,
                    format!("derived input '{name}' has no result"),
                );
            }
        };
        match input.value() {
            Some(v) => total += sign * v,
            None => match entry.on_unresolved {
                Some(default) => {
                    total += sign * default;
                    result.push_note(format!(
                        "used override default {default} for unresolved input '{name}'"
                    ));
                }
                None => {
                    return CalcResult::unresolved(
                        &entry.name,
                        format!("input '{name}' is unresolved"),
                    );
                }
            },
        }
    }

    result.state = crate::result::ResultState::Resolved(total);
    result
}
