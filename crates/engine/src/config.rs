use crate::calc::OpRegistry;
use crate::error::{EngineError, EngineResult};
use crate::matcher::RowMatcher;
use crate::qualifier::Qualifier;
use crate::resolve::AssumptionPolicy;
use crate::unit::GroupingRule;
use crate::validate::SanityRule;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One calculation: an operation over a source column, with optional
/// qualifier subset, sign matcher, and assumption-policy override.
///
/// Deserializes from either the shorthand `"sum"` or the full form
/// `{"op": "sum", "source": "Debit", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "CalcEntryRepr")]
pub struct CalcEntry {
    pub op: String,
    /// Source column to read; defaults to the output column name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Names of the qualifiers gating this entry; defaults to all
    /// configured qualifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifiers: Option<Vec<String>>,
    /// Policy for missing source values; defaults to the run default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<AssumptionPolicy>,
    /// Rows matching this contribute with a negative sign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtract_when: Option<RowMatcher>,
}

impl CalcEntry {
    /// Shorthand entry: just an operation over the output column.
    #[must_use]
    pub fn op(name: &str) -> Self {
        CalcEntry {
            op: name.to_string(),
            source: None,
            qualifiers: None,
            policy: None,
            subtract_when: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CalcEntryRepr {
    Short(String),
    Full {
        op: String,
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        qualifiers: Option<Vec<String>>,
        #[serde(default)]
        policy: Option<AssumptionPolicy>,
        #[serde(default)]
        subtract_when: Option<RowMatcher>,
    },
}

impl From<CalcEntryRepr> for CalcEntry {
    fn from(repr: CalcEntryRepr) -> Self {
        match repr {
            CalcEntryRepr::Short(op) => CalcEntry::op(&op),
            CalcEntryRepr::Full {
                op,
                source,
                qualifiers,
                policy,
                subtract_when,
            } => CalcEntry {
                op,
                source,
                qualifiers,
                policy,
                subtract_when,
            },
        }
    }
}

/// A combining step computed after all per-column results of a unit:
/// sum of `add` inputs minus sum of `subtract` inputs. Inputs may name
/// calculation columns or earlier derived entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedEntry {
    pub name: String,
    #[serde(default)]
    pub add: Vec<String>,
    #[serde(default)]
    pub subtract: Vec<String>,
    /// Override default for unresolved inputs; without it the derived
    /// value fails closed to unresolved.
    #[serde(default)]
    pub on_unresolved: Option<f64>,
}

/// The caller-supplied run configuration: how rows group into units,
/// which qualifiers gate them, what to calculate, and how to check it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub grouping: GroupingRule,
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
    /// Output column name -> calculation, in output order.
    pub calculations: IndexMap<String, CalcEntry>,
    #[serde(default)]
    pub derived: Vec<DerivedEntry>,
    #[serde(default)]
    pub rules: Vec<SanityRule>,
    /// Assumption policy used when no per-entry override is configured.
    #[serde(default)]
    pub default_policy: AssumptionPolicy,
}

impl RunConfig {
    /// Validate the configuration against the operation registry. Called
    /// before any unit is processed; any failure here aborts the run.
    ///
    /// # Errors
    ///
    /// `Configuration` for an unknown operation identifier, a dangling
    /// qualifier or derived-input reference, a derived name colliding
    /// with a calculation column, or a rule over an unknown column.
    pub fn validate(&self, registry: &OpRegistry) -> EngineResult<()> {
        if self.calculations.is_empty() {
            return Err(EngineError::Configuration(
                "no calculations configured".into(),
            ));
        }

        for (column, entry) in &self.calculations {
            if !registry.contains(&entry.op) {
                return Err(EngineError::Configuration(format!(
                    "unknown operation identifier '{}' for column '{column}'",
                    entry.op
                )));
            }
            if let Some(names) = &entry.qualifiers {
                for name in names {
                    if !self.qualifiers.iter().any(|q| &q.name == name) {
                        return Err(EngineError::Configuration(format!(
                            "column '{column}' references unknown qualifier '{name}'"
                        )));
                    }
                }
            }
        }

        let mut known: Vec<&str> = self.calculations.keys().map(String::as_str).collect();
        for entry in &self.derived {
            if known.contains(&entry.name.as_str()) {
                return Err(EngineError::Configuration(format!(
                    "derived entry '{}' collides with an existing output column",
                    entry.name
                )));
            }
            for input in entry.add.iter().chain(&entry.subtract) {
                if !known.contains(&input.as_str()) {
                    return Err(EngineError::Configuration(format!(
                        "derived entry '{}' references unknown input '{input}'",
                        entry.name
                    )));
                }
            }
            known.push(entry.name.as_str());
        }

        for rule in &self.rules {
            if !known.contains(&rule.column.as_str()) {
                return Err(EngineError::Configuration(format!(
                    "sanity rule targets unknown column '{}'",
                    rule.column
                )));
            }
        }

        Ok(())
    }

    /// The qualifiers gating one calculation entry, honoring its subset.
    pub(crate) fn qualifiers_for(&self, entry: &CalcEntry) -> Vec<Qualifier> {
        match &entry.qualifiers {
            None => self.qualifiers.clone(),
            Some(names) => self
                .qualifiers
                .iter()
                .filter(|q| names.contains(&q.name))
                .cloned()
                .collect(),
        }
    }
}
