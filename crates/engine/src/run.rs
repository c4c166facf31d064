use crate::calc::{compute_column, compute_derived, OpRegistry};
use crate::config::RunConfig;
use crate::error::{EngineResult, ErrorKind};
use crate::qualifier::evaluate;
use crate::result::CalcResult;
use crate::row::rows_from_sheet;
use crate::unit::{partition, Unit};
use crate::validate::apply_rules;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use tallysheet_sheet::{CellValue, Sheet};
use tracing::{debug, info, warn};

/// All results for one unit, keyed by output column in output order.
#[derive(Debug, Clone)]
pub struct UnitResults {
    pub unit: String,
    pub results: IndexMap<String, CalcResult>,
}

/// Error and result counts for a completed run, by kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub units_total: usize,
    pub units_clean: usize,
    pub partition_errors: usize,
    pub qualifier_errors: usize,
    pub missing_data_errors: usize,
    pub validation_errors: usize,
    pub flagged_results: usize,
}

impl RunSummary {
    fn record(&mut self, kind: ErrorKind) {
        match kind {
            ErrorKind::Partition => self.partition_errors += 1,
            ErrorKind::Qualifier => self.qualifier_errors += 1,
            ErrorKind::MissingData => self.missing_data_errors += 1,
            ErrorKind::Validation => self.validation_errors += 1,
            // Configuration errors abort before a summary exists
            ErrorKind::Configuration => {}
        }
    }

    /// True if no unit recorded an error or a flag.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.units_clean == self.units_total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units ({} clean); errors: {} partition, {} qualifier, {} missing-data, \
             {} validation; {} flagged results",
            self.units_total,
            self.units_clean,
            self.partition_errors,
            self.qualifier_errors,
            self.missing_data_errors,
            self.validation_errors,
            self.flagged_results
        )
    }
}

/// The complete outcome of one run: every unit's results in unit order,
/// plus the summary. Unresolved and flagged entries are retained, never
/// omitted.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub units: Vec<UnitResults>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Render the report as an output sheet: a `Unit` column, one column
    /// per configured output, and a trailing `Notes` column carrying the
    /// annotations. Unresolved entries render as `#UNRESOLVED: reason`
    /// text so no unit is silently dropped.
    #[must_use]
    pub fn to_sheet(&self, name: &str) -> Sheet {
        let columns: Vec<String> = self
            .units
            .first()
            .map(|u| u.results.keys().cloned().collect())
            .unwrap_or_default();

        let mut sheet = Sheet::with_name(name);

        let mut header: Vec<CellValue> = Vec::with_capacity(columns.len() + 2);
        header.push(CellValue::String("Unit".to_string()));
        header.extend(columns.iter().map(|c| CellValue::String(c.clone())));
        header.push(CellValue::String("Notes".to_string()));
        sheet.data_mut().push(header);

        for unit in &self.units {
            let mut row: Vec<CellValue> = Vec::with_capacity(columns.len() + 2);
            row.push(CellValue::String(unit.unit.clone()));

            let mut notes: Vec<String> = Vec::new();
            for column in &columns {
                match unit.results.get(column) {
                    Some(result) => {
                        match result.value() {
                            Some(v) => row.push(CellValue::Float(v)),
                            None => {
                                let reason = match &result.state {
                                    crate::result::ResultState::Unresolved { reason } => {
                                        reason.clone()
                                    }
                                    _ => String::new(),
                                };
                                row.push(CellValue::String(format!("#UNRESOLVED: {reason}")));
                            }
                        }
                        if let crate::result::ResultState::Flagged { reasons, .. } = &result.state
                        {
                            for reason in reasons {
                                notes.push(format!("{column}: flagged: {reason}"));
                            }
                        }
                        for note in &result.notes {
                            notes.push(format!("{column}: {note}"));
                        }
                    }
                    None => row.push(CellValue::Null),
                }
            }

            if notes.is_empty() {
                row.push(CellValue::Null);
            } else {
                row.push(CellValue::String(notes.join("; ")));
            }
            sheet.data_mut().push(row);
        }

        sheet
    }
}

/// The engine entry point. Holds the operation registry; custom
/// operations register through [`Processor::registry_mut`] before a run.
#[derive(Clone, Default)]
pub struct Processor {
    registry: OpRegistry,
}

impl Processor {
    /// Processor with the standard operations.
    #[must_use]
    pub fn new() -> Self {
        Processor {
            registry: OpRegistry::standard(),
        }
    }

    /// Processor over a caller-built registry.
    #[must_use]
    pub fn with_registry(registry: OpRegistry) -> Self {
        Processor { registry }
    }

    /// Mutable access to the operation registry.
    pub fn registry_mut(&mut self) -> &mut OpRegistry {
        &mut self.registry
    }

    /// Execute a run over a sheet with named columns.
    ///
    /// Unit-local problems downgrade that unit's results and are counted
    /// in the summary; the run continues to the next unit.
    ///
    /// # Errors
    ///
    /// `Configuration` for a malformed run configuration (checked before
    /// any unit is processed) or a headerless sheet; `Partition` when no
    /// units can be formed at all (empty input, unclosed boundary,
    /// blank grouping key under the `error` policy).
    pub fn run(&self, sheet: &Sheet, config: &RunConfig) -> EngineResult<RunReport> {
        config.validate(&self.registry)?;

        let rows = rows_from_sheet(sheet)?;
        let units = partition(rows, &config.grouping)?;
        info!(units = units.len(), sheet = sheet.name(), "partitioned");

        let mut report = RunReport {
            units: Vec::with_capacity(units.len()),
            summary: RunSummary::default(),
        };

        let mut previous: Option<UnitResults> = None;
        for unit in &units {
            let unit_results = self.run_unit(unit, config, previous.as_ref(), &mut report.summary);
            report.summary.units_total += 1;
            let clean = unit_results
                .results
                .values()
                .all(|r| r.is_resolved() && r.notes.is_empty());
            if clean {
                report.summary.units_clean += 1;
            }
            previous = Some(unit_results.clone());
            report.units.push(unit_results);
        }

        info!(summary = %report.summary, "run complete");
        Ok(report)
    }

    fn run_unit(
        &self,
        unit: &Unit,
        config: &RunConfig,
        previous: Option<&UnitResults>,
        summary: &mut RunSummary,
    ) -> UnitResults {
        debug!(unit = unit.key(), rows = unit.len(), "computing unit");
        let mut results: IndexMap<String, CalcResult> = IndexMap::new();

        for (column, entry) in &config.calculations {
            let qualifiers = config.qualifiers_for(entry);
            let previous_value = previous
                .and_then(|p| p.results.get(column))
                .and_then(CalcResult::value);

            let result = evaluate(unit, &qualifiers).and_then(|outcome| {
                compute_column(
                    unit,
                    &outcome,
                    &qualifiers,
                    column,
                    entry,
                    &self.registry,
                    config.default_policy,
                    previous_value,
                )
            });

            let result = match result {
                Ok(result) => result,
                Err(err) => {
                    warn!(unit = unit.key(), column = %column, error = %err, "column downgraded");
                    summary.record(err.kind());
                    let mut r = CalcResult::unresolved(column, err.to_string());
                    r.push_note(err.to_string());
                    r
                }
            };
            results.insert(column.clone(), result);
        }

        for entry in &config.derived {
            let result = compute_derived(entry, &results);
            results.insert(entry.name.clone(), result);
        }

        let validation = apply_rules(&mut results, &config.rules);
        summary.flagged_results += validation.flagged;
        for _ in 0..validation.hard_failures {
            summary.record(ErrorKind::Validation);
        }

        UnitResults {
            unit: unit.key().to_string(),
            results,
        }
    }
}
