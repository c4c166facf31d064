//! # tallysheet-engine
//!
//! The calculation core of tallysheet: partitions a sheet's data rows
//! into iteration units, gates each unit's rows through qualifiers,
//! accumulates per-column values through a pluggable operation registry,
//! resolves missing data through explicit assumption policies, and
//! sanity-checks the computed results.
//!
//! The engine is synchronous and owns no I/O: it consumes a
//! [`tallysheet_sheet::Sheet`] with named columns and produces a
//! [`RunReport`] the caller renders back into a sheet. Units are
//! independent (each owns its accumulators and results), so a caller may
//! abandon a run between units without corrupting anything; results
//! collect sequentially because carry-forward policies read the previous
//! unit's values.
//!
//! ```
//! use tallysheet_engine::{CalcEntry, GroupingRule, Processor, RunConfig};
//! use tallysheet_sheet::Sheet;
//!
//! let mut sheet = Sheet::from_data(vec![
//!     vec!["Account", "Amount"],
//!     vec!["1000", "10"],
//!     vec!["1000", "5"],
//! ]);
//! sheet.name_columns_by_row(0).unwrap();
//!
//! let config: RunConfig = serde_json::from_str(r#"{
//!     "grouping": {"by_key": {"column": "Account"}},
//!     "calculations": {"Amount": "sum"}
//! }"#).unwrap();
//!
//! let report = Processor::new().run(&sheet, &config).unwrap();
//! assert_eq!(report.units[0].results["Amount"].value(), Some(15.0));
//! ```

/// Calculation engine: operation registry and per-column computation.
pub mod calc;
/// Run configuration types.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Row predicates shared by grouping rules and qualifiers.
pub mod matcher;
/// Qualifier evaluation.
pub mod qualifier;
/// Missing-data flags and assumption policies.
pub mod resolve;
/// Result states and annotations.
pub mod result;
/// Source row model.
pub mod row;
/// Run orchestration and reporting.
pub mod run;
/// Unit partitioning.
pub mod unit;
/// Sanity rules.
pub mod validate;

pub use calc::{Accumulator, OpInput, OpOutcome, OpRegistry, Operation, SignedValue};
pub use config::{CalcEntry, DerivedEntry, RunConfig};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use matcher::{MatchResult, Predicate, RowMatcher};
pub use qualifier::{
    evaluate, Qualifier, QualifierKind, QualifierOutcome, ResolvedLookup, RowStatus,
};
pub use resolve::{resolve, AssumptionPolicy, MissingDataFlag, MissingKind, Resolution};
pub use result::{Annotation, CalcResult, ResultState};
pub use row::{rows_from_sheet, Row};
pub use run::{Processor, RunReport, RunSummary, UnitResults};
pub use unit::{partition, GroupingRule, MissingKeyPolicy, Unit, UNASSIGNED_KEY};
pub use validate::{SanityCheck, SanityRule};
