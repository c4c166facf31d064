//! Sheet/Book module for tallysheet
//!
//! Provides the in-memory tabular model the calculation engine consumes and
//! produces: a typed cell grid with named columns, a workbook of named
//! sheets, and xlsx read/write wrappers.
//!
//! # Examples
//!
//! ## Creating a sheet from data
//!
//! ```
//! use tallysheet_sheet::{Sheet, CellValue};
//!
//! let sheet = Sheet::from_data(vec![
//!     vec!["Account", "Debit", "Credit"],
//!     vec!["1000", "50", "0"],
//!     vec!["2000", "0", "50"],
//! ]);
//!
//! assert_eq!(sheet.row_count(), 3);
//! assert_eq!(sheet.col_count(), 3);
//! ```
//!
//! ## Named column access
//!
//! ```
//! use tallysheet_sheet::Sheet;
//!
//! let mut sheet = Sheet::from_data(vec![
//!     vec!["Account", "Amount"],
//!     vec!["1000", "30"],
//! ]);
//!
//! sheet.name_columns_by_row(0).unwrap();
//! assert_eq!(sheet.column_index_by_name("Amount").unwrap(), 1);
//! ```
//!
//! ## Working with books
//!
//! ```
//! use tallysheet_sheet::{Book, Sheet};
//!
//! let mut book = Book::new();
//! book.add_sheet("Ledger", Sheet::new()).unwrap();
//! book.replace_or_insert("Results", Sheet::new());
//!
//! assert_eq!(book.sheet_count(), 2);
//! ```
//!
//! Blank cells are a distinct `CellValue::Null` variant, never zero: the
//! engine only turns a blank into a number through an explicit, recorded
//! assumption.

mod book;
mod cell;
mod error;
mod sheet;
#[cfg(not(target_arch = "wasm32"))]
mod xlsx;

/// Re-export book type.
pub use book::Book;
/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export sheet error types.
pub use error::{Result, SheetError};
/// Re-export sheet type.
pub use sheet::Sheet;
#[cfg(not(target_arch = "wasm32"))]
/// Re-export XLSX read options (non-WASM only).
pub use xlsx::XlsxReadOptions;
