use crate::book::Book;
use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Options for reading Excel files
#[derive(Debug, Clone, Default)]
pub struct XlsxReadOptions {
    /// Whether the first row contains headers
    pub has_headers: bool,
}

impl XlsxReadOptions {
    /// Set whether the first row contains headers
    #[must_use]
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

fn workbook_err(e: impl std::fmt::Display) -> SheetError {
    SheetError::Workbook(e.to_string())
}

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        // Excel stores dates as serial days since 1899-12-30
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(format!("{e:?}")),
    }
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<()> {
    match cell {
        CellValue::Null => {} // Leave empty
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b).map_err(workbook_err)?;
        }
        CellValue::Int(i) => {
            // Excel stores all numbers as f64, so integers > 2^53 may lose precision
            worksheet
                .write_number(row, col, *i as f64)
                .map_err(workbook_err)?;
        }
        CellValue::Float(f) => {
            worksheet.write_number(row, col, *f).map_err(workbook_err)?;
        }
        CellValue::String(s) => {
            worksheet.write_string(row, col, s).map_err(workbook_err)?;
        }
        CellValue::Error(e) => {
            // Error markers round-trip as their display text
            worksheet
                .write_string(row, col, format!("#ERROR: {e}"))
                .map_err(workbook_err)?;
        }
    }
    Ok(())
}

fn range_to_sheet(
    range: &calamine::Range<Data>,
    name: &str,
    options: &XlsxReadOptions,
) -> Result<Sheet> {
    let data: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(data_to_cell_value).collect())
        .collect();

    let mut sheet = Sheet::with_name(name);
    *sheet.data_mut() = data;

    if options.has_headers && sheet.row_count() > 0 {
        sheet.name_columns_by_row(0)?;
    }

    Ok(sheet)
}

impl Sheet {
    /// Load a specific sheet from an Excel file by name
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened, sheet not found, or read fails.
    pub fn from_xlsx_sheet<P: AsRef<Path>>(path: P, sheet_name: &str) -> Result<Self> {
        Self::from_xlsx_sheet_with_options(path, sheet_name, XlsxReadOptions::default())
    }

    /// Load a specific sheet from an Excel file with options
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened, sheet not found, or read fails.
    pub fn from_xlsx_sheet_with_options<P: AsRef<Path>>(
        path: P,
        sheet_name: &str,
        options: XlsxReadOptions,
    ) -> Result<Self> {
        let mut workbook: Xlsx<BufReader<File>> =
            open_workbook(path.as_ref()).map_err(workbook_err)?;

        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(workbook_err)?;

        range_to_sheet(&range, sheet_name, &options)
    }

    /// Save the sheet to an Excel file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or written.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(self.name()).map_err(workbook_err)?;

        for (row_idx, row) in self.data().iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                write_cell(worksheet, row_idx as u32, col_idx as u16, cell)?;
            }
        }

        workbook.save(path.as_ref()).map_err(workbook_err)?;
        Ok(())
    }
}

impl Book {
    /// Load a book from an Excel file (all sheets)
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened or read.
    pub fn from_xlsx<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_xlsx_with_options(path, XlsxReadOptions::default())
    }

    /// Load a book from an Excel file with options
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened or read.
    pub fn from_xlsx_with_options<P: AsRef<Path>>(path: P, options: XlsxReadOptions) -> Result<Self> {
        let mut workbook: Xlsx<BufReader<File>> =
            open_workbook(path.as_ref()).map_err(workbook_err)?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        let mut book = Book::new();

        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(workbook_err)?;
            let sheet = range_to_sheet(&range, &sheet_name, &options)?;
            book.add_sheet(&sheet_name, sheet)?;
        }

        Ok(book)
    }

    /// Save the book to an Excel file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or written.
    pub fn save_as_xlsx<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut workbook = Workbook::new();

        for (name, sheet) in self.sheets() {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name).map_err(workbook_err)?;

            for (row_idx, row) in sheet.data().iter().enumerate() {
                for (col_idx, cell) in row.iter().enumerate() {
                    write_cell(worksheet, row_idx as u32, col_idx as u16, cell)?;
                }
            }
        }

        workbook.save(path.as_ref()).map_err(workbook_err)?;
        Ok(())
    }

    /// Get sheet names from an Excel file without loading data
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be opened.
    pub fn xlsx_sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let workbook: Xlsx<BufReader<File>> =
            open_workbook(path.as_ref()).map_err(workbook_err)?;
        Ok(workbook.sheet_names().to_vec())
    }
}
