use crate::error::{EngineError, EngineResult};
use indexmap::IndexMap;
use tallysheet_sheet::{CellValue, Sheet};

/// A source row: an ordered mapping from column name to cell value, plus
/// the originating sheet row index. Immutable once built.
#[derive(Debug, Clone)]
pub struct Row {
    index: usize,
    cells: IndexMap<String, CellValue>,
}

impl Row {
    /// Build a row from its sheet index and named cells.
    #[must_use]
    pub fn new(index: usize, cells: IndexMap<String, CellValue>) -> Self {
        Row { index, cells }
    }

    /// The originating sheet row index (0-based, header included).
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get a cell by column name. `None` if the column is absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Get a cell's numeric value. `None` for absent, blank, or
    /// non-numeric cells, never a silent zero.
    #[must_use]
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(CellValue::as_float)
    }

    /// True if the column is absent or blank.
    #[must_use]
    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).map_or(true, CellValue::is_blank)
    }

    /// Iterate over the column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}

/// Build the ordered row sequence from a sheet whose columns were named
/// from its header row. The header row itself is not a data row.
///
/// # Errors
///
/// Returns a `Configuration` error if the sheet has no named columns:
/// supplying a headerless sheet is a caller mistake, not a data problem.
pub fn rows_from_sheet(sheet: &Sheet) -> EngineResult<Vec<Row>> {
    let names = sheet.column_names().ok_or_else(|| {
        EngineError::Configuration(format!(
            "sheet '{}' has no named columns; name them from the header row first",
            sheet.name()
        ))
    })?;
    let names: Vec<String> = names.to_vec();

    let mut rows = Vec::with_capacity(sheet.row_count().saturating_sub(1));
    for (idx, raw) in sheet.rows().enumerate().skip(1) {
        let mut cells = IndexMap::with_capacity(names.len());
        for (col, name) in names.iter().enumerate() {
            let value = raw.get(col).cloned().unwrap_or(CellValue::Null);
            cells.insert(name.clone(), value);
        }
        rows.push(Row::new(idx, cells));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sheet() -> Sheet {
        let mut sheet = Sheet::from_data(vec![
            vec!["Account", "Debit", "Credit"],
            vec!["1000", "50", ""],
            vec!["2000", "", "50"],
        ]);
        sheet.name_columns_by_row(0).unwrap();
        sheet
    }

    #[test]
    fn test_rows_from_sheet() {
        let rows = rows_from_sheet(&sample_sheet()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index(), 1);
        assert_eq!(rows[0].number("Debit"), Some(50.0));
        assert!(rows[0].is_blank("Credit"));
        assert_eq!(rows[1].number("Credit"), Some(50.0));
    }

    #[test]
    fn test_blank_never_zero() {
        let rows = rows_from_sheet(&sample_sheet()).unwrap();
        assert_eq!(rows[1].number("Debit"), None);
    }

    #[test]
    fn test_absent_column() {
        let rows = rows_from_sheet(&sample_sheet()).unwrap();
        assert_eq!(rows[0].get("Nope"), None);
        assert!(rows[0].is_blank("Nope"));
    }

    #[test]
    fn test_unnamed_columns_is_configuration_error() {
        let sheet = Sheet::from_data(vec![vec![1, 2]]);
        assert!(matches!(
            rows_from_sheet(&sheet),
            Err(EngineError::Configuration(_))
        ));
    }
}
