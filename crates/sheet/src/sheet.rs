use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use std::collections::HashMap;

/// A sheet representing a 2D grid of cells (row-major storage)
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    data: Vec<Vec<CellValue>>,
    column_names: Option<Vec<String>>,
    column_index: Option<HashMap<String, usize>>,
}

impl Sheet {
    /// Create a new empty sheet
    #[must_use]
    pub fn new() -> Self {
        Self::with_name("Sheet1")
    }

    /// Create a new empty sheet with a name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Sheet {
            name: name.to_string(),
            data: Vec::new(),
            column_names: None,
            column_index: None,
        }
    }

    /// Create a sheet from a 2D vector of values
    #[must_use]
    pub fn from_data<T: Into<CellValue> + Clone>(data: Vec<Vec<T>>) -> Self {
        let converted: Vec<Vec<CellValue>> = data
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        Sheet {
            name: "Sheet1".to_string(),
            data: converted,
            column_names: None,
            column_index: None,
        }
    }

    /// Get the sheet name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Get the number of rows
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.data.len()
    }

    /// Get the number of columns
    #[must_use]
    pub fn col_count(&self) -> usize {
        self.data.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Check if the sheet is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a cell value by row and column index
    pub fn get(&self, row: usize, col: usize) -> Result<&CellValue> {
        self.data
            .get(row)
            .and_then(|r| r.get(col))
            .ok_or(SheetError::IndexOutOfBounds {
                row,
                col,
                rows: self.row_count(),
                cols: self.col_count(),
            })
    }

    /// Set a cell value, growing the grid as needed
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if self.data.len() <= row {
            self.data.resize_with(row + 1, Vec::new);
        }
        let r = &mut self.data[row];
        if r.len() <= col {
            r.resize(col + 1, CellValue::Null);
        }
        r[col] = value;
    }

    /// Get a row by index
    pub fn row(&self, index: usize) -> Result<&[CellValue]> {
        self.data
            .get(index)
            .map(Vec::as_slice)
            .ok_or(SheetError::RowIndexOutOfBounds {
                index,
                count: self.row_count(),
            })
    }

    /// Iterate over the rows of the sheet
    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.data.iter().map(Vec::as_slice)
    }

    /// Append a row at the bottom of the sheet
    pub fn row_append<T: Into<CellValue>>(&mut self, row: Vec<T>) -> Result<()> {
        let converted: Vec<CellValue> = row.into_iter().map(Into::into).collect();
        if !self.data.is_empty() && converted.len() != self.col_count() {
            return Err(SheetError::LengthMismatch {
                expected: self.col_count(),
                actual: converted.len(),
            });
        }
        self.data.push(converted);
        Ok(())
    }

    /// Use the values of a row as column names. Typically the header row.
    pub fn name_columns_by_row(&mut self, row: usize) -> Result<()> {
        let header = self.row(row)?;
        let names: Vec<String> = header.iter().map(|c| c.as_str()).collect();

        let mut index = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SheetError::DuplicateColumnName { name: name.clone() });
            }
        }

        self.column_names = Some(names);
        self.column_index = Some(index);
        Ok(())
    }

    /// Get the column names, if set
    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        self.column_names.as_deref()
    }

    /// Look up a column index by name
    pub fn column_index_by_name(&self, name: &str) -> Result<usize> {
        let index = self
            .column_index
            .as_ref()
            .ok_or_else(|| SheetError::ColumnsNotNamed(name.to_string()))?;
        index
            .get(name)
            .copied()
            .ok_or_else(|| SheetError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    /// Get a column's values by name (including the header row)
    pub fn column_by_name(&self, name: &str) -> Result<Vec<CellValue>> {
        let col = self.column_index_by_name(name)?;
        Ok(self
            .data
            .iter()
            .map(|row| row.get(col).cloned().unwrap_or(CellValue::Null))
            .collect())
    }

    /// Access the raw data grid
    #[must_use]
    pub fn data(&self) -> &Vec<Vec<CellValue>> {
        &self.data
    }

    /// Mutable access to the raw data grid
    pub fn data_mut(&mut self) -> &mut Vec<Vec<CellValue>> {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data() {
        let sheet = Sheet::from_data(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        assert_eq!(sheet.row_count(), 2);
        assert_eq!(sheet.col_count(), 3);
        assert_eq!(sheet.get(1, 2).unwrap(), &CellValue::Int(6));
    }

    #[test]
    fn test_set_grows_grid() {
        let mut sheet = Sheet::new();
        sheet.set(2, 1, CellValue::Int(7));
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.get(2, 1).unwrap(), &CellValue::Int(7));
        assert!(sheet.get(0, 0).is_err()); // row 0 exists but has no cells
    }

    #[test]
    fn test_row_append_mismatch() {
        let mut sheet = Sheet::from_data(vec![vec![1, 2, 3]]);
        let result = sheet.row_append(vec![1, 2]);
        assert!(matches!(result, Err(SheetError::LengthMismatch { .. })));
    }

    #[test]
    fn test_named_columns() {
        let mut sheet = Sheet::from_data(vec![
            vec!["Name", "Amount"],
            vec!["a", "10"],
            vec!["b", "20"],
        ]);
        sheet.name_columns_by_row(0).unwrap();

        assert_eq!(sheet.column_index_by_name("Amount").unwrap(), 1);
        let col = sheet.column_by_name("Amount").unwrap();
        assert_eq!(col.len(), 3);
        assert!(matches!(
            sheet.column_by_name("Missing"),
            Err(SheetError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_column_names() {
        let mut sheet = Sheet::from_data(vec![vec!["A", "A"]]);
        assert!(matches!(
            sheet.name_columns_by_row(0),
            Err(SheetError::DuplicateColumnName { .. })
        ));
    }

    #[test]
    fn test_unnamed_column_lookup() {
        let sheet = Sheet::from_data(vec![vec![1, 2]]);
        assert!(matches!(
            sheet.column_index_by_name("A"),
            Err(SheetError::ColumnsNotNamed(_))
        ));
    }
}
