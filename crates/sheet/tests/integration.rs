use tallysheet_sheet::{Book, CellValue, Sheet, SheetError};
use tempfile::tempdir;

// ===== Grid tests =====

#[test]
fn test_grid_access() {
    let sheet = Sheet::from_data(vec![vec![1, 2, 3], vec![4, 5, 6]]);

    assert_eq!(sheet.get(0, 0).unwrap(), &CellValue::Int(1));
    assert_eq!(sheet.get(1, 2).unwrap(), &CellValue::Int(6));
    assert!(matches!(
        sheet.get(5, 0),
        Err(SheetError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_rows_iteration_order() {
    let sheet = Sheet::from_data(vec![vec![1], vec![2], vec![3]]);
    let firsts: Vec<i64> = sheet
        .rows()
        .map(|r| r[0].as_int().unwrap())
        .collect();
    assert_eq!(firsts, vec![1, 2, 3]);
}

// ===== Header naming =====

#[test]
fn test_header_naming_and_lookup() {
    let mut sheet = Sheet::from_data(vec![
        vec!["Account", "Debit", "Credit"],
        vec!["1000", "75.5", ""],
    ]);
    sheet.name_columns_by_row(0).unwrap();

    let debit_col = sheet.column_by_name("Debit").unwrap();
    assert_eq!(debit_col[1].as_float(), Some(75.5));

    // Blank stays blank, not zero
    let credit_col = sheet.column_by_name("Credit").unwrap();
    assert!(credit_col[1].is_blank());
}

// ===== Workbook round-trip =====

#[test]
fn test_book_roundtrip_with_new_sheet() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wb.xlsx");

    let mut book = Book::new();
    book.add_sheet(
        "Ledger",
        Sheet::from_data(vec![vec!["Account", "Amount"], vec!["1000", "12.25"]]),
    )
    .unwrap();
    book.save_as_xlsx(&path).unwrap();

    // Re-open, attach a results sheet, save again
    let mut book = Book::from_xlsx(&path).unwrap();
    book.replace_or_insert(
        "Results",
        Sheet::from_data(vec![vec!["Unit", "Total"], vec!["1000", "12.25"]]),
    );
    book.save_as_xlsx(&path).unwrap();

    let reloaded = Book::from_xlsx(&path).unwrap();
    assert_eq!(reloaded.sheet_names(), vec!["Ledger", "Results"]);
    let results = reloaded.get_sheet("Results").unwrap();
    assert_eq!(results.get(1, 1).unwrap().as_float(), Some(12.25));
}
