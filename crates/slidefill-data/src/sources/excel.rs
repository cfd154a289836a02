//! Excel/XLSX data source using calamine.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use crate::error::{DataError, Result};
use crate::normalize::normalize_cell;
use crate::sources::DataProvider;
use crate::value::{DataSet, DataTable, Value};

/// Excel workbook data source; every worksheet becomes one table
pub struct ExcelSource {
    /// Path to the workbook
    path: PathBuf,
}

impl ExcelSource {
    /// Create a new Excel source from a file path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Lay a sheet out as records indexed from cell A1
    ///
    /// calamine ranges start at the first used cell; leading rows and
    /// columns are restored so row 1 is always the header and column
    /// tokens match the sheet's column letters.
    fn sheet_records(range: &Range<Data>) -> Vec<Vec<Value>> {
        let (Some((start_row, start_col)), Some((_, end_col))) = (range.start(), range.end())
        else {
            return Vec::new();
        };
        let (start_row, start_col) = (start_row as usize, start_col as usize);
        let width = end_col as usize + 1;

        let mut records = vec![vec![Value::Blank; width]; start_row];
        for cells in range.rows() {
            let mut record = vec![Value::Blank; width];
            for (offset, cell) in cells.iter().enumerate() {
                record[start_col + offset] = normalize_cell(cell);
            }
            records.push(record);
        }
        records
    }
}

impl DataProvider for ExcelSource {
    fn read_data(&self) -> Result<DataSet> {
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| DataError::WorkbookOpen(format!("{}: {}", self.path.display(), e)))?;

        let mut set = DataSet::new();
        for sheet in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&sheet)
                .map_err(|e| DataError::SheetNotFound(format!("{}: {}", sheet, e)))?;
            let table = DataTable::from_records(sheet.as_str(), Self::sheet_records(&range));
            debug!(sheet = %sheet, rows = table.len(), "read worksheet");
            set.insert(table);
        }
        Ok(set)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_sheet_records_restore_offset() {
        // Used area B2:C3
        let mut range = Range::new((1, 1), (2, 2));
        range.set_value((1, 1), text("Name"));
        range.set_value((2, 1), text("Alice"));
        range.set_value((2, 2), Data::Float(1.005));

        let records = ExcelSource::sheet_records(&range);
        assert_eq!(records.len(), 3);
        assert!(records[0].iter().all(Value::is_blank));
        assert_eq!(records[1][1], Value::Text("Name".to_string()));
        assert_eq!(records[2][0], Value::Blank);
        assert_eq!(records[2][1], Value::Text("Alice".to_string()));
        assert_eq!(records[2][2].to_string(), "1.01");

        // Row 1 of the sheet is blank, so "Name" in row 2 is a data row
        let table = DataTable::from_records("S", records);
        assert_eq!(table.len(), 2);
        assert_eq!(table.row(0).unwrap().get("[B]").unwrap().to_string(), "Name");
    }

    #[test]
    fn test_sheet_records_empty_range() {
        let range: Range<Data> = Range::empty();
        assert!(ExcelSource::sheet_records(&range).is_empty());
    }

    #[test]
    fn test_missing_workbook() {
        assert!(matches!(
            ExcelSource::new("/nonexistent/book.xlsx"),
            Err(DataError::FileNotFound(_))
        ));
    }
}
