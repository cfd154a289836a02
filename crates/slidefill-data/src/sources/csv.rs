//! CSV data source.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DataError, Result};
use crate::normalize::normalize_text_field;
use crate::sources::DataProvider;
use crate::value::{DataSet, DataTable, Value};

/// Options for CSV parsing
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Whether to trim whitespace from fields
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            trim: true,
        }
    }
}

impl CsvOptions {
    /// Create options for tab-separated values (TSV)
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Default::default()
        }
    }

    /// Create options for semicolon-separated values (common in European locales)
    pub fn semicolon() -> Self {
        Self {
            delimiter: b';',
            ..Default::default()
        }
    }
}

/// CSV file data source
///
/// A CSV file holds a single table named after the file stem. The first
/// record is the header.
pub struct CsvSource {
    /// Path to the CSV file
    path: PathBuf,
    /// Parsing options
    options: CsvOptions,
}

impl CsvSource {
    /// Create a new CSV source from a file path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, CsvOptions::default())
    }

    /// Create a new CSV source with custom options
    pub fn with_options(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            options,
        })
    }

    /// Name of the single table this source produces
    pub fn table_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string())
    }

    /// Read all records, normalized, header included
    pub fn read_records(&self) -> Result<Vec<Vec<Value>>> {
        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .has_headers(false) // header handling happens in DataTable
            .trim(if self.options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            records.push(record.iter().map(normalize_text_field).collect());
        }
        Ok(records)
    }
}

impl DataProvider for CsvSource {
    fn read_data(&self) -> Result<DataSet> {
        let table = DataTable::from_records(self.table_name(), self.read_records()?);
        debug!(table = table.name(), rows = table.len(), "read csv");
        Ok(DataSet::new().with_table(table))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_csv_read_data() {
        let file = create_test_csv("Name,Age,Score\nAlice,30,95.555\nBob,25,87\n");
        let source = CsvSource::new(file.path()).unwrap();

        let set = source.read_data().unwrap();
        let table = set.get(&source.table_name()).unwrap();
        assert_eq!(table.len(), 2);

        let alice = table.row(0).unwrap();
        assert_eq!(alice.get("[A]").unwrap().to_string(), "Alice");
        assert_eq!(alice.get("[B]").unwrap().to_string(), "30");
        assert_eq!(alice.get("[C]").unwrap().to_string(), "95.56");
    }

    #[test]
    fn test_csv_skips_blank_records() {
        let file = create_test_csv("A,B\nx,1\n,\ny,2\n");
        let source = CsvSource::new(file.path()).unwrap();
        let set = source.read_data().unwrap();
        assert_eq!(set.row_count(&source.table_name()), 2);
    }

    #[test]
    fn test_csv_ragged_rows_are_padded() {
        let file = create_test_csv("A,B,C\nx\n");
        let source = CsvSource::new(file.path()).unwrap();
        let set = source.read_data().unwrap();
        let row = set.get(&source.table_name()).unwrap().row(0).unwrap().clone();
        assert_eq!(row.len(), 3);
        assert!(row.get("[C]").unwrap().is_blank());
    }

    #[test]
    fn test_csv_quoted_fields() {
        let csv_content = r#"Name,Description
"Alice","A ""quoted"" value"
"Bob","Value with, comma"
"#;
        let file = create_test_csv(csv_content);
        let source = CsvSource::new(file.path()).unwrap();
        let records = source.read_records().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1][1].to_string(), r#"A "quoted" value"#);
        assert_eq!(records[2][1].to_string(), "Value with, comma");
    }

    #[test]
    fn test_csv_semicolon() {
        let file = create_test_csv("Name;Age\nAlice;30\n");
        let source = CsvSource::with_options(file.path(), CsvOptions::semicolon()).unwrap();
        let records = source.read_records().unwrap();
        assert_eq!(records[1][1].to_string(), "30");
    }

    #[test]
    fn test_csv_file_not_found() {
        assert!(CsvSource::new("/nonexistent/path/file.csv").is_err());
    }
}
