//! Data source implementations.
//!
//! This module contains adapters for various data sources (Excel, CSV, etc.)

pub mod csv;
pub mod excel;

use std::path::Path;

pub use self::csv::{CsvOptions, CsvSource};
pub use self::excel::ExcelSource;

use crate::error::{DataError, Result};
use crate::value::DataSet;

/// Trait for sources that produce named tables of token-keyed rows
pub trait DataProvider {
    /// Read every table the source holds
    ///
    /// Each table drops its header row and rows whose cells are all empty;
    /// values are already normalized.
    fn read_data(&self) -> Result<DataSet>;

    /// Human-readable origin of the data, for logs and reports
    fn describe(&self) -> String;
}

/// File extensions [`open_provider`] recognizes
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods", "csv", "tsv"];

/// True when `path` has an extension a provider can read
pub fn is_supported(path: &Path) -> bool {
    extension(path).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Pick a provider from the file extension
pub fn open_provider(path: impl AsRef<Path>) -> Result<Box<dyn DataProvider + Send + Sync>> {
    let path = path.as_ref();
    match extension(path).as_deref() {
        Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(Box::new(ExcelSource::new(path)?)),
        Some("csv") => Ok(Box::new(CsvSource::new(path)?)),
        Some("tsv") => Ok(Box::new(CsvSource::with_options(path, CsvOptions::tsv())?)),
        _ => Err(DataError::UnsupportedFormat(path.display().to_string())),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("data/report.xlsx")));
        assert!(is_supported(Path::new("REPORT.CSV")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("no_extension")));
    }

    #[test]
    fn test_open_provider_rejects_unknown_extension() {
        let err = open_provider("deck.pptx").err().unwrap();
        assert!(matches!(err, DataError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_open_provider_missing_file() {
        let err = open_provider("/nonexistent/data.csv").err().unwrap();
        assert!(matches!(err, DataError::FileNotFound(_)));
    }
}
