//! # slidefill-data
//!
//! Tabular data providers for slidefill: read Excel workbooks and CSV files
//! into named tables of rows keyed by bracket tokens (`[A]`, `[B]`, ...).
//!
//! ## Features
//!
//! - **Excel Support**: every worksheet of an `.xlsx`/`.xls`/`.ods` file via `calamine`
//! - **CSV Support**: one table per file via `csv`
//! - **Normalization**: numbers rounded half-up to two decimals, dates as `YYYY-MM-DD`
//!
//! ## Example
//!
//! ```rust,ignore
//! use slidefill_data::{open_provider, DataProvider};
//!
//! let provider = open_provider("orders.xlsx")?;
//! let data = provider.read_data()?;
//! for table in data.tables() {
//!     println!("{}: {} rows", table.name(), table.len());
//! }
//! ```

pub mod error;
pub mod normalize;
pub mod sources;
pub mod value;

// Re-exports
pub use error::{DataError, Result};
pub use sources::{
    is_supported, open_provider, CsvOptions, CsvSource, DataProvider, ExcelSource,
    SUPPORTED_EXTENSIONS,
};
pub use value::{DataSet, DataTable, Row, Value};
