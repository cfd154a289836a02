//! Tabular data model: scalars, token-keyed rows, named tables.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::normalize::column_token;

/// A normalized cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Text, including pre-formatted dates
    Text(String),
    /// Number, already rounded to two decimals
    Number(Decimal),
    /// Boolean cell
    Bool(bool),
    /// Empty cell
    #[default]
    Blank,
}

impl Value {
    /// True for [`Value::Blank`]
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Blank)
    }
}

/// Display form used when a value replaces a token in slide text.
///
/// Numbers drop trailing zeros (`10.50` shows as `10.5`, `3.00` as `3`).
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{}", number.normalize()),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::Blank => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Decimal> for Value {
    fn from(number: Decimal) -> Self {
        Value::Number(number)
    }
}

/// One data row: bracket token (`"[A]"`, `"[B]"`, ...) to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: BTreeMap<String, Value>,
}

impl Row {
    /// An empty row; every token lookup misses
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from positional values, keyed `[A]`, `[B]`, ... by column
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let cells = values
            .into_iter()
            .enumerate()
            .map(|(column, value)| (column_token(column), value))
            .collect();
        Self { cells }
    }

    /// Set the value of a token
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<Value>) {
        self.cells.insert(token.into(), value.into());
    }

    /// Builder-style [`Row::insert`]
    pub fn with(mut self, token: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(token, value);
        self
    }

    /// Value bound to a token
    pub fn get(&self, token: &str) -> Option<&Value> {
        self.cells.get(token)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// True when every value is blank (or there are none)
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(Value::is_blank)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A named, ordered sequence of rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    name: String,
    rows: Vec<Row>,
}

impl DataTable {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Build a table from raw records laid out like a sheet
    ///
    /// The first record is a header and is dropped. Remaining records are
    /// padded to the widest record, so every row carries the same tokens,
    /// and records whose cells are all blank are skipped.
    pub fn from_records(name: impl Into<String>, records: Vec<Vec<Value>>) -> Self {
        let width = records.iter().map(Vec::len).max().unwrap_or(0);
        let rows = records
            .into_iter()
            .skip(1)
            .filter(|record| record.iter().any(|value| !value.is_blank()))
            .map(|mut record| {
                record.resize(width, Value::Blank);
                Row::from_values(record)
            })
            .collect();
        Self::new(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at a 0-based index
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// All tables read from one data source, in source order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    tables: Vec<DataTable>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table with the same name in place
    pub fn insert(&mut self, table: DataTable) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    /// Builder-style [`DataSet::insert`]
    pub fn with_table(mut self, table: DataTable) -> Self {
        self.insert(table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&DataTable> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Number of rows in a table; 0 when the table is absent
    pub fn row_count(&self, name: &str) -> usize {
        self.get(name).map(DataTable::len).unwrap_or(0)
    }

    /// Table names in source order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn tables(&self) -> &[DataTable] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
