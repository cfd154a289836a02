//! Slide mapping configuration.
//!
//! A mapping file is a JSON object keyed by 1-based template slide positions:
//!
//! ```json
//! {
//!   "2": { "sheet": "Orders", "type": "row_for_page", "copy": true },
//!   "4": { "sheet": "Totals", "type": "row_for_table_row" }
//! }
//! ```
//!
//! Entries that cannot be understood are skipped and recorded as
//! configuration issues; only a file that is not a JSON object at all is an
//! error.

use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FillError, Result};
use crate::report::Issue;

/// How a slide consumes its data table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FillMode {
    /// One row per slide (`"row_for_page"`)
    #[default]
    #[serde(rename = "row_for_page")]
    SingleRowFill,
    /// Whole table into the slide's table rows (`"row_for_table_row"`)
    #[serde(rename = "row_for_table_row")]
    TableRowFill,
}

impl FillMode {
    /// The literal used in mapping files
    pub fn literal(self) -> &'static str {
        match self {
            FillMode::SingleRowFill => "row_for_page",
            FillMode::TableRowFill => "row_for_table_row",
        }
    }
}

impl FromStr for FillMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "row_for_page" => Ok(FillMode::SingleRowFill),
            "row_for_table_row" => Ok(FillMode::TableRowFill),
            other => Err(format!("unknown fill type '{}'", other)),
        }
    }
}

impl fmt::Display for FillMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// Rule for one template slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    /// Name of the data table feeding the slide
    pub source: String,
    pub mode: FillMode,
    /// Clone the slide once per data row
    pub expand: bool,
}

impl MappingEntry {
    pub fn new(source: impl Into<String>, mode: FillMode, expand: bool) -> Self {
        Self {
            source: source.into(),
            mode,
            expand,
        }
    }
}

/// On-disk shape of an entry
#[derive(Debug, Serialize, Deserialize)]
struct RawEntry {
    sheet: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default)]
    copy: bool,
}

/// Mapping entries in ascending position order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingConfig {
    entries: BTreeMap<NonZeroU32, MappingEntry>,
    issues: Vec<Issue>,
}

impl MappingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a mapping file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FillError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Load a mapping file, falling back to an empty mapping on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "using empty slide mapping");
                let mut config = Self::default();
                config.issues.push(Issue::config(err.to_string()));
                config
            }
        }
    }

    /// Parse mapping JSON
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Object(object) = document else {
            return Err(FillError::config("mapping must be a JSON object"));
        };

        let mut config = Self::default();
        for (key, value) in object {
            let Some(position) = parse_position(&key) else {
                config.skip(Issue::config(format!(
                    "mapping key '{}' is not a positive slide number",
                    key
                )));
                continue;
            };

            let raw: RawEntry = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(err) => {
                    config.skip(
                        Issue::config(format!("mapping entry '{}': {}", key, err))
                            .at(position.get() as usize),
                    );
                    continue;
                }
            };

            let mode = match raw.kind.as_deref().map(FillMode::from_str).transpose() {
                Ok(mode) => mode.unwrap_or_default(),
                Err(reason) => {
                    config.skip(
                        Issue::config(format!("mapping entry '{}': {}", key, reason))
                            .at(position.get() as usize),
                    );
                    continue;
                }
            };

            if config.entries.contains_key(&position) {
                config.skip(
                    Issue::config(format!("duplicate mapping key '{}'", key))
                        .at(position.get() as usize),
                );
                continue;
            }
            config
                .entries
                .insert(position, MappingEntry::new(raw.sheet, mode, raw.copy));
        }
        Ok(config)
    }

    fn skip(&mut self, issue: Issue) {
        warn!("{}", issue);
        self.issues.push(issue);
    }

    /// Serialize back to mapping JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        let object: BTreeMap<String, RawEntry> = self
            .entries
            .iter()
            .map(|(position, entry)| {
                (
                    position.to_string(),
                    RawEntry {
                        sheet: entry.source.clone(),
                        kind: Some(entry.mode.literal().to_string()),
                        copy: entry.expand,
                    },
                )
            })
            .collect();
        Ok(serde_json::to_string_pretty(&object)?)
    }

    /// Add or replace the entry at a 1-based position
    pub fn insert(&mut self, position: NonZeroU32, entry: MappingEntry) {
        self.entries.insert(position, entry);
    }

    pub fn get(&self, position: u32) -> Option<&MappingEntry> {
        NonZeroU32::new(position).and_then(|p| self.entries.get(&p))
    }

    /// Entries in ascending position order
    pub fn iter(&self) -> impl Iterator<Item = (NonZeroU32, &MappingEntry)> {
        self.entries.iter().map(|(p, e)| (*p, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configuration issues found while loading
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

/// Parse a mapping key: trimmed, decimal, at least 1
fn parse_position(key: &str) -> Option<NonZeroU32> {
    key.trim().parse::<u32>().ok().and_then(NonZeroU32::new)
}
