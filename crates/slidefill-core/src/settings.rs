//! Run settings
//!
//! Settings come from an optional TOML file, then environment variables, then
//! command-line flags; later sources win.
//!
//! ```toml
//! [fill]
//! fallback = "N/A"
//! free_text = "untouched"
//! on_out_of_range = "abort"
//!
//! [batch]
//! template = "template.pptx"
//! input_dir = "data"
//! output_dir = "out"
//! mapping_file = "slide_mappings.json"
//! workers = 4
//! overwrite = false
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FillError, Result};

/// Literal written for tokens that have no value
pub const DEFAULT_FALLBACK: &str = "未知";

/// Environment variable naming the template deck
pub const ENV_TEMPLATE: &str = "PPT_TEMPLATE_PATH";
/// Environment variable naming the data input directory
pub const ENV_INPUT_DIR: &str = "EXCEL_INPUT_DIR";
/// Environment variable naming the output directory
pub const ENV_OUTPUT_DIR: &str = "PPT_OUTPUT_DIR";
/// Environment variable naming the mapping file
pub const ENV_MAPPING_FILE: &str = "SLIDE_MAPPINGS_FILE";
/// Environment variable holding the worker count
pub const ENV_WORKERS: &str = "MAX_WORKERS";

/// What happens to free-standing text on a table-row slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeTextPolicy {
    /// Fill it from the first data row
    #[default]
    FirstRow,
    /// Leave it as authored
    Untouched,
}

/// What happens when a mapping or plan position is outside the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Record an issue and carry on with the other positions
    #[default]
    Skip,
    /// Stop the run with an error
    Abort,
}

/// Knobs for planning and substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillOptions {
    /// Replacement for tokens missing from their row
    pub fallback: String,
    pub free_text: FreeTextPolicy,
    pub on_out_of_range: OutOfRangePolicy,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            fallback: DEFAULT_FALLBACK.to_string(),
            free_text: FreeTextPolicy::default(),
            on_out_of_range: OutOfRangePolicy::default(),
        }
    }
}

/// Batch run locations and limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub template: Option<PathBuf>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub mapping_file: Option<PathBuf>,
    /// Worker threads; the host core count when unset
    pub workers: Option<usize>,
    /// Regenerate outputs that already exist
    pub overwrite: bool,
}

/// Top-level settings structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fill: FillOptions,
    pub batch: BatchSettings,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| FillError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(Self::from_toml_str(&text)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an environment lookup; empty values are ignored
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_TEMPLATE) {
            self.batch.template = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_INPUT_DIR) {
            self.batch.input_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_OUTPUT_DIR) {
            self.batch.output_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_MAPPING_FILE) {
            self.batch.mapping_file = Some(PathBuf::from(value));
        }
        if let Some(value) = get(ENV_WORKERS) {
            match value.trim().parse::<usize>() {
                Ok(workers) if workers > 0 => self.batch.workers = Some(workers),
                _ => warn!(value = %value, "ignoring invalid {}", ENV_WORKERS),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fill.fallback, "未知");
        assert_eq!(settings.fill.free_text, FreeTextPolicy::FirstRow);
        assert_eq!(settings.fill.on_out_of_range, OutOfRangePolicy::Skip);
        assert!(!settings.batch.overwrite);
        assert_eq!(settings.batch.workers, None);
    }

    #[test]
    fn test_from_toml() {
        let settings = Settings::from_toml_str(
            r#"
            [fill]
            fallback = "N/A"
            on_out_of_range = "abort"

            [batch]
            template = "t.pptx"
            workers = 3
            "#,
        )
        .unwrap();

        assert_eq!(settings.fill.fallback, "N/A");
        assert_eq!(settings.fill.free_text, FreeTextPolicy::FirstRow);
        assert_eq!(settings.fill.on_out_of_range, OutOfRangePolicy::Abort);
        assert_eq!(settings.batch.template, Some(PathBuf::from("t.pptx")));
        assert_eq!(settings.batch.workers, Some(3));
    }

    #[test]
    fn test_from_toml_rejects_unknown_policy() {
        assert!(Settings::from_toml_str("[fill]\nfree_text = \"sometimes\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PPT_TEMPLATE_PATH", "/tpl/deck.pptx"),
            ("EXCEL_INPUT_DIR", "/in"),
            ("PPT_OUTPUT_DIR", ""),
            ("MAX_WORKERS", "8"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.batch.output_dir = Some(PathBuf::from("/keep"));
        settings.apply_env_with(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.batch.template, Some(PathBuf::from("/tpl/deck.pptx")));
        assert_eq!(settings.batch.input_dir, Some(PathBuf::from("/in")));
        assert_eq!(settings.batch.output_dir, Some(PathBuf::from("/keep")));
        assert_eq!(settings.batch.workers, Some(8));
    }

    #[test]
    fn test_invalid_worker_count_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_env_with(|key| (key == ENV_WORKERS).then(|| "many".to_string()));
        assert_eq!(settings.batch.workers, None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slidefill.toml");
        std::fs::write(&path, "[batch]\noverwrite = true\n").unwrap();

        assert!(Settings::load(&path).unwrap().batch.overwrite);
        assert!(Settings::load(dir.path().join("missing.toml")).is_err());
    }
}
