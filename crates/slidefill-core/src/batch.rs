//! Batch generation: one output deck per data file.
//!
//! The template is read once and every worker parses its own deck from the
//! shared bytes. A unit that fails is recorded and the rest carry on.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use slidefill_data::is_supported;
use tracing::{error, info, warn};

use crate::error::{FillError, Result};
use crate::mapping::MappingConfig;
use crate::pipeline::process_template;
use crate::report::FillReport;
use crate::settings::{BatchSettings, FillOptions};

/// Extension of every generated deck
pub const OUTPUT_EXTENSION: &str = "pptx";

/// Progress callback: units finished so far, total units
pub type Progress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Locations and limits for a batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub template: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Worker threads; the host core count when `None`
    pub workers: Option<usize>,
    /// Regenerate outputs that already exist
    pub overwrite: bool,
}

impl BatchConfig {
    pub fn new(
        template: impl Into<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            template: template.into(),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            workers: None,
            overwrite: false,
        }
    }

    /// Build from settings; the three locations must be set
    pub fn from_settings(settings: &BatchSettings) -> Result<Self> {
        let require = |value: &Option<PathBuf>, name: &str| {
            value
                .clone()
                .ok_or_else(|| FillError::config(format!("batch setting '{}' is not set", name)))
        };
        Ok(Self {
            template: require(&settings.template, "template")?,
            input_dir: require(&settings.input_dir, "input_dir")?,
            output_dir: require(&settings.output_dir, "output_dir")?,
            workers: settings.workers,
            overwrite: settings.overwrite,
        })
    }
}

/// How one input file fared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Processed { report: FillReport },
    /// The output already existed
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitResult {
    pub input: PathBuf,
    pub output: PathBuf,
    pub outcome: UnitOutcome,
}

/// Per-file results of a batch run, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub units: Vec<UnitResult>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.count(|outcome| matches!(outcome, UnitOutcome::Processed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, UnitOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, UnitOutcome::Failed { .. }))
    }

    /// Issues across every processed unit
    pub fn issue_count(&self) -> usize {
        self.units
            .iter()
            .map(|unit| match &unit.outcome {
                UnitOutcome::Processed { report } => report.issues.len(),
                _ => 0,
            })
            .sum()
    }

    fn count(&self, predicate: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.units.iter().filter(|unit| predicate(&unit.outcome)).count()
    }
}

/// Supported data files directly inside `dir`, sorted by path
///
/// Office lock files (`~$name.xlsx`) are ignored.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_supported(&path) {
            continue;
        }
        let locked = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("~$"));
        if !locked {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Output path for an input file: same stem, `.pptx`, under `output_dir`
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

struct Unit {
    input: PathBuf,
    output: PathBuf,
    /// Set when an earlier input already claimed the output path
    collision: Option<PathBuf>,
}

fn plan_units(inputs: Vec<PathBuf>, output_dir: &Path) -> Vec<Unit> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    inputs
        .into_iter()
        .map(|input| {
            let output = output_path(&input, output_dir);
            let collision = claimed.get(&output).cloned();
            if collision.is_none() {
                claimed.insert(output.clone(), input.clone());
            }
            Unit {
                input,
                output,
                collision,
            }
        })
        .collect()
}

fn run_unit(
    unit: &Unit,
    template: &[u8],
    mapping: &MappingConfig,
    options: &FillOptions,
    overwrite: bool,
) -> UnitOutcome {
    if let Some(first) = &unit.collision {
        return UnitOutcome::Failed {
            reason: format!(
                "output {} is already produced from {}",
                unit.output.display(),
                first.display()
            ),
        };
    }
    if !overwrite && unit.output.exists() {
        info!(output = %unit.output.display(), "output exists, skipping");
        return UnitOutcome::Skipped;
    }

    let result = slidefill_data::open_provider(&unit.input)
        .map_err(FillError::from)
        .and_then(|provider| {
            process_template(template, &unit.output, provider.as_ref(), mapping, options)
        });
    match result {
        Ok(report) => UnitOutcome::Processed { report },
        Err(err) => {
            error!(input = %unit.input.display(), "[{}] {}", err.code(), err);
            UnitOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}

/// Run one unit, turning a panic into a failed outcome for that unit
fn isolate(input: &Path, run: impl FnOnce() -> UnitOutcome) -> UnitOutcome {
    catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(input = %input.display(), "unit panicked: {}", message);
        UnitOutcome::Failed {
            reason: format!("panicked: {}", message),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Generate one deck per supported file in the input directory
///
/// A missing template or an output directory that cannot be created fails
/// the whole run; anything that goes wrong with a single file is recorded in
/// its [`UnitResult`], including a panic while processing it.
pub fn run_batch(
    config: &BatchConfig,
    mapping: &MappingConfig,
    options: &FillOptions,
    progress: Option<Progress<'_>>,
) -> Result<BatchReport> {
    let template = std::fs::read(&config.template).map_err(|e| {
        FillError::config(format!(
            "cannot read template {}: {}",
            config.template.display(),
            e
        ))
    })?;
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| FillError::output(&config.output_dir, e.to_string()))?;

    let inputs = discover_inputs(&config.input_dir)?;
    if inputs.is_empty() {
        warn!(dir = %config.input_dir.display(), "no data files found");
        return Ok(BatchReport::default());
    }
    let units = plan_units(inputs, &config.output_dir);

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(workers) = config.workers.filter(|&n| n > 0) {
        builder = builder.num_threads(workers);
    }
    let pool = builder
        .build()
        .map_err(|e| FillError::config(format!("cannot start worker pool: {}", e)))?;

    info!(
        units = units.len(),
        workers = pool.current_num_threads(),
        "starting batch"
    );

    let total = units.len();
    let done = AtomicUsize::new(0);
    let outcomes: Vec<UnitOutcome> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| {
                let outcome = isolate(&unit.input, || {
                    run_unit(unit, &template, mapping, options, config.overwrite)
                });
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = progress {
                    progress(finished, total);
                }
                outcome
            })
            .collect()
    });

    let report = BatchReport {
        units: units
            .into_iter()
            .zip(outcomes)
            .map(|(unit, outcome)| UnitResult {
                input: unit.input,
                output: unit.output,
                outcome,
            })
            .collect(),
    };
    info!(
        processed = report.processed(),
        skipped = report.skipped(),
        failed = report.failed(),
        "batch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_inputs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.xlsx", "~$a.xlsx", "notes.txt", "c.TSV"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let names: Vec<_> = discover_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xlsx", "b.csv", "c.TSV"]);
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("/in/report.2024.xlsx"), Path::new("/out")),
            PathBuf::from("/out/report.2024.pptx")
        );
    }

    #[test]
    fn test_collisions_are_flagged() {
        let units = plan_units(
            vec![PathBuf::from("a.csv"), PathBuf::from("a.xlsx"), PathBuf::from("b.csv")],
            Path::new("out"),
        );
        assert!(units[0].collision.is_none());
        assert_eq!(units[1].collision, Some(PathBuf::from("a.csv")));
        assert!(units[2].collision.is_none());
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = BatchSettings {
            template: Some(PathBuf::from("t.pptx")),
            input_dir: Some(PathBuf::from("in")),
            ..BatchSettings::default()
        };
        assert!(BatchConfig::from_settings(&settings).is_err());

        settings.output_dir = Some(PathBuf::from("out"));
        settings.workers = Some(2);
        let config = BatchConfig::from_settings(&settings).unwrap();
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_panicking_unit_is_recorded_as_failed() {
        let input = Path::new("in/broken.csv");
        let outcome = isolate(input, || panic!("bad cell at row {}", 3));
        assert_eq!(
            outcome,
            UnitOutcome::Failed {
                reason: "panicked: bad cell at row 3".to_string()
            }
        );

        let outcome = isolate(input, || panic!("static message"));
        assert!(matches!(outcome, UnitOutcome::Failed { reason } if reason == "panicked: static message"));

        let outcome = isolate(input, || UnitOutcome::Skipped);
        assert_eq!(outcome, UnitOutcome::Skipped);
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig::new(
            dir.path().join("missing.pptx"),
            dir.path(),
            dir.path().join("out"),
        );
        let err = run_batch(&config, &MappingConfig::new(), &FillOptions::default(), None)
            .unwrap_err();
        assert!(matches!(err, FillError::Config { .. }));
    }
}
