//! CLI Application logic
//!
//! Contains the command-line interface implementation. Settings are layered:
//! the TOML settings file first, then environment variables, then flags.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use slidefill_core::batch::output_path;
use slidefill_core::{
    process_file, run_batch, BatchConfig, BatchReport, ExpansionPlan, FillOptions, FillReport,
    FreeTextPolicy, MappingConfig, OutOfRangePolicy, Settings, UnitOutcome,
};
use slidefill_pptx::Deck;

/// Settings file picked up from the working directory when `--config` is absent
pub const DEFAULT_SETTINGS_FILE: &str = "slidefill.toml";

/// Mapping file used when neither flags, environment nor settings name one
pub const DEFAULT_MAPPING_FILE: &str = "slide_mappings.json";

/// Output format for reports and plans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripts and CI
    Json,
}

/// Substitution flags shared by `fill` and `batch`
#[derive(Debug, Clone, Default, Args)]
pub struct FillFlags {
    /// Text written for tokens without a value
    #[arg(long)]
    pub fallback: Option<String>,

    /// Leave free text on table-row slides as authored
    #[arg(long)]
    pub keep_free_text: bool,

    /// Stop instead of skipping when a mapped slide is outside the template
    #[arg(long)]
    pub abort_on_out_of_range: bool,
}

impl FillFlags {
    /// Override `options` with the flags that were given
    pub fn apply(&self, options: &mut FillOptions) {
        if let Some(fallback) = &self.fallback {
            options.fallback = fallback.clone();
        }
        if self.keep_free_text {
            options.free_text = FreeTextPolicy::Untouched;
        }
        if self.abort_on_out_of_range {
            options.on_out_of_range = OutOfRangePolicy::Abort;
        }
    }
}

#[derive(Parser)]
#[command(name = "slidefill")]
#[command(author, version, about = "Fill PowerPoint templates from spreadsheet data", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true, env = "SLIDEFILL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill a template from one data file
    Fill {
        /// Data file (xlsx, xls, ods, csv, tsv)
        #[arg(short, long)]
        data: PathBuf,

        /// Template deck
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Slide mapping file (JSON)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Output deck; defaults to the data file's name with .pptx
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        flags: FillFlags,
    },

    /// Fill a template once per data file in a directory
    Batch {
        /// Template deck
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Directory holding the data files
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Directory for the generated decks
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Slide mapping file (JSON)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Worker threads (defaults to the number of cores)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Regenerate decks that already exist
        #[arg(long)]
        overwrite: bool,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        flags: FillFlags,
    },

    /// Show the expansion and fill plan without writing anything
    Plan {
        /// Data file (xlsx, xls, ods, csv, tsv)
        #[arg(short, long)]
        data: PathBuf,

        /// Template deck
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Slide mapping file (JSON)
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Run the CLI application
///
/// This is the main entry point for the command-line interface.
/// It parses arguments and dispatches to the appropriate command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Fill {
            data,
            template,
            mapping,
            output,
            format,
            flags,
        } => {
            override_path(&mut settings.batch.template, template);
            override_path(&mut settings.batch.mapping_file, mapping);
            flags.apply(&mut settings.fill);
            fill_command(&settings, &data, output.as_deref(), format)?;
        }
        Commands::Batch {
            template,
            input_dir,
            output_dir,
            mapping,
            workers,
            overwrite,
            format,
            flags,
        } => {
            override_path(&mut settings.batch.template, template);
            override_path(&mut settings.batch.input_dir, input_dir);
            override_path(&mut settings.batch.output_dir, output_dir);
            override_path(&mut settings.batch.mapping_file, mapping);
            if workers.is_some() {
                settings.batch.workers = workers;
            }
            settings.batch.overwrite |= overwrite;
            flags.apply(&mut settings.fill);

            let report = batch_command(&settings, format)?;
            if report.failed() > 0 {
                anyhow::bail!(
                    "{} of {} data file(s) failed",
                    report.failed(),
                    report.units.len()
                );
            }
        }
        Commands::Plan {
            data,
            template,
            mapping,
            format,
        } => {
            override_path(&mut settings.batch.template, template);
            override_path(&mut settings.batch.mapping_file, mapping);
            plan_command(&settings, &data, format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn override_path(slot: &mut Option<PathBuf>, flag: Option<PathBuf>) {
    if flag.is_some() {
        *slot = flag;
    }
}

/// Load settings from a file, then apply environment overrides
///
/// Without an explicit path, `slidefill.toml` in the working directory is
/// used when present.
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    let mut settings = match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Settings::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None if Path::new(DEFAULT_SETTINGS_FILE).exists() => Settings::load(DEFAULT_SETTINGS_FILE)
            .with_context(|| format!("Failed to load config: {}", DEFAULT_SETTINGS_FILE))?,
        None => Settings::default(),
    };
    settings.apply_env();
    Ok(settings)
}

/// Load the mapping named in the settings, or the default mapping file
///
/// A named file must load; the default file may be missing, in which case
/// the mapping is empty and carries a configuration issue.
fn load_mapping(settings: &Settings) -> Result<MappingConfig> {
    match &settings.batch.mapping_file {
        Some(path) => MappingConfig::load(path)
            .with_context(|| format!("Failed to load mapping: {}", path.display())),
        None => {
            let mapping = MappingConfig::load_or_default(DEFAULT_MAPPING_FILE);
            for issue in mapping.issues() {
                warn!("{}", issue);
            }
            Ok(mapping)
        }
    }
}

fn require_template(settings: &Settings) -> Result<&Path> {
    settings
        .batch
        .template
        .as_deref()
        .context("No template given (use --template, PPT_TEMPLATE_PATH or the settings file)")
}

/// Execute the fill command
pub fn fill_command(
    settings: &Settings,
    data: &Path,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<FillReport> {
    let template = require_template(settings)?;
    let mapping = load_mapping(settings)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => output_path(
            data,
            settings.batch.output_dir.as_deref().unwrap_or(Path::new(".")),
        ),
    };
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let provider = slidefill_data::open_provider(data)
        .with_context(|| format!("Failed to open data file: {}", data.display()))?;
    let report = process_file(template, &output, provider.as_ref(), &mapping, &settings.fill)
        .with_context(|| format!("Failed to fill template: {}", template.display()))?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("slidefill v{}", slidefill_core::VERSION);
            println!(
                "✓ {} ({} -> {} slides, {} filled)",
                output.display(),
                report.slides_before,
                report.slides_after,
                report.items_filled
            );
            print_issues(&report);
        }
    }

    Ok(report)
}

fn print_issues(report: &FillReport) {
    for issue in &report.issues {
        println!("  {}", issue);
    }
}

/// Execute the batch command
pub fn batch_command(settings: &Settings, format: OutputFormat) -> Result<BatchReport> {
    let config = BatchConfig::from_settings(&settings.batch)
        .context("Batch needs a template, an input directory and an output directory")?;
    let mapping = load_mapping(settings)?;

    let progress = |done: usize, total: usize| {
        info!(done, total, "progress");
    };
    let report = run_batch(&config, &mapping, &settings.fill, Some(&progress))
        .context("Batch run failed")?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize batch report to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("slidefill v{}", slidefill_core::VERSION);
            for unit in &report.units {
                match &unit.outcome {
                    UnitOutcome::Processed { report } => {
                        println!("✓ {} -> {}", unit.input.display(), unit.output.display());
                        print_issues(report);
                    }
                    UnitOutcome::Skipped => {
                        println!("- {} (output exists)", unit.input.display());
                    }
                    UnitOutcome::Failed { reason } => {
                        println!("✗ {}: {}", unit.input.display(), reason);
                    }
                }
            }
            println!();
            println!(
                "Processed {}, skipped {}, failed {}",
                report.processed(),
                report.skipped(),
                report.failed()
            );
        }
    }

    Ok(report)
}

/// Execute the plan command
pub fn plan_command(settings: &Settings, data: &Path, format: OutputFormat) -> Result<ExpansionPlan> {
    let template = require_template(settings)?;
    let mapping = load_mapping(settings)?;

    let deck = Deck::open(template)
        .with_context(|| format!("Failed to open template: {}", template.display()))?;
    let provider = slidefill_data::open_provider(data)
        .with_context(|| format!("Failed to open data file: {}", data.display()))?;
    let data_set = provider
        .read_data()
        .with_context(|| format!("Failed to read data file: {}", data.display()))?;

    let plan = ExpansionPlan::for_data(&mapping, &data_set, deck.len());
    println!("{}", render_plan(&plan, &mapping, format)?);
    Ok(plan)
}

/// Render a plan and the mapping's load issues
pub fn render_plan(
    plan: &ExpansionPlan,
    mapping: &MappingConfig,
    format: OutputFormat,
) -> Result<String> {
    let issues: Vec<_> = mapping.issues().iter().chain(plan.issues()).collect();

    if format == OutputFormat::Json {
        let value = json!({
            "template_slides": plan.deck_len(),
            "expanded_slides": plan.expanded_len(),
            "entries": plan.entries(),
            "items": plan.items(),
            "issues": issues,
        });
        return serde_json::to_string_pretty(&value).context("Failed to serialize plan to JSON");
    }

    let mut out = String::new();
    writeln!(
        out,
        "Template slides: {}, after expansion: {}",
        plan.deck_len(),
        plan.expanded_len()
    )?;
    for entry in plan.entries() {
        writeln!(
            out,
            "  slide {} -> {}: {} ({}), {} row(s), {} cop{}",
            entry.nominal,
            entry.real,
            entry.source,
            entry.mode,
            entry.rows,
            entry.copies,
            if entry.copies == 1 { "y" } else { "ies" }
        )?;
    }
    writeln!(out, "Fill plan:")?;
    for item in plan.items() {
        writeln!(
            out,
            "  {:>3}  {} row {}",
            item.position,
            item.source,
            item.row_index + 1
        )?;
    }
    if !issues.is_empty() {
        writeln!(out, "Issues:")?;
        for issue in issues {
            writeln!(out, "  {}", issue)?;
        }
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_args() {
        let cli = Cli::try_parse_from([
            "slidefill",
            "batch",
            "--input-dir",
            "in",
            "-w",
            "3",
            "--overwrite",
            "--fallback",
            "N/A",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Batch {
                input_dir,
                workers,
                overwrite,
                flags,
                ..
            } => {
                assert_eq!(input_dir, Some(PathBuf::from("in")));
                assert_eq!(workers, Some(3));
                assert!(overwrite);
                assert_eq!(flags.fallback.as_deref(), Some("N/A"));
            }
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_fill_requires_data() {
        assert!(Cli::try_parse_from(["slidefill", "fill", "--template", "t.pptx"]).is_err());
    }

    #[test]
    fn test_fill_flags_apply() {
        let mut options = FillOptions::default();
        FillFlags::default().apply(&mut options);
        assert_eq!(options, FillOptions::default());

        let flags = FillFlags {
            fallback: Some("-".to_string()),
            keep_free_text: true,
            abort_on_out_of_range: true,
        };
        flags.apply(&mut options);
        assert_eq!(options.fallback, "-");
        assert_eq!(options.free_text, FreeTextPolicy::Untouched);
        assert_eq!(options.on_out_of_range, OutOfRangePolicy::Abort);
    }

    #[test]
    fn test_override_path() {
        let mut slot = Some(PathBuf::from("from-file"));
        override_path(&mut slot, None);
        assert_eq!(slot, Some(PathBuf::from("from-file")));
        override_path(&mut slot, Some(PathBuf::from("from-flag")));
        assert_eq!(slot, Some(PathBuf::from("from-flag")));
    }
}
