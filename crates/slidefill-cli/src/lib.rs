//! slidefill CLI - Command-line interface library
//!
//! This library provides the CLI functionality for slidefill, including:
//! - Fill: Generate one deck from a template and a data file
//! - Batch: Generate a deck for every data file in a directory
//! - Plan: Show how a template would be expanded, without writing anything
//!
//! # Library Usage
//!
//! ```ignore
//! use slidefill_cli::{run_cli, fill_command, FillFlags};
//!
//! // Run the full CLI
//! run_cli()?;
//!
//! // Or use individual commands programmatically
//! let report = fill_command(&settings, &template, &data, &mapping, &output)?;
//! ```
//!
//! # Binary Usage
//!
//! ```bash
//! # Fill a single deck
//! slidefill fill --template template.pptx --data orders.xlsx \
//!     --mapping slide_mappings.json --output orders.pptx
//!
//! # Process every workbook in a directory with four workers
//! slidefill batch --input-dir data/ --output-dir out/ --workers 4
//!
//! # Dry run, printing the fill plan as JSON
//! slidefill plan --template template.pptx --data orders.xlsx \
//!     --mapping slide_mappings.json --format json
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{batch_command, fill_command, load_settings, plan_command, render_plan};
pub use app::{run_cli, FillFlags, OutputFormat};
