//! # slidefill-core
//!
//! Turns a PowerPoint template and tabular data into filled decks.
//!
//! A mapping file names, for each template slide, the data table that feeds
//! it and how:
//!
//! - `row_for_page`: one row per slide; with `copy` the slide is duplicated
//!   so every row gets its own slide
//! - `row_for_table_row`: successive rows fill successive body rows of the
//!   slide's tables
//!
//! Bracket tokens (`[A]`, `[B]`, ...) in text runs and table cells are
//! replaced with the row's values. Tokens without a value become the
//! configured fallback.
//!
//! ## Example
//!
//! ```no_run
//! use slidefill_core::{process_file, FillOptions, MappingConfig};
//!
//! let mapping = MappingConfig::load("slide_mappings.json")?;
//! let provider = slidefill_data::open_provider("orders.xlsx")?;
//! let report = process_file(
//!     "template.pptx".as_ref(),
//!     "orders.pptx".as_ref(),
//!     provider.as_ref(),
//!     &mapping,
//!     &FillOptions::default(),
//! )?;
//! for issue in &report.issues {
//!     eprintln!("{}", issue);
//! }
//! # Ok::<(), slidefill_core::FillError>(())
//! ```

pub mod batch;
pub mod error;
pub mod execute;
pub mod mapping;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod settings;
pub mod substitute;

pub use batch::{
    discover_inputs, run_batch, BatchConfig, BatchReport, UnitOutcome, UnitResult,
};
pub use error::{FillError, Result};
pub use execute::execute;
pub use mapping::{FillMode, MappingConfig, MappingEntry};
pub use pipeline::{fill_deck, process_file, process_template};
pub use plan::{ExpansionPlan, FillPlanItem, PlannedEntry};
pub use report::{FillReport, Issue, IssueKind};
pub use settings::{BatchSettings, FillOptions, FreeTextPolicy, OutOfRangePolicy, Settings};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
