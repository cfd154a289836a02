//! End-to-end fill of one deck: open, read data, plan, expand, fill, save.

use std::path::Path;

use slidefill_data::{DataProvider, DataSet};
use slidefill_pptx::Deck;
use tracing::info;

use crate::error::Result;
use crate::execute::execute;
use crate::mapping::MappingConfig;
use crate::plan::ExpansionPlan;
use crate::report::FillReport;
use crate::settings::FillOptions;

/// Expand and fill a deck in memory
///
/// The returned report carries the mapping's load issues, the planning issues
/// and the fill issues, in that order.
pub fn fill_deck(
    deck: &mut Deck,
    data: &DataSet,
    mapping: &MappingConfig,
    options: &FillOptions,
) -> Result<FillReport> {
    let slides_before = deck.len();
    let plan = ExpansionPlan::for_data(mapping, data, slides_before);
    let items = plan.apply(deck, options.on_out_of_range)?;
    let filled = execute(deck, &items, data, options)?;

    let mut report = FillReport {
        slides_before,
        slides_after: deck.len(),
        items_filled: filled.items_filled,
        runs_rewritten: filled.runs_rewritten,
        issues: Vec::new(),
    };
    report.extend(mapping.issues().iter().cloned());
    report.extend(plan.issues().iter().cloned());
    report.extend(filled.issues);
    Ok(report)
}

/// Fill a template held in memory and write the result to `output`
pub fn process_template(
    template: &[u8],
    output: &Path,
    provider: &dyn DataProvider,
    mapping: &MappingConfig,
    options: &FillOptions,
) -> Result<FillReport> {
    let mut deck = Deck::from_bytes(template)?;
    let data = provider.read_data()?;
    let report = fill_deck(&mut deck, &data, mapping, options)?;
    deck.save(output)?;

    info!(
        data = %provider.describe(),
        output = %output.display(),
        slides = report.slides_after,
        issues = report.issues.len(),
        "wrote deck"
    );
    Ok(report)
}

/// Fill the template file at `template` and write the result to `output`
pub fn process_file(
    template: &Path,
    output: &Path,
    provider: &dyn DataProvider,
    mapping: &MappingConfig,
    options: &FillOptions,
) -> Result<FillReport> {
    let bytes = std::fs::read(template)?;
    process_template(&bytes, output, provider, mapping, options)
}
