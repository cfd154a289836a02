//! Fill plan execution.

use slidefill_data::{DataSet, Row};
use slidefill_pptx::Deck;
use tracing::{debug, warn};

use crate::error::{FillError, Result};
use crate::mapping::FillMode;
use crate::plan::FillPlanItem;
use crate::report::{FillReport, Issue};
use crate::settings::{FillOptions, OutOfRangePolicy};
use crate::substitute::{fill_single, fill_table_rows};

/// Substitute data into every slide named by `items`
///
/// Items are processed in ascending final position. A position outside the
/// deck is reported and skipped, or fails the run under
/// [`OutOfRangePolicy::Abort`]. Tokens without a value are reported once per
/// slide.
pub fn execute(
    deck: &mut Deck,
    items: &[FillPlanItem],
    data: &DataSet,
    options: &FillOptions,
) -> Result<FillReport> {
    let mut ordered = items.to_vec();
    ordered.sort_by_key(|item| item.position);

    let empty = Row::new();
    let len = deck.len();
    let mut report = FillReport::default();

    for item in &ordered {
        let Some(slide) = deck.slide_mut(item.position) else {
            if options.on_out_of_range == OutOfRangePolicy::Abort {
                return Err(FillError::IndexOutOfRange {
                    position: item.position,
                    len,
                });
            }
            let issue = Issue::index_out_of_range(item.position, len);
            warn!("{}", issue);
            report.push(issue);
            continue;
        };

        let rows = data.get(&item.source).map(|table| table.rows()).unwrap_or(&[]);
        let stats = match item.mode {
            FillMode::TableRowFill => fill_table_rows(slide, rows, options),
            FillMode::SingleRowFill => {
                let row = rows.get(item.row_index).unwrap_or(&empty);
                fill_single(slide, row, options)
            }
        };

        debug!(
            position = item.position,
            source = %item.source,
            mode = %item.mode,
            row = item.row_index,
            runs = stats.runs_rewritten,
            "filled slide"
        );

        report.items_filled += 1;
        report.runs_rewritten += stats.runs_rewritten;
        for token in &stats.unresolved {
            report.push(Issue::token_unresolved(token).at(item.position));
        }
    }
    Ok(report)
}
