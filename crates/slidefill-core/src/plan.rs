//! Expansion planning.
//!
//! Planning is split in two phases. [`ExpansionPlan::compute`] is pure: from
//! the mapping, the row count of each data table and the template size it
//! works out how many copies every template slide needs and where each
//! template slide ends up once all earlier copies are inserted.
//! [`ExpansionPlan::apply`] then performs the copies on a deck and emits the
//! fill plan.

use serde::Serialize;
use slidefill_data::DataSet;
use slidefill_pptx::{cloner, Deck};
use tracing::{debug, warn};

use crate::error::{FillError, Result};
use crate::mapping::{FillMode, MappingConfig};
use crate::report::{Issue, IssueKind};
use crate::settings::OutOfRangePolicy;

/// One slide to fill: final position, data source and row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillPlanItem {
    /// 1-based position in the expanded deck
    pub position: usize,
    pub source: String,
    pub mode: FillMode,
    /// 0-based row of the source table
    pub row_index: usize,
}

/// Planning outcome for one mapping entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedEntry {
    /// Template position from the mapping
    pub nominal: usize,
    /// Position after earlier entries have been expanded
    pub real: usize,
    pub source: String,
    pub mode: FillMode,
    /// Rows in the source table
    pub rows: usize,
    /// Copies inserted after the template slide
    pub copies: usize,
}

impl PlannedEntry {
    /// Slides this entry occupies after expansion
    pub fn span(&self) -> usize {
        self.copies + 1
    }
}

/// Copies and final positions for every mapped template slide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionPlan {
    deck_len: usize,
    entries: Vec<PlannedEntry>,
    issues: Vec<Issue>,
}

impl ExpansionPlan {
    /// Plan against a data set
    pub fn for_data(mapping: &MappingConfig, data: &DataSet, deck_len: usize) -> Self {
        Self::compute(mapping, |source| data.row_count(source), deck_len)
    }

    /// Plan from row counts alone
    ///
    /// Entries are visited in ascending template position. An entry whose
    /// position is outside `[1, deck_len]` is left out of the plan and
    /// recorded as an out-of-range issue; it shifts nothing.
    pub fn compute<F>(mapping: &MappingConfig, row_count: F, deck_len: usize) -> Self
    where
        F: Fn(&str) -> usize,
    {
        let mut plan = Self {
            deck_len,
            ..Self::default()
        };
        let mut shift = 0;

        for (position, entry) in mapping.iter() {
            let nominal = position.get() as usize;
            if nominal > deck_len {
                plan.issues.push(Issue::index_out_of_range(nominal, deck_len));
                continue;
            }

            let rows = row_count(&entry.source);
            if rows == 0 {
                plan.issues
                    .push(Issue::data_source_empty(&entry.source).at(nominal));
            }
            let copies = if entry.expand && rows > 1 { rows - 1 } else { 0 };

            plan.entries.push(PlannedEntry {
                nominal,
                real: nominal + shift,
                source: entry.source.clone(),
                mode: entry.mode,
                rows,
                copies,
            });
            shift += copies;
        }
        plan
    }

    /// Final position of a template position
    ///
    /// Each expanded entry strictly before `nominal` pushes it back by its
    /// copy count.
    pub fn remap(&self, nominal: usize) -> usize {
        nominal
            + self
                .entries
                .iter()
                .filter(|entry| entry.nominal < nominal)
                .map(|entry| entry.copies)
                .sum::<usize>()
    }

    pub fn entries(&self) -> &[PlannedEntry] {
        &self.entries
    }

    /// Issues found while planning
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Slide count of the template this plan was computed for
    pub fn deck_len(&self) -> usize {
        self.deck_len
    }

    /// Slide count once every copy is inserted
    pub fn expanded_len(&self) -> usize {
        self.deck_len + self.entries.iter().map(|entry| entry.copies).sum::<usize>()
    }

    /// Fill items in ascending final position
    pub fn items(&self) -> Vec<FillPlanItem> {
        self.entries
            .iter()
            .flat_map(|entry| {
                (0..entry.span()).map(move |offset| FillPlanItem {
                    position: entry.real + offset,
                    source: entry.source.clone(),
                    mode: entry.mode,
                    row_index: offset,
                })
            })
            .collect()
    }

    /// Fail under [`OutOfRangePolicy::Abort`] if any position was out of range
    pub fn check(&self, policy: OutOfRangePolicy) -> Result<()> {
        if policy == OutOfRangePolicy::Abort {
            if let Some(issue) = self
                .issues
                .iter()
                .find(|issue| issue.kind == IssueKind::IndexOutOfRange)
            {
                return Err(FillError::IndexOutOfRange {
                    position: issue.position.unwrap_or_default(),
                    len: self.deck_len,
                });
            }
        }
        Ok(())
    }

    /// Insert the planned copies into `deck` and return the fill items
    ///
    /// The deck must be the one the plan was computed for. Copies are made
    /// in ascending template order, so every entry is found at its
    /// [`PlannedEntry::real`] position when its turn comes.
    pub fn apply(&self, deck: &mut Deck, policy: OutOfRangePolicy) -> Result<Vec<FillPlanItem>> {
        self.check(policy)?;
        if deck.len() != self.deck_len {
            return Err(FillError::config(format!(
                "plan computed for {} slides, deck has {}",
                self.deck_len,
                deck.len()
            )));
        }

        for entry in self.entries.iter().filter(|entry| entry.copies > 0) {
            debug!(
                nominal = entry.nominal,
                real = entry.real,
                copies = entry.copies,
                source = %entry.source,
                "expanding slide"
            );
            cloner::duplicate(deck, entry.real, entry.copies)?;
        }

        for issue in &self.issues {
            warn!("{}", issue);
        }
        Ok(self.items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingEntry;
    use std::collections::HashMap;
    use std::num::NonZeroU32;

    fn mapping(entries: &[(u32, &str, FillMode, bool)]) -> MappingConfig {
        let mut config = MappingConfig::new();
        for (position, source, mode, expand) in entries {
            config.insert(
                NonZeroU32::new(*position).unwrap(),
                MappingEntry::new(*source, *mode, *expand),
            );
        }
        config
    }

    fn counts(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn plan(config: &MappingConfig, rows: &HashMap<String, usize>, len: usize) -> ExpansionPlan {
        ExpansionPlan::compute(config, |s| rows.get(s).copied().unwrap_or(0), len)
    }

    #[test]
    fn test_no_expand_single_item() {
        let config = mapping(&[(2, "S", FillMode::SingleRowFill, false)]);
        let plan = plan(&config, &counts(&[("S", 5)]), 4);

        assert_eq!(
            plan.items(),
            vec![FillPlanItem {
                position: 2,
                source: "S".to_string(),
                mode: FillMode::SingleRowFill,
                row_index: 0,
            }]
        );
        assert_eq!(plan.expanded_len(), 4);
    }

    #[test]
    fn test_single_row_needs_no_copy() {
        let config = mapping(&[(1, "S", FillMode::SingleRowFill, true)]);
        let plan = plan(&config, &counts(&[("S", 1)]), 3);
        assert_eq!(plan.entries()[0].copies, 0);
        assert_eq!(plan.items().len(), 1);
    }

    #[test]
    fn test_expansion_shifts_later_entries() {
        let config = mapping(&[
            (2, "A", FillMode::SingleRowFill, true),
            (3, "B", FillMode::TableRowFill, false),
            (5, "C", FillMode::SingleRowFill, true),
        ]);
        let plan = plan(&config, &counts(&[("A", 3), ("B", 4), ("C", 2)]), 6);

        let reals: Vec<_> = plan.entries().iter().map(|e| e.real).collect();
        assert_eq!(reals, vec![2, 5, 7]);
        assert_eq!(plan.expanded_len(), 9);

        let positions: Vec<_> = plan.items().iter().map(|i| (i.position, i.row_index)).collect();
        assert_eq!(
            positions,
            vec![(2, 0), (3, 1), (4, 2), (5, 0), (7, 0), (8, 1)]
        );
    }

    #[test]
    fn test_remap() {
        let config = mapping(&[
            (2, "A", FillMode::SingleRowFill, true),
            (4, "B", FillMode::SingleRowFill, true),
        ]);
        let plan = plan(&config, &counts(&[("A", 3), ("B", 2)]), 5);

        assert_eq!(plan.remap(1), 1);
        assert_eq!(plan.remap(2), 2);
        assert_eq!(plan.remap(3), 5);
        assert_eq!(plan.remap(4), 6);
        assert_eq!(plan.remap(5), 8);
    }

    #[test]
    fn test_missing_source_is_reported() {
        let config = mapping(&[(1, "Nope", FillMode::SingleRowFill, true)]);
        let plan = plan(&config, &counts(&[]), 2);

        assert_eq!(plan.items().len(), 1);
        assert_eq!(plan.items()[0].row_index, 0);
        assert_eq!(plan.issues()[0].kind, IssueKind::DataSourceEmpty);
        assert_eq!(plan.issues()[0].position, Some(1));
    }

    #[test]
    fn test_out_of_range_entry_is_skipped() {
        let config = mapping(&[
            (2, "A", FillMode::SingleRowFill, true),
            (9, "B", FillMode::SingleRowFill, true),
        ]);
        let plan = plan(&config, &counts(&[("A", 2), ("B", 3)]), 3);

        assert_eq!(plan.entries().len(), 1);
        assert_eq!(plan.expanded_len(), 4);
        assert_eq!(plan.issues()[0].kind, IssueKind::IndexOutOfRange);
        assert!(plan.check(OutOfRangePolicy::Skip).is_ok());
        assert!(matches!(
            plan.check(OutOfRangePolicy::Abort),
            Err(FillError::IndexOutOfRange { position: 9, len: 3 })
        ));
    }
}
