//! Bracket token substitution inside slide text.
//!
//! A token is `[` followed by any characters other than `]`, then `]`.
//! Tokens are matched inside a single run only, so a run's formatting is
//! never split or merged. Runs without tokens are not touched at all.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use slidefill_data::Row;
use slidefill_pptx::{Slide, TextContainer};

use crate::settings::{FillOptions, FreeTextPolicy};

/// Token pattern: `[`, non-`]` characters, `]`
pub const TOKEN_PATTERN: &str = r"\[[^\]]*\]";

fn token_regex() -> &'static Regex {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE.get_or_init(|| Regex::new(TOKEN_PATTERN).expect("token pattern is valid"))
}

/// Tokens in a piece of text, in order of appearance
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    token_regex().find_iter(text).map(|m| m.as_str())
}

/// Counters from one or more substitutions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionStats {
    /// Runs whose text changed
    pub runs_rewritten: usize,
    /// Tokens that fell back to the fallback literal
    pub unresolved: BTreeSet<String>,
}

impl SubstitutionStats {
    pub fn merge(&mut self, other: SubstitutionStats) {
        self.runs_rewritten += other.runs_rewritten;
        self.unresolved.extend(other.unresolved);
    }
}

/// Replace every token in `text` from `row`
///
/// Returns `None` when the text has no token or the replacement leaves it
/// unchanged.
pub fn substitute_text(
    text: &str,
    row: &Row,
    fallback: &str,
    unresolved: &mut BTreeSet<String>,
) -> Option<String> {
    let regex = token_regex();
    if !regex.is_match(text) {
        return None;
    }
    let replaced = regex.replace_all(text, |caps: &Captures| {
        let token = &caps[0];
        match row.get(token) {
            Some(value) => value.to_string(),
            None => {
                unresolved.insert(token.to_string());
                fallback.to_string()
            }
        }
    });
    (replaced != text).then(|| replaced.into_owned())
}

/// Substitute tokens in every run of one text container
pub fn fill_container(
    slide: &mut Slide,
    container: TextContainer,
    row: &Row,
    fallback: &str,
    stats: &mut SubstitutionStats,
) {
    for run in slide.runs(container) {
        let text = slide.run_text(run);
        if let Some(new_text) = substitute_text(&text, row, fallback, &mut stats.unresolved) {
            slide.set_run_text(run, &new_text);
            stats.runs_rewritten += 1;
        }
    }
}

/// Fill every table cell and every free text container from one row
pub fn fill_single(slide: &mut Slide, row: &Row, options: &FillOptions) -> SubstitutionStats {
    let mut stats = SubstitutionStats::default();
    for table in slide.tables() {
        for cell in table.rows().flatten() {
            if let Some(container) = cell.text_container() {
                fill_container(slide, container, row, &options.fallback, &mut stats);
            }
        }
    }
    for container in slide.text_containers() {
        fill_container(slide, container, row, &options.fallback, &mut stats);
    }
    stats
}

/// Fill table body rows from successive data rows
///
/// The first physical row of each table is a header and stays as authored.
/// Data row `i` goes into physical row `i + 1`; data rows beyond the table's
/// capacity are dropped. Free text containers follow
/// [`FillOptions::free_text`].
pub fn fill_table_rows(slide: &mut Slide, rows: &[Row], options: &FillOptions) -> SubstitutionStats {
    let mut stats = SubstitutionStats::default();
    for table in slide.tables() {
        for (row, cells) in rows.iter().zip(table.rows().skip(1)) {
            for cell in cells {
                if let Some(container) = cell.text_container() {
                    fill_container(slide, container, row, &options.fallback, &mut stats);
                }
            }
        }
    }

    if options.free_text == FreeTextPolicy::FirstRow {
        let empty = Row::new();
        let row = rows.first().unwrap_or(&empty);
        for container in slide.text_containers() {
            fill_container(slide, container, row, &options.fallback, &mut stats);
        }
    }
    stats
}
