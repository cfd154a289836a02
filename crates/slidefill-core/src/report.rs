//! Per-run issue reporting.
//!
//! Non-fatal problems are collected as [`Issue`]s in a [`FillReport`] so one
//! bad mapping entry or token never stops the rest of the deck.

use std::fmt;

use serde::Serialize;

/// Category of a non-fatal problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Unparseable mapping key or value; the entry was skipped
    Config,
    /// Data source missing or without rows; fallback values were used
    DataSourceEmpty,
    /// A slide position outside the deck; the item was skipped
    IndexOutOfRange,
    /// A token had no value in its row; the fallback literal was used
    TokenUnresolved,
}

impl IssueKind {
    /// Stable diagnostic code
    pub fn code(self) -> &'static str {
        match self {
            IssueKind::Config => "FILL001",
            IssueKind::DataSourceEmpty => "FILL002",
            IssueKind::IndexOutOfRange => "FILL003",
            IssueKind::TokenUnresolved => "FILL004",
        }
    }
}

/// One non-fatal problem found while planning or filling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    /// Slide position (nominal for planning issues, final for fill issues)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(IssueKind::Config, message)
    }

    pub fn data_source_empty(source: &str) -> Self {
        Self::new(
            IssueKind::DataSourceEmpty,
            format!("data source '{}' is missing or has no rows", source),
        )
    }

    pub fn index_out_of_range(position: usize, len: usize) -> Self {
        Self::new(
            IssueKind::IndexOutOfRange,
            format!("slide {} is outside the deck ({} slides)", position, len),
        )
        .at(position)
    }

    pub fn token_unresolved(token: &str) -> Self {
        Self::new(
            IssueKind::TokenUnresolved,
            format!("token {} has no value", token),
        )
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "[{}] slide {}: {}", self.code(), position, self.message),
            None => write!(f, "[{}] {}", self.code(), self.message),
        }
    }
}

/// Outcome of filling one deck
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Slide count of the template
    pub slides_before: usize,
    /// Slide count after expansion
    pub slides_after: usize,
    /// Fill plan items executed
    pub items_filled: usize,
    /// Runs whose text changed
    pub runs_rewritten: usize,
    pub issues: Vec<Issue>,
}

impl FillReport {
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = Issue>) {
        self.issues.extend(issues);
    }

    /// Number of issues of one kind
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_codes() {
        assert_eq!(IssueKind::Config.code(), "FILL001");
        assert_eq!(IssueKind::DataSourceEmpty.code(), "FILL002");
        assert_eq!(IssueKind::IndexOutOfRange.code(), "FILL003");
        assert_eq!(IssueKind::TokenUnresolved.code(), "FILL004");
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue::index_out_of_range(7, 4);
        assert_eq!(
            issue.to_string(),
            "[FILL003] slide 7: slide 7 is outside the deck (4 slides)"
        );
        assert_eq!(
            Issue::token_unresolved("[Z]").to_string(),
            "[FILL004] token [Z] has no value"
        );
    }

    #[test]
    fn test_report_counts() {
        let mut report = FillReport::default();
        assert!(report.is_clean());
        report.push(Issue::token_unresolved("[A]"));
        report.extend(vec![Issue::token_unresolved("[B]"), Issue::config("bad key")]);

        assert_eq!(report.count(IssueKind::TokenUnresolved), 2);
        assert_eq!(report.count(IssueKind::Config), 1);
        assert!(!report.is_clean());
    }
}
