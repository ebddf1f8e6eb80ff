//! Report model and the sink interface.
//!
//! The orchestrator talks to presentation only through [`ReportSink`]. The
//! in-memory [`Report`] is the reference sink: rows are created once, start
//! Pending, and move to a terminal state at most once.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;

use crate::registry::RowSpec;
use crate::verdict::{Status, Verdict};

/// Receiver of row events.
///
/// Implementations must tolerate duplicate declarations and resolutions for
/// rows they never saw.
pub trait ReportSink {
    fn declare_row(&mut self, row: &RowSpec);
    fn resolve_row(&mut self, key: &str, verdict: &Verdict);
}

/// Result of [`Report::declare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclareOutcome {
    Declared,
    AlreadyDeclared,
}

/// Result of [`Report::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Applied,
    /// No such row; ignored.
    Undeclared,
    /// Row is already terminal; ignored.
    AlreadyTerminal,
    /// The verdict was Pending; ignored.
    NotTerminal,
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub key: String,
    pub display_name: String,
    pub group: String,
    pub verdict: Verdict,
}

/// Counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub pending: usize,
    pub passed: usize,
    pub flagged: usize,
}

/// Ordered, keyed report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    rows: Vec<ReportRow>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Pending row unless it already exists.
    pub fn declare(&mut self, row: &RowSpec) -> DeclareOutcome {
        if self.index.contains_key(&row.key) {
            log::debug!("Row '{}' already declared", row.key);
            return DeclareOutcome::AlreadyDeclared;
        }
        self.index.insert(row.key.clone(), self.rows.len());
        self.rows.push(ReportRow {
            key: row.key.clone(),
            display_name: row.display_name.clone(),
            group: row.group.clone(),
            verdict: Verdict::pending(),
        });
        DeclareOutcome::Declared
    }

    /// Move a Pending row to a terminal verdict.
    pub fn resolve(&mut self, key: &str, verdict: &Verdict) -> ResolveOutcome {
        if !verdict.is_terminal() {
            return ResolveOutcome::NotTerminal;
        }
        let Some(&position) = self.index.get(key) else {
            log::warn!("Ignoring verdict for undeclared row '{}'", key);
            return ResolveOutcome::Undeclared;
        };
        let row = &mut self.rows[position];
        if row.verdict.is_terminal() {
            log::warn!(
                "Ignoring second verdict for row '{}' (already {})",
                key,
                row.verdict.status().label()
            );
            return ResolveOutcome::AlreadyTerminal;
        }
        row.verdict = verdict.clone();
        ResolveOutcome::Applied
    }

    pub fn get(&self, key: &str) -> Option<&ReportRow> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    pub fn status(&self, key: &str) -> Option<Status> {
        self.get(key).map(|row| row.verdict.status())
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn rows_in_group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a ReportRow> + 'a {
        self.rows.iter().filter(move |row| row.group == group)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            total: self.rows.len(),
            ..ReportSummary::default()
        };
        for row in &self.rows {
            match row.verdict.status() {
                Status::Pending => summary.pending += 1,
                Status::Pass => summary.passed += 1,
                Status::Flagged => summary.flagged += 1,
            }
        }
        summary
    }

    /// True once every declared row is terminal.
    pub fn is_complete(&self) -> bool {
        self.rows.iter().all(|row| row.verdict.is_terminal())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ReportSink for Report {
    fn declare_row(&mut self, row: &RowSpec) {
        self.declare(row);
    }

    fn resolve_row(&mut self, key: &str, verdict: &Verdict) {
        self.resolve(key, verdict);
    }
}

/// A recorded sink event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    RowDeclared(RowSpec),
    RowResolved { key: String, verdict: Verdict },
}

/// Records every event in arrival order.
impl ReportSink for Vec<ReportEvent> {
    fn declare_row(&mut self, row: &RowSpec) {
        self.push(ReportEvent::RowDeclared(row.clone()));
    }

    fn resolve_row(&mut self, key: &str, verdict: &Verdict) {
        self.push(ReportEvent::RowResolved {
            key: key.to_string(),
            verdict: verdict.clone(),
        });
    }
}

/// Shared sinks, so a caller can inspect state while a run is in flight.
impl<S: ReportSink + ?Sized> ReportSink for Rc<RefCell<S>> {
    fn declare_row(&mut self, row: &RowSpec) {
        self.borrow_mut().declare_row(row);
    }

    fn resolve_row(&mut self, key: &str, verdict: &Verdict) {
        self.borrow_mut().resolve_row(key, verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str) -> RowSpec {
        RowSpec {
            key: key.to_string(),
            display_name: format!("Row {}", key),
            group: "browser".to_string(),
        }
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut report = Report::new();
        assert_eq!(report.declare(&row("a")), DeclareOutcome::Declared);
        assert_eq!(report.declare(&row("a")), DeclareOutcome::AlreadyDeclared);
        assert_eq!(report.len(), 1);
        assert_eq!(report.status("a"), Some(Status::Pending));
    }

    #[test]
    fn test_second_resolution_is_a_no_op() {
        let mut report = Report::new();
        report.declare(&row("a"));

        assert_eq!(report.resolve("a", &Verdict::pass("first")), ResolveOutcome::Applied);
        assert_eq!(
            report.resolve("a", &Verdict::flagged("second")),
            ResolveOutcome::AlreadyTerminal
        );

        let stored = &report.get("a").unwrap().verdict;
        assert_eq!(stored.status(), Status::Pass);
        assert_eq!(stored.detail(), "first");
    }

    #[test]
    fn test_undeclared_and_pending_resolutions_ignored() {
        let mut report = Report::new();
        report.declare(&row("a"));

        assert_eq!(report.resolve("ghost", &Verdict::pass("x")), ResolveOutcome::Undeclared);
        assert_eq!(report.resolve("a", &Verdict::pending()), ResolveOutcome::NotTerminal);
        assert!(report.get("ghost").is_none());
        assert_eq!(report.status("a"), Some(Status::Pending));
    }

    #[test]
    fn test_summary_and_completion() {
        let mut report = Report::new();
        for key in ["a", "b", "c"] {
            report.declare(&row(key));
        }
        report.resolve("a", &Verdict::pass("ok"));
        report.resolve("b", &Verdict::flagged("bad"));

        assert_eq!(
            report.summary(),
            ReportSummary {
                total: 3,
                pending: 1,
                passed: 1,
                flagged: 1
            }
        );
        assert!(!report.is_complete());

        report.resolve("c", &Verdict::pass("ok"));
        assert!(report.is_complete());
        assert_eq!(report.rows_in_group("browser").count(), 3);
        assert_eq!(report.rows_in_group("network").count(), 0);
    }

    #[test]
    fn test_json_export_keeps_order() {
        let mut report = Report::new();
        report.declare(&row("z"));
        report.declare(&row("a"));
        report.resolve("a", &Verdict::flagged("odd"));

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows[0]["key"], "z");
        assert_eq!(rows[0]["verdict"]["status"], "pending");
        assert_eq!(rows[1]["verdict"]["status"], "flagged");
        assert_eq!(rows[1]["verdict"]["detail"], "odd");
    }

    #[test]
    fn test_shared_sink_forwards() {
        let shared = Rc::new(RefCell::new(Report::new()));
        let mut sink = shared.clone();
        sink.declare_row(&row("a"));
        sink.resolve_row("a", &Verdict::pass("ok"));
        assert_eq!(shared.borrow().status("a"), Some(Status::Pass));
    }
}
