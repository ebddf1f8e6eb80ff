//! Concurrent probe orchestration
//!
//! ## Protocol
//!
//! ```text
//! registry.rows() ──► sink.declare_row()  (all rows, synchronously)
//!        │
//!        ▼
//! join_all(probe₁ … probeₙ)               (fan-out, every probe starts on first poll)
//!        │  each probe, as soon as it settles:
//!        │    normalize(outcome) ──► sink.resolve_row()  (brief borrow, no await held)
//!        ▼
//! RunSummary                               (fan-in)
//! ```
//!
//! A probe failure (error, timeout, wrong result shape) is absorbed and turned
//! into Flagged rows for that probe only. The sink is updated per probe, so
//! a hung probe only delays its own rows and the final join.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{join_all, select, Either, LocalBoxFuture};
use serde::Serialize;
use web_time::Instant;

use crate::config::{CheckConfig, MissingSubKeyPolicy};
use crate::error::ProbeError;
use crate::probe::{ProbeOutcome, ProbeResult};
use crate::registry::{ProbeDescriptor, ProbeRegistry, ProbeShape};
use crate::report::ReportSink;
use crate::verdict::{Status, Verdict};

/// Detail of a row whose probe failed.
pub const PROBE_ERROR_DETAIL: &str = "Error during check.";

/// Detail of a declared sub-key the probe did not report.
pub const INCOMPLETE_DETAIL: &str = "No result was reported for this check.";

/// Platform-provided sleep, used only for probe timeouts.
pub trait Timer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Per-probe timeout. Only enforced when a [`Timer`] is attached.
    pub probe_timeout: Option<Duration>,
    pub missing_sub_keys: MissingSubKeyPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            probe_timeout: None,
            missing_sub_keys: MissingSubKeyPolicy::default(),
        }
    }
}

impl From<&CheckConfig> for OrchestratorConfig {
    fn from(config: &CheckConfig) -> Self {
        Self {
            probe_timeout: config.probe_timeout(),
            missing_sub_keys: config.missing_sub_keys,
        }
    }
}

/// How one probe ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Resolved,
    Partial { missing: usize },
    Failed,
    TimedOut,
}

/// Per-probe bookkeeping fed into the summary.
#[derive(Debug)]
struct ProbeRun {
    disposition: Disposition,
    resolved: usize,
    passed: usize,
    flagged: usize,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub probes: usize,
    pub rows: usize,
    pub resolved: usize,
    pub pending: usize,
    pub passed: usize,
    pub flagged: usize,
    pub failed_probes: usize,
    pub timed_out_probes: usize,
    pub partial_probes: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    fn record(&mut self, run: &ProbeRun) {
        self.resolved += run.resolved;
        self.passed += run.passed;
        self.flagged += run.flagged;
        match run.disposition {
            Disposition::Resolved => {}
            Disposition::Partial { .. } => self.partial_probes += 1,
            Disposition::Failed => self.failed_probes += 1,
            Disposition::TimedOut => self.timed_out_probes += 1,
        }
    }

    /// True when every declared row reached a terminal verdict.
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

/// Runs every registered probe concurrently and reports into a sink.
pub struct Orchestrator {
    config: OrchestratorConfig,
    timer: Option<Rc<dyn Timer>>,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config, timer: None }
    }

    /// Attach the timer used to enforce `probe_timeout`.
    pub fn with_timer(mut self, timer: Rc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run all probes once.
    ///
    /// Every row is declared before the first probe is polled. The returned
    /// future completes when every probe has settled.
    pub async fn run(&self, registry: &ProbeRegistry, sink: &mut dyn ReportSink) -> RunSummary {
        let started = Instant::now();
        let rows = registry.rows();

        log::info!(
            "Starting integrity check: {} probes, {} rows",
            registry.len(),
            rows.len()
        );

        for row in &rows {
            sink.declare_row(row);
        }

        let sink = RefCell::new(sink);
        let runs = join_all(
            registry
                .descriptors()
                .iter()
                .map(|descriptor| self.run_probe(descriptor, &sink)),
        )
        .await;

        let mut summary = RunSummary {
            probes: registry.len(),
            rows: rows.len(),
            ..RunSummary::default()
        };
        for run in &runs {
            summary.record(run);
        }
        summary.pending = summary.rows.saturating_sub(summary.resolved);
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        log::info!(
            "Integrity check complete in {} ms: {} clear, {} flagged, {} pending \
             ({} failed, {} timed out)",
            summary.elapsed_ms,
            summary.passed,
            summary.flagged,
            summary.pending,
            summary.failed_probes,
            summary.timed_out_probes
        );

        summary
    }

    async fn run_probe(
        &self,
        descriptor: &ProbeDescriptor,
        sink: &RefCell<&mut dyn ReportSink>,
    ) -> ProbeRun {
        let started = Instant::now();
        let result = self.invoke(descriptor).await;
        log::debug!(
            "Probe '{}' settled in {} ms",
            descriptor.key(),
            started.elapsed().as_millis()
        );

        let (resolutions, disposition) = self.normalize(descriptor, result);

        // Emitted together under one short borrow; nothing is awaited here.
        {
            let mut sink = sink.borrow_mut();
            for (key, verdict) in &resolutions {
                sink.resolve_row(key, verdict);
            }
        }

        let count = |status: Status| {
            resolutions
                .iter()
                .filter(|(_, verdict)| verdict.status() == status)
                .count()
        };
        ProbeRun {
            disposition,
            resolved: resolutions.len(),
            passed: count(Status::Pass),
            flagged: count(Status::Flagged),
        }
    }

    async fn invoke(&self, descriptor: &ProbeDescriptor) -> ProbeResult {
        let invocation = descriptor.probe().invoke();

        let (Some(limit), Some(timer)) = (self.config.probe_timeout, self.timer.as_ref()) else {
            return invocation.await;
        };

        match select(invocation, timer.sleep(limit)).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => Err(ProbeError::TimedOut {
                after_ms: limit.as_millis() as u64,
            }),
        }
    }

    /// Map a probe result onto the descriptor's declared rows.
    fn normalize(
        &self,
        descriptor: &ProbeDescriptor,
        result: ProbeResult,
    ) -> (Vec<(String, Verdict)>, Disposition) {
        match (descriptor.shape(), result) {
            (ProbeShape::Single, Ok(ProbeOutcome::Single(verdict))) => {
                let key = descriptor.key();
                if verdict.is_terminal() {
                    return (vec![(key.to_string(), verdict)], Disposition::Resolved);
                }
                log::warn!("Probe '{}' reported a Pending verdict", key);
                let resolutions = self.unreported(key).into_iter().collect();
                (resolutions, Disposition::Partial { missing: 1 })
            }
            (ProbeShape::Multi(sub_rows), Ok(ProbeOutcome::Multi(mut verdicts))) => {
                let mut resolutions = Vec::with_capacity(sub_rows.len());
                let mut missing = 0;

                for sub_row in sub_rows {
                    match verdicts.remove(&sub_row.key) {
                        Some(verdict) if verdict.is_terminal() => {
                            resolutions.push((sub_row.key.clone(), verdict))
                        }
                        reported => {
                            missing += 1;
                            if reported.is_some() {
                                log::warn!(
                                    "Probe '{}' reported a Pending verdict for '{}'",
                                    descriptor.key(),
                                    sub_row.key
                                );
                            } else {
                                log::warn!(
                                    "Probe '{}' did not report declared row '{}'",
                                    descriptor.key(),
                                    sub_row.key
                                );
                            }
                            resolutions.extend(self.unreported(&sub_row.key));
                        }
                    }
                }

                for extra in verdicts.keys() {
                    log::warn!(
                        "Dropping undeclared row '{}' reported by probe '{}'",
                        extra,
                        descriptor.key()
                    );
                }

                let disposition = if missing > 0 {
                    Disposition::Partial { missing }
                } else {
                    Disposition::Resolved
                };
                (resolutions, disposition)
            }
            (shape, Ok(outcome)) => {
                let error = ProbeError::ShapeMismatch {
                    expected: shape.name(),
                    got: outcome.shape_name(),
                };
                self.failure(descriptor, &error)
            }
            (_, Err(error)) => self.failure(descriptor, &error),
        }
    }

    /// Resolution for a declared row that got no terminal verdict.
    fn unreported(&self, key: &str) -> Option<(String, Verdict)> {
        match self.config.missing_sub_keys {
            MissingSubKeyPolicy::FlagIncomplete => {
                Some((key.to_string(), Verdict::flagged(INCOMPLETE_DETAIL)))
            }
            MissingSubKeyPolicy::LeavePending => None,
        }
    }

    fn failure(
        &self,
        descriptor: &ProbeDescriptor,
        error: &ProbeError,
    ) -> (Vec<(String, Verdict)>, Disposition) {
        log::error!("Error in check {}: {}", descriptor.display_name(), error);

        let (detail, disposition) = match error {
            ProbeError::TimedOut { after_ms } => (
                format!("Check timed out after {} ms.", after_ms),
                Disposition::TimedOut,
            ),
            _ => (PROBE_ERROR_DETAIL.to_string(), Disposition::Failed),
        };

        let resolutions = descriptor
            .row_keys()
            .into_iter()
            .map(|key| (key.to_string(), Verdict::flagged(detail.clone())))
            .collect();
        (resolutions, disposition)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::probe_fn;
    use crate::registry::SubRow;
    use crate::report::{Report, ReportEvent};
    use crate::signals::{SignalCounters, SignalKind, WindowFocusProbe};
    use futures::executor::block_on;
    use futures::task::noop_waker;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Stays pending for `remaining` polls, waking itself each time.
    /// Stands in for a timer in a single-threaded executor.
    struct Yields {
        remaining: usize,
    }

    impl Future for Yields {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.remaining == 0 {
                return Poll::Ready(());
            }
            self.remaining -= 1;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    fn yields(n: usize) -> Yields {
        Yields { remaining: n }
    }

    /// Treats every millisecond as one scheduler turn.
    struct TurnTimer;

    impl Timer for TurnTimer {
        fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
            Box::pin(yields(duration.as_millis() as usize))
        }
    }

    fn delayed_pass(turns: usize, detail: &'static str) -> impl crate::probe::Probe {
        probe_fn(move || async move {
            yields(turns).await;
            Ok(ProbeOutcome::single(Verdict::pass(detail)))
        })
    }

    fn failing() -> impl crate::probe::Probe {
        probe_fn(|| async { Err(ProbeError::Js("TypeError: gl is null".into())) })
    }

    fn media_rows() -> Vec<SubRow> {
        vec![SubRow::new("x", "Sub X"), SubRow::new("y", "Sub Y")]
    }

    fn run(orchestrator: &Orchestrator, registry: &ProbeRegistry) -> (Report, RunSummary) {
        let mut report = Report::new();
        let summary = block_on(orchestrator.run(registry, &mut report));
        (report, summary)
    }

    #[test]
    fn test_end_to_end_scenario() {
        let registry = ProbeRegistry::builder()
            .single("A", "Probe A", "g", delayed_pass(0, "fine"))
            .single("B", "Probe B", "g", failing())
            .multi(
                "C",
                "Probe C",
                "g",
                media_rows(),
                probe_fn(|| async {
                    Ok(ProbeOutcome::multi([
                        ("x", Verdict::pass("x ok")),
                        ("y", Verdict::flagged("y odd")),
                    ]))
                }),
            )
            .build()
            .unwrap();

        let (report, summary) = run(&Orchestrator::default(), &registry);

        assert_eq!(report.status("A"), Some(Status::Pass));
        assert_eq!(report.status("B"), Some(Status::Flagged));
        assert_eq!(report.get("B").unwrap().verdict.detail(), PROBE_ERROR_DETAIL);
        assert_eq!(report.status("x"), Some(Status::Pass));
        assert_eq!(report.status("y"), Some(Status::Flagged));
        assert!(report.get("C").is_none(), "multi descriptor key is not a row");

        assert_eq!(summary.probes, 3);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.resolved, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.flagged, 2);
        assert_eq!(summary.failed_probes, 1);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_failure_is_isolated() {
        let mut builder = ProbeRegistry::builder().single("bad", "Bad", "g", failing());
        for i in 0..5 {
            builder = builder.single(format!("ok-{}", i), "Fine", "g", delayed_pass(i, "clear"));
        }
        let registry = builder.build().unwrap();

        let (report, summary) = run(&Orchestrator::default(), &registry);

        assert_eq!(report.status("bad"), Some(Status::Flagged));
        for i in 0..5 {
            let row = report.get(&format!("ok-{}", i)).unwrap();
            assert_eq!(row.verdict, Verdict::pass("clear"));
        }
        assert_eq!(summary.failed_probes, 1);
        assert_eq!(summary.passed, 5);
    }

    #[test]
    fn test_failing_multi_probe_flags_every_sub_row() {
        let registry = ProbeRegistry::builder()
            .multi("media", "Media", "hardware", media_rows(), failing())
            .build()
            .unwrap();

        let (report, _) = run(&Orchestrator::default(), &registry);

        for key in ["x", "y"] {
            let verdict = &report.get(key).unwrap().verdict;
            assert_eq!(verdict.status(), Status::Flagged);
            assert_eq!(verdict.detail(), PROBE_ERROR_DETAIL);
        }
    }

    #[test]
    fn test_all_rows_declared_before_any_resolution() {
        let registry = ProbeRegistry::builder()
            .single("fast", "Fast", "g", delayed_pass(0, "now"))
            .multi("media", "Media", "g", media_rows(), failing())
            .single("slow", "Slow", "g", delayed_pass(3, "later"))
            .build()
            .unwrap();

        let mut events: Vec<ReportEvent> = Vec::new();
        block_on(Orchestrator::default().run(&registry, &mut events));

        let first_resolution = events
            .iter()
            .position(|e| matches!(e, ReportEvent::RowResolved { .. }))
            .unwrap();
        let declared: Vec<&str> = events[..first_resolution]
            .iter()
            .map(|e| match e {
                ReportEvent::RowDeclared(row) => row.key.as_str(),
                ReportEvent::RowResolved { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(declared, vec!["fast", "x", "y", "slow"]);
        assert!(events[first_resolution..]
            .iter()
            .all(|e| matches!(e, ReportEvent::RowResolved { .. })));
    }

    #[test]
    fn test_rows_pending_while_probes_in_flight() {
        let registry = ProbeRegistry::builder()
            .single("quick", "Quick", "g", delayed_pass(0, "done"))
            .single("hung", "Hung", "g", probe_fn(|| futures::future::pending::<ProbeResult>()))
            .multi(
                "media",
                "Media",
                "g",
                media_rows(),
                probe_fn(|| async {
                    yields(2).await;
                    Ok(ProbeOutcome::multi([("x", Verdict::pass("a")), ("y", Verdict::pass("b"))]))
                }),
            )
            .build()
            .unwrap();

        let shared = Rc::new(RefCell::new(Report::new()));
        let mut sink = shared.clone();
        let orchestrator = Orchestrator::default();
        let mut run = Box::pin(orchestrator.run(&registry, &mut sink));

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        assert!(run.as_mut().poll(&mut cx).is_pending());

        {
            let report = shared.borrow();
            assert_eq!(report.len(), 4);
            assert_eq!(report.status("quick"), Some(Status::Pass));
            assert_eq!(report.status("hung"), Some(Status::Pending));
            assert_eq!(report.status("x"), Some(Status::Pending));
            assert_eq!(report.status("y"), Some(Status::Pending));
        }

        for _ in 0..5 {
            assert!(run.as_mut().poll(&mut cx).is_pending());
        }

        let report = shared.borrow();
        assert_eq!(report.status("x"), Some(Status::Pass));
        assert_eq!(report.status("y"), Some(Status::Pass));
        assert_eq!(report.status("hung"), Some(Status::Pending));
    }

    #[test]
    fn test_timeout_flags_hung_probe() {
        let registry = ProbeRegistry::builder()
            .single("hung", "Hung", "g", probe_fn(|| futures::future::pending::<ProbeResult>()))
            .single("ok", "Ok", "g", delayed_pass(1, "fine"))
            .build()
            .unwrap();

        let orchestrator = Orchestrator::new(OrchestratorConfig {
            probe_timeout: Some(Duration::from_millis(5)),
            ..OrchestratorConfig::default()
        })
        .with_timer(Rc::new(TurnTimer));

        let (report, summary) = run(&orchestrator, &registry);

        let hung = &report.get("hung").unwrap().verdict;
        assert_eq!(hung.status(), Status::Flagged);
        assert_eq!(hung.detail(), "Check timed out after 5 ms.");
        assert_eq!(report.status("ok"), Some(Status::Pass));
        assert_eq!(summary.timed_out_probes, 1);
        assert_eq!(summary.failed_probes, 0);
    }

    #[test]
    fn test_timeout_ignored_without_timer() {
        let orchestrator = Orchestrator::new(OrchestratorConfig {
            probe_timeout: Some(Duration::from_millis(1)),
            ..OrchestratorConfig::default()
        });
        let registry = ProbeRegistry::builder()
            .single("slow", "Slow", "g", delayed_pass(10, "eventually"))
            .build()
            .unwrap();

        let (report, _) = run(&orchestrator, &registry);
        assert_eq!(report.status("slow"), Some(Status::Pass));
    }

    #[test]
    fn test_multi_verdict_details_do_not_mix() {
        let registry = ProbeRegistry::builder()
            .multi(
                "media",
                "Media",
                "hardware",
                media_rows(),
                probe_fn(|| async {
                    Ok(ProbeOutcome::multi([
                        ("x", Verdict::pass("[1] Integrated Camera")),
                        ("y", Verdict::flagged("[1] OBS Virtual Mic")),
                    ]))
                }),
            )
            .build()
            .unwrap();

        let (report, _) = run(&Orchestrator::default(), &registry);

        assert_eq!(report.get("x").unwrap().verdict, Verdict::pass("[1] Integrated Camera"));
        assert_eq!(report.get("y").unwrap().verdict, Verdict::flagged("[1] OBS Virtual Mic"));
    }

    fn partial_registry() -> ProbeRegistry {
        ProbeRegistry::builder()
            .multi(
                "media",
                "Media",
                "hardware",
                media_rows(),
                probe_fn(|| async {
                    Ok(ProbeOutcome::multi([
                        ("x", Verdict::pass("only x")),
                        ("z", Verdict::pass("never declared")),
                    ]))
                }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_partial_multi_verdict_flagged_incomplete() {
        let (report, summary) = run(&Orchestrator::default(), &partial_registry());

        assert_eq!(report.status("x"), Some(Status::Pass));
        let y = &report.get("y").unwrap().verdict;
        assert_eq!(y.status(), Status::Flagged);
        assert_eq!(y.detail(), INCOMPLETE_DETAIL);
        assert!(report.get("z").is_none());
        assert_eq!(summary.partial_probes, 1);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_partial_multi_verdict_left_pending() {
        let orchestrator = Orchestrator::new(OrchestratorConfig {
            missing_sub_keys: MissingSubKeyPolicy::LeavePending,
            ..OrchestratorConfig::default()
        });

        let (report, summary) = run(&orchestrator, &partial_registry());

        assert_eq!(report.status("x"), Some(Status::Pass));
        assert_eq!(report.status("y"), Some(Status::Pending));
        assert!(report.get("z").is_none());
        assert_eq!(summary.pending, 1);
        assert!(!summary.is_complete());
        assert!(!report.is_complete());
    }

    fn pending_registry() -> ProbeRegistry {
        ProbeRegistry::builder()
            .multi(
                "media",
                "Media",
                "hardware",
                media_rows(),
                probe_fn(|| async {
                    Ok(ProbeOutcome::multi([
                        ("x", Verdict::pass("x ok")),
                        ("y", Verdict::pending()),
                    ]))
                }),
            )
            .single(
                "undecided",
                "Undecided",
                "g",
                probe_fn(|| async { Ok(ProbeOutcome::single(Verdict::pending())) }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_pending_verdicts_flagged_incomplete() {
        let (report, summary) = run(&Orchestrator::default(), &pending_registry());

        assert_eq!(report.status("x"), Some(Status::Pass));
        for key in ["y", "undecided"] {
            let verdict = &report.get(key).unwrap().verdict;
            assert_eq!(verdict.status(), Status::Flagged);
            assert_eq!(verdict.detail(), INCOMPLETE_DETAIL);
        }
        assert_eq!(summary.partial_probes, 2);
        assert_eq!(summary.pending, 0);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_pending_verdicts_left_pending() {
        let orchestrator = Orchestrator::new(OrchestratorConfig {
            missing_sub_keys: MissingSubKeyPolicy::LeavePending,
            ..OrchestratorConfig::default()
        });

        let (report, summary) = run(&orchestrator, &pending_registry());

        assert_eq!(report.status("x"), Some(Status::Pass));
        assert_eq!(report.status("y"), Some(Status::Pending));
        assert_eq!(report.status("undecided"), Some(Status::Pending));
        assert_eq!(summary.partial_probes, 2);
        assert_eq!(summary.pending, 2);
    }

    #[test]
    fn test_shape_mismatch_is_a_failure() {
        let registry = ProbeRegistry::builder()
            .single(
                "single",
                "Single",
                "g",
                probe_fn(|| async { Ok(ProbeOutcome::multi([("a", Verdict::pass("a"))])) }),
            )
            .multi(
                "multi",
                "Multi",
                "g",
                media_rows(),
                probe_fn(|| async { Ok(ProbeOutcome::single(Verdict::pass("whole"))) }),
            )
            .build()
            .unwrap();

        let (report, summary) = run(&Orchestrator::default(), &registry);

        for key in ["single", "x", "y"] {
            assert_eq!(report.get(key).unwrap().verdict.detail(), PROBE_ERROR_DETAIL);
        }
        assert_eq!(summary.failed_probes, 2);
    }

    #[test]
    fn test_each_probe_invoked_once_per_run() {
        let calls = Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        let registry = ProbeRegistry::builder()
            .single(
                "counted",
                "Counted",
                "g",
                probe_fn(move || {
                    counter.set(counter.get() + 1);
                    async { Err(ProbeError::Other("nope".into())) }
                }),
            )
            .build()
            .unwrap();

        run(&Orchestrator::default(), &registry);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_report_independent_of_completion_order() {
        let delays = [10usize, 100, 1];
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        let mut reports = Vec::new();
        for order in permutations {
            let registry = ProbeRegistry::builder()
                .single("p", "P", "g", delayed_pass(delays[order[0]], "p"))
                .single("q", "Q", "g", failing())
                .multi(
                    "m",
                    "M",
                    "g",
                    media_rows(),
                    probe_fn(move || {
                        let turns = delays[order[2]];
                        async move {
                            yields(turns).await;
                            Ok(ProbeOutcome::multi([
                                ("x", Verdict::pass("x")),
                                ("y", Verdict::flagged("y")),
                            ]))
                        }
                    }),
                )
                .single("r", "R", "g", delayed_pass(delays[order[1]], "r"))
                .build()
                .unwrap();

            let (report, _) = run(&Orchestrator::default(), &registry);
            reports.push(report.to_json().unwrap());
        }

        assert!(reports.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn test_arrival_order_follows_delays() {
        let registry = ProbeRegistry::builder()
            .single("ten", "Ten", "g", delayed_pass(10, "10"))
            .single("hundred", "Hundred", "g", delayed_pass(100, "100"))
            .single("one", "One", "g", delayed_pass(1, "1"))
            .build()
            .unwrap();

        let mut events: Vec<ReportEvent> = Vec::new();
        block_on(Orchestrator::default().run(&registry, &mut events));

        let resolved: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ReportEvent::RowResolved { key, .. } => Some(key.as_str()),
                ReportEvent::RowDeclared(_) => None,
            })
            .collect();
        assert_eq!(resolved, vec!["one", "ten", "hundred"]);
    }

    #[test]
    fn test_focus_counter_accumulates_across_runs() {
        let counters = SignalCounters::shared();
        for _ in 0..3 {
            counters.increment(SignalKind::FocusLoss);
        }
        let registry = ProbeRegistry::builder()
            .single(
                "window-focus",
                "Window Focus",
                "browser",
                WindowFocusProbe::new(counters.clone(), 0),
            )
            .build()
            .unwrap();
        let orchestrator = Orchestrator::default();

        for _ in 0..2 {
            let (report, _) = run(&orchestrator, &registry);
            let verdict = &report.get("window-focus").unwrap().verdict;
            assert_eq!(verdict.status(), Status::Flagged);
            assert_eq!(verdict.detail(), "Window lost focus 3 time(s).");
        }
    }

    #[test]
    fn test_empty_registry_completes() {
        let registry = ProbeRegistry::builder().build().unwrap();
        let (report, summary) = run(&Orchestrator::default(), &registry);
        assert!(report.is_empty());
        assert_eq!(summary.rows, 0);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_pending_verdict_from_probe_is_not_a_resolution() {
        let registry = ProbeRegistry::builder()
            .single(
                "undecided",
                "Undecided",
                "g",
                probe_fn(|| async { Ok(ProbeOutcome::single(Verdict::pending())) }),
            )
            .build()
            .unwrap();

        let (report, summary) = run(&Orchestrator::default(), &registry);
        assert_eq!(report.status("undecided"), Some(Status::Pending));
        assert_eq!(summary.resolved, 0);
        assert_eq!(summary.pending, 1);
    }

    #[test]
    fn test_config_conversion() {
        let config = CheckConfig {
            probe_timeout_ms: Some(1500),
            missing_sub_keys: MissingSubKeyPolicy::LeavePending,
            ..CheckConfig::default()
        };
        let converted = OrchestratorConfig::from(&config);
        assert_eq!(converted.probe_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(converted.missing_sub_keys, MissingSubKeyPolicy::LeavePending);
    }
}
