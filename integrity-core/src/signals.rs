//! Passive signal collectors
//!
//! Process-lifetime counters incremented by environment events (focus loss,
//! clipboard actions) and read synchronously by probes at invocation time.
//! Counters only ever grow; a fresh [`SignalCounters`] is the only way to
//! start from zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::probe::{Probe, ProbeOutcome, ProbeResult};
use crate::verdict::Verdict;

/// Environment events that are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    FocusLoss,
    Copy,
    Cut,
    Paste,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignalSnapshot {
    pub focus_loss: u64,
    pub copy: u64,
    pub cut: u64,
    pub paste: u64,
}

impl SignalSnapshot {
    pub fn clipboard_total(&self) -> u64 {
        self.copy + self.cut + self.paste
    }
}

/// Monotonic event counters shared between listeners and probes.
#[derive(Debug, Default)]
pub struct SignalCounters {
    focus_loss: AtomicU64,
    copy: AtomicU64,
    cut: AtomicU64,
    paste: AtomicU64,
}

impl SignalCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn increment(&self, kind: SignalKind) {
        self.counter(kind).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, kind: SignalKind) -> u64 {
        self.counter(kind).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        SignalSnapshot {
            focus_loss: self.get(SignalKind::FocusLoss),
            copy: self.get(SignalKind::Copy),
            cut: self.get(SignalKind::Cut),
            paste: self.get(SignalKind::Paste),
        }
    }

    fn counter(&self, kind: SignalKind) -> &AtomicU64 {
        match kind {
            SignalKind::FocusLoss => &self.focus_loss,
            SignalKind::Copy => &self.copy,
            SignalKind::Cut => &self.cut,
            SignalKind::Paste => &self.paste,
        }
    }
}

/// Flags when the window lost focus more than `threshold` times.
pub struct WindowFocusProbe {
    counters: Arc<SignalCounters>,
    threshold: u64,
}

impl WindowFocusProbe {
    pub fn new(counters: Arc<SignalCounters>, threshold: u64) -> Self {
        Self { counters, threshold }
    }

    pub fn assess(&self, snapshot: &SignalSnapshot) -> Verdict {
        Verdict::from_flag(
            snapshot.focus_loss > self.threshold,
            format!("Window lost focus {} time(s).", snapshot.focus_loss),
        )
    }
}

#[async_trait(?Send)]
impl Probe for WindowFocusProbe {
    async fn invoke(&self) -> ProbeResult {
        Ok(ProbeOutcome::single(self.assess(&self.counters.snapshot())))
    }
}

/// Flags when copy + cut + paste exceeds `threshold`.
pub struct ClipboardProbe {
    counters: Arc<SignalCounters>,
    threshold: u64,
}

impl ClipboardProbe {
    pub fn new(counters: Arc<SignalCounters>, threshold: u64) -> Self {
        Self { counters, threshold }
    }

    pub fn assess(&self, snapshot: &SignalSnapshot) -> Verdict {
        Verdict::from_flag(
            snapshot.clipboard_total() > self.threshold,
            format!(
                "Clipboard Actions: {} copies, {} cuts, {} pastes.",
                snapshot.copy, snapshot.cut, snapshot.paste
            ),
        )
    }
}

#[async_trait(?Send)]
impl Probe for ClipboardProbe {
    async fn invoke(&self) -> ProbeResult {
        Ok(ProbeOutcome::single(self.assess(&self.counters.snapshot())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Status;
    use futures::executor::block_on;

    fn verdict_of(result: ProbeResult) -> Verdict {
        match result {
            Ok(ProbeOutcome::Single(verdict)) => verdict,
            other => panic!("Expected single verdict, got {:?}", other),
        }
    }

    #[test]
    fn test_counters_are_monotonic_and_independent() {
        let counters = SignalCounters::new();
        counters.increment(SignalKind::Copy);
        counters.increment(SignalKind::Copy);
        counters.increment(SignalKind::Paste);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.copy, 2);
        assert_eq!(snapshot.paste, 1);
        assert_eq!(snapshot.cut, 0);
        assert_eq!(snapshot.focus_loss, 0);
        assert_eq!(snapshot.clipboard_total(), 3);
    }

    #[test]
    fn test_focus_probe_passes_without_focus_loss() {
        let counters = SignalCounters::shared();
        let probe = WindowFocusProbe::new(counters, 0);
        let verdict = verdict_of(block_on(probe.invoke()));
        assert_eq!(verdict.status(), Status::Pass);
        assert_eq!(verdict.detail(), "Window lost focus 0 time(s).");
    }

    #[test]
    fn test_clipboard_threshold_is_exclusive() {
        let counters = SignalCounters::shared();
        let probe = ClipboardProbe::new(counters.clone(), 5);

        for _ in 0..5 {
            counters.increment(SignalKind::Cut);
        }
        assert_eq!(verdict_of(block_on(probe.invoke())).status(), Status::Pass);

        counters.increment(SignalKind::Paste);
        let verdict = verdict_of(block_on(probe.invoke()));
        assert_eq!(verdict.status(), Status::Flagged);
        assert_eq!(verdict.detail(), "Clipboard Actions: 0 copies, 5 cuts, 1 pastes.");
    }

    #[test]
    fn test_probe_reads_snapshot_at_invocation() {
        let counters = SignalCounters::shared();
        let probe = WindowFocusProbe::new(counters.clone(), 0);

        let before = probe.invoke();
        counters.increment(SignalKind::FocusLoss);
        // The future has not been polled yet, so it still sees the new count.
        let verdict = verdict_of(block_on(before));
        assert_eq!(verdict.status(), Status::Flagged);

        let settled = verdict_of(block_on(probe.invoke()));
        counters.increment(SignalKind::FocusLoss);
        assert_eq!(settled.detail(), "Window lost focus 1 time(s).");
    }
}
