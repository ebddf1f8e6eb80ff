//! The probe invocation interface.
//!
//! A probe is an independently invocable unit of evidence gathering. Its body
//! is supplied by the platform (browser APIs, test doubles); the core only
//! sees the outcome.

use std::collections::BTreeMap;
use std::future::Future;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::verdict::Verdict;

pub type ProbeResult = std::result::Result<ProbeOutcome, ProbeError>;

/// Result shape of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// One verdict for the descriptor's own key.
    Single(Verdict),
    /// One verdict per sub-key, from one underlying call.
    Multi(BTreeMap<String, Verdict>),
}

impl ProbeOutcome {
    pub fn single(verdict: Verdict) -> Self {
        ProbeOutcome::Single(verdict)
    }

    pub fn multi<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Verdict)>,
    {
        ProbeOutcome::Multi(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub(crate) fn shape_name(&self) -> &'static str {
        match self {
            ProbeOutcome::Single(_) => "single",
            ProbeOutcome::Multi(_) => "multi",
        }
    }
}

/// A probe. Single-threaded, so futures need not be `Send`.
#[async_trait(?Send)]
pub trait Probe {
    async fn invoke(&self) -> ProbeResult;
}

/// Adapter turning an async closure into a [`Probe`].
pub struct FnProbe<F> {
    f: F,
}

#[async_trait(?Send)]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = ProbeResult> + 'static,
{
    async fn invoke(&self) -> ProbeResult {
        (self.f)().await
    }
}

/// Wrap an async closure as a probe.
///
/// ```
/// use integrity_core::{probe_fn, ProbeOutcome, Verdict};
///
/// let probe = probe_fn(|| async { Ok(ProbeOutcome::single(Verdict::pass("ok"))) });
/// # let _ = probe;
/// ```
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = ProbeResult> + 'static,
{
    FnProbe { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_fn_probe_invokes_closure_each_time() {
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = calls.clone();
        let probe = probe_fn(move || {
            counter.set(counter.get() + 1);
            async { Ok(ProbeOutcome::single(Verdict::pass("ok"))) }
        });

        let first = block_on(probe.invoke());
        let _ = block_on(probe.invoke());

        assert_eq!(first, Ok(ProbeOutcome::Single(Verdict::pass("ok"))));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_multi_builder() {
        let outcome =
            ProbeOutcome::multi([("a", Verdict::pass("1")), ("b", Verdict::flagged("2"))]);
        match outcome {
            ProbeOutcome::Multi(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map["b"].detail(), "2");
            }
            ProbeOutcome::Single(_) => panic!("Expected multi outcome"),
        }
    }
}
