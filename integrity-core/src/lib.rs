//! integrity-core: platform-agnostic environment integrity checking
//!
//! This crate holds the parts of the integrity checker that do not touch a
//! browser: the probe registry, the concurrent orchestrator, the report
//! model and the passive signal counters. It can be driven by:
//! - Browsers (via the wasm-bindgen wrapper in the root crate)
//! - Native tests (via `futures::executor::block_on`)
//!
//! The platform supplies probe bodies through the [`Probe`] trait, an
//! optional [`Timer`] for probe timeouts and a [`ReportSink`] for rendering.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod report;
pub mod signals;
pub mod verdict;

// Re-export everything for easy access
pub use config::{CheckConfig, MissingSubKeyPolicy};
pub use error::{ConfigError, ProbeError, RegistryError};
pub use orchestrator::{
    Orchestrator, OrchestratorConfig, RunSummary, Timer, INCOMPLETE_DETAIL, PROBE_ERROR_DETAIL,
};
pub use probe::{probe_fn, FnProbe, Probe, ProbeOutcome, ProbeResult};
pub use registry::{ProbeDescriptor, ProbeRegistry, ProbeShape, RegistryBuilder, RowSpec, SubRow};
pub use report::{
    DeclareOutcome, Report, ReportEvent, ReportRow, ReportSink, ReportSummary, ResolveOutcome,
};
pub use signals::{ClipboardProbe, SignalCounters, SignalKind, SignalSnapshot, WindowFocusProbe};
pub use verdict::{Status, Verdict};
