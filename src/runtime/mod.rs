//! Browser runtime glue
//!
//! Timers for the orchestrator and the probes, backed by `setTimeout`
//! through gloo-timers.

mod sleep;

pub use sleep::{sleep, BrowserTimer};
