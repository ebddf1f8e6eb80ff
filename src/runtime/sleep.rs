//! Sleep provider implementation using browser timers

use std::time::Duration;

use futures::future::LocalBoxFuture;
use gloo_timers::future::TimeoutFuture;
use integrity_core::Timer;

/// Largest delay `setTimeout` accepts without overflowing.
const MAX_TIMEOUT_MS: u128 = i32::MAX as u128;

/// A future that resolves after `duration`.
pub fn sleep(duration: Duration) -> TimeoutFuture {
    let millis = duration.as_millis().min(MAX_TIMEOUT_MS) as u32;
    TimeoutFuture::new(millis)
}

/// [`Timer`] backed by the browser event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(sleep(duration))
    }
}
