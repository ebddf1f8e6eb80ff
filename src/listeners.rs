//! Environment event listeners feeding the signal counters.
//!
//! `blur` is watched on the window; `visibilitychange`, `copy`, `cut` and
//! `paste` on the document. A `visibilitychange` only counts as a focus loss
//! when the document became hidden.

use std::sync::Arc;

use integrity_core::{SignalCounters, SignalKind};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Event, EventTarget};

use crate::error::{CheckError, Result};

type Handler = Closure<dyn FnMut(Event)>;

struct Registration {
    target: EventTarget,
    event: &'static str,
    handler: Handler,
}

/// Installed listeners. Dropping the handle removes them.
pub struct SignalListeners {
    registrations: Vec<Registration>,
}

impl SignalListeners {
    /// Attach all listeners to the current window and document.
    pub fn install(counters: Arc<SignalCounters>) -> Result<Self> {
        let window = web_sys::window().ok_or(CheckError::NoWindow)?;
        let document = window.document().ok_or(CheckError::NoDocument)?;

        let mut listeners = Self {
            registrations: Vec::with_capacity(5),
        };

        let window_target: EventTarget = window.into();
        let document_target: EventTarget = document.clone().into();

        listeners.add(&window_target, "blur", {
            let counters = counters.clone();
            move |_event: Event| counters.increment(SignalKind::FocusLoss)
        })?;

        listeners.add(&document_target, "visibilitychange", {
            let counters = counters.clone();
            let document: Document = document.clone();
            move |_event: Event| {
                if document.hidden() {
                    counters.increment(SignalKind::FocusLoss);
                }
            }
        })?;

        for (event, kind) in [
            ("copy", SignalKind::Copy),
            ("cut", SignalKind::Cut),
            ("paste", SignalKind::Paste),
        ] {
            let counters = counters.clone();
            listeners.add(&document_target, event, move |_event: Event| {
                counters.increment(kind)
            })?;
        }

        log::info!("👂 Installed {} signal listeners", listeners.len());
        Ok(listeners)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    fn add<F>(&mut self, target: &EventTarget, event: &'static str, handler: F) -> Result<()>
    where
        F: FnMut(Event) + 'static,
    {
        let handler: Handler = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(event, handler.as_ref().unchecked_ref())
            .map_err(|err| CheckError::Listener {
                event,
                reason: format!("{:?}", err),
            })?;
        self.registrations.push(Registration {
            target: target.clone(),
            event,
            handler,
        });
        Ok(())
    }
}

impl Drop for SignalListeners {
    fn drop(&mut self) {
        for registration in self.registrations.drain(..) {
            let removed = registration.target.remove_event_listener_with_callback(
                registration.event,
                registration.handler.as_ref().unchecked_ref(),
            );
            if removed.is_err() {
                log::warn!("Failed to remove '{}' listener", registration.event);
            }
        }
    }
}
