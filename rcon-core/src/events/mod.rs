//! Events derived from polled server output.
//!
//! A poll returns the whole recent log every time, so the registry only
//! dispatches an event whose timestamp is strictly newer than the last one
//! it dispatched.

pub mod kill;
pub mod monitor;

use std::fmt::Debug;

use tracing::warn;

pub use kill::KillEvent;
pub use monitor::KillMonitor;

/// Error type callbacks may return. Logged, never propagated.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

type Callback<E> = Box<dyn Fn(&E) -> Result<(), CallbackError> + Send + Sync + 'static>;

/// An event carrying an orderable timestamp.
pub trait LogEvent {
    type Timestamp: Ord + Clone + Debug + Send + Sync;

    fn timestamp(&self) -> &Self::Timestamp;
}

pub struct EventRegistry<E: LogEvent> {
    callbacks: Vec<Callback<E>>,
    last_dispatched: Option<E::Timestamp>,
}

impl<E: LogEvent> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: LogEvent> EventRegistry<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            last_dispatched: None,
        }
    }

    /// Register a callback, invoked in registration order.
    pub fn on_event<F>(&mut self, callback: F)
    where
        F: Fn(&E) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    pub fn last_dispatched(&self) -> Option<&E::Timestamp> {
        self.last_dispatched.as_ref()
    }

    /// Dispatch `event` if it is newer than everything dispatched so far.
    ///
    /// A failing callback is logged and the remaining callbacks still run.
    /// Returns whether the event was new.
    pub fn dispatch(&mut self, event: &E) -> bool {
        if self
            .last_dispatched
            .as_ref()
            .is_some_and(|last| event.timestamp() <= last)
        {
            return false;
        }

        for (index, callback) in self.callbacks.iter().enumerate() {
            if let Err(e) = callback(event) {
                warn!(callback = index, timestamp = ?event.timestamp(), error = %e, "event callback failed");
            }
        }
        self.last_dispatched = Some(event.timestamp().clone());
        true
    }

    /// Dispatch a batch in order. Returns how many events were new.
    pub fn dispatch_all<'a, I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        events
            .into_iter()
            .filter(|event| self.dispatch(event))
            .count()
    }
}
