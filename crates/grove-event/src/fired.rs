//! The lifecycle handle of a fired event.
//!
//! Firing wraps an [`Event`] value in a [`Fired`] handle shared between
//! the caller, the queue entry and any handler that keeps a clone. The
//! handle carries everything that changes after the fire:
//!
//! - the **open count**: the number of obligations that must resolve
//!   before the event counts as handled. Enqueueing adds one, finishing
//!   dispatch removes one, and every causally fired child adds one to
//!   its parent until the child itself is handled. An event is handled
//!   exactly when the count returns to zero after having been positive.
//! - the **causal parent**: a weak link to the event whose handler
//!   fired this one, cleared on completion so a finished parent is
//!   never pinned.
//! - the **stop flag**: set by a handler to suppress the remaining
//!   lower-priority handlers of the same event.
//! - the **recorded channels** and the pipeline that first accepted
//!   the event.
//! - the **result**: an optional value a handler may set and other
//!   threads may wait for via [`get`](Fired::get).
//!
//! Waiting is plain blocking on a condvar. Do not call `get` from a
//! handler running on the pipeline that processes the awaited event;
//! that pipeline cannot make progress while the handler blocks.

use crate::channel::Channel;
use crate::error::EventError;
use crate::event::Event;
use grove_types::PipelineId;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

/// Shared handle to one fired event.
///
/// Clones refer to the same underlying event; [`same`](Fired::same)
/// tests handle identity.
#[derive(Clone)]
pub struct Fired {
    inner: Arc<Inner>,
}

struct Inner {
    event: Box<dyn Event>,
    channels: OnceLock<Arc<[Channel]>>,
    processed_by: OnceLock<PipelineId>,
    stopped: AtomicBool,
    result: Mutex<Option<Value>>,
    lifecycle: Mutex<Lifecycle>,
    handled: Condvar,
}

struct Lifecycle {
    open: usize,
    ever_open: bool,
    done: bool,
    parent: Option<Weak<Inner>>,
}

impl Fired {
    /// Wraps an event for firing. Called by the runtime; application
    /// code receives `Fired` handles from `fire`.
    #[must_use]
    pub fn wrap(event: Box<dyn Event>) -> Self {
        Self {
            inner: Arc::new(Inner {
                event,
                channels: OnceLock::new(),
                processed_by: OnceLock::new(),
                stopped: AtomicBool::new(false),
                result: Mutex::new(None),
                lifecycle: Mutex::new(Lifecycle {
                    open: 0,
                    ever_open: false,
                    done: false,
                    parent: None,
                }),
                handled: Condvar::new(),
            }),
        }
    }

    /// The wrapped event.
    #[must_use]
    pub fn event(&self) -> &dyn Event {
        self.inner.event.as_ref()
    }

    /// The event, downcast to its concrete type.
    #[must_use]
    pub fn downcast_ref<E: 'static>(&self) -> Option<&E> {
        self.inner.event.as_any().downcast_ref::<E>()
    }

    /// Whether the wrapped event is an `E`.
    #[must_use]
    pub fn is<E: 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Diagnostic name of the wrapped event.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.event.name()
    }

    /// The channels the event was fired on. Empty until fired.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        self.inner.channels.get().map_or(&[], |c| c.as_ref())
    }

    /// Records the fire channels. Returns `false` if already recorded.
    pub fn set_channels(&self, channels: Vec<Channel>) -> bool {
        self.inner.channels.set(channels.into()).is_ok()
    }

    /// The pipeline that first accepted this event.
    #[must_use]
    pub fn processed_by(&self) -> Option<PipelineId> {
        self.inner.processed_by.get().copied()
    }

    /// Records the accepting pipeline. Later calls are ignored; the
    /// first pipeline keeps the event.
    pub fn set_processed_by(&self, pipeline: PipelineId) {
        let _ = self.inner.processed_by.set(pipeline);
    }

    /// Suppresses the remaining lower-priority handlers of this event.
    /// Handlers already invoked and sibling events are unaffected.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
    }

    /// Whether [`stop`](Fired::stop) was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Sets the event's result, replacing any previous value.
    pub fn set_result(&self, value: Value) {
        *self.inner.result.lock() = Some(value);
    }

    /// The current result, if any handler set one.
    #[must_use]
    pub fn result(&self) -> Option<Value> {
        self.inner.result.lock().clone()
    }

    /// Whether the event has been fully handled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.lifecycle.lock().done
    }

    /// Blocks until the event is fully handled, then returns its
    /// result.
    ///
    /// Must not be called from a handler running on the pipeline that
    /// processes this event.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        let mut lifecycle = self.inner.lifecycle.lock();
        while !lifecycle.done {
            self.inner.handled.wait(&mut lifecycle);
        }
        drop(lifecycle);
        self.result()
    }

    /// Like [`get`](Fired::get) with an upper bound on the wait.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Timeout`] when the event is not handled
    /// within `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<Option<Value>, EventError> {
        let deadline = Instant::now() + timeout;
        let mut lifecycle = self.inner.lifecycle.lock();
        while !lifecycle.done {
            if self
                .inner
                .handled
                .wait_until(&mut lifecycle, deadline)
                .timed_out()
            {
                return Err(EventError::Timeout);
            }
        }
        drop(lifecycle);
        Ok(self.result())
    }

    /// Whether two handles refer to the same fired event.
    #[must_use]
    pub fn same(&self, other: &Fired) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Opens the event for processing: adds one obligation and, when a
    /// causal `parent` is given, one to the parent as well. The parent
    /// link is recorded weakly and only while the parent is itself
    /// unfinished. Called once per event, at enqueue time.
    pub fn open_for_enqueue(&self, parent: Option<&Fired>) {
        {
            let mut lifecycle = self.inner.lifecycle.lock();
            lifecycle.open += 1;
            lifecycle.ever_open = true;
        }
        if let Some(parent) = parent {
            if parent.same(self) {
                return;
            }
            let adopted = {
                let mut parent_lc = parent.inner.lifecycle.lock();
                if parent_lc.done {
                    false
                } else {
                    parent_lc.open += 1;
                    true
                }
            };
            if adopted {
                self.inner.lifecycle.lock().parent = Some(Arc::downgrade(&parent.inner));
            }
        }
    }

    /// Removes one obligation. When the count reaches zero the event is
    /// marked handled, waiters are woken, the parent link is released
    /// and the removal cascades to the parent.
    ///
    /// Returns the events that became handled, ordered child first.
    pub fn decrement_open(&self) -> Vec<Fired> {
        let mut completed = Vec::new();
        let mut current = Arc::clone(&self.inner);
        loop {
            let finished_parent = {
                let mut lifecycle = current.lifecycle.lock();
                debug_assert!(lifecycle.open > 0, "open count underflow");
                lifecycle.open = lifecycle.open.saturating_sub(1);
                if lifecycle.open > 0 || lifecycle.done || !lifecycle.ever_open {
                    break;
                }
                lifecycle.done = true;
                let parent = lifecycle.parent.take();
                current.handled.notify_all();
                parent
            };
            completed.push(Fired {
                inner: Arc::clone(&current),
            });
            match finished_parent.and_then(|weak| weak.upgrade()) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        completed
    }
}

impl fmt::Debug for Fired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.inner.lifecycle.lock();
        f.debug_struct("Fired")
            .field("event", &self.name())
            .field("open", &lifecycle.open)
            .field("done", &lifecycle.done)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
