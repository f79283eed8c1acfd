//! Event pipelines.
//!
//! A pipeline is a FIFO processor: events added to it are dispatched
//! one at a time, in order, on a worker borrowed from the runtime's
//! shared pool. A pipeline is *executing* from the moment the first
//! event is enqueued until its queue drains; the transition into and
//! out of execution is atomic with the enqueue/drain, and an executing
//! pipeline is registered as a generator so `await_exhaustion` counts
//! it as work in flight.
//!
//! ```text
//!  add(event)                        worker thread
//!     │                                  │
//!     ▼                                  ▼
//!  queue ──► idle? ──► submit ──► loop { peek → dispatch →
//!                                        decrement → completions →
//!                                        remove } ──► idle
//! ```
//!
//! Handlers run to completion on the pipeline's worker; there are no
//! suspension points inside a dispatch. Long work either fires another
//! event or runs on a dedicated pipeline.

use crate::dispatch;
use crate::error::PipelineError;
use crate::events::Completed;
use crate::feedback::{self, HandlingScope, PipelineScope};
use crate::queue::EventQueue;
use crate::runtime::Runtime;
use crate::tree::Tree;
use grove_event::{Channel, Event, EventKind, Fired};
use grove_types::{GeneratorId, PipelineId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::trace;

pub(crate) struct PipelineCore {
    id: PipelineId,
    generator: GeneratorId,
    tree: Weak<Tree>,
    runtime: Arc<Runtime>,
    queue: EventQueue,
    executing: Mutex<bool>,
}

impl PipelineCore {
    pub(crate) fn new(tree: &Arc<Tree>) -> Arc<Self> {
        Arc::new(Self {
            id: PipelineId::new(),
            generator: GeneratorId::new(),
            tree: Arc::downgrade(tree),
            runtime: Arc::clone(tree.runtime()),
            queue: EventQueue::new(),
            executing: Mutex::new(false),
        })
    }

    pub(crate) fn id(&self) -> PipelineId {
        self.id
    }

    pub(crate) fn tree(&self) -> Option<Arc<Tree>> {
        self.tree.upgrade()
    }

    /// Accepts a freshly fired event: records its causal parent from
    /// the thread's dispatch context, claims it for this pipeline, adds
    /// the processing obligation and schedules the drain loop.
    pub(crate) fn add(self: &Arc<Self>, fired: Fired) {
        fired.open_for_enqueue(feedback::currently_handling().as_ref());
        self.accept(fired);
    }

    /// Accepts an event whose obligations were already counted, e.g.
    /// one migrated out of a buffering queue.
    pub(crate) fn accept(self: &Arc<Self>, fired: Fired) {
        fired.set_processed_by(self.id);
        self.queue.push(fired);
        self.schedule();
    }

    fn schedule(self: &Arc<Self>) {
        let mut executing = self.executing.lock();
        if !*executing {
            self.runtime.registry().add(self.generator, "pipeline");
            *executing = true;
            let this = Arc::clone(self);
            self.runtime.executor().execute(move || this.run());
        }
    }

    fn run(self: Arc<Self>) {
        let _scope = PipelineScope::enter(&self);
        trace!(pipeline = %self.id, "pipeline executing");
        loop {
            let Some(fired) = self.queue.peek() else {
                // Retry under the lock so a concurrent add cannot slip
                // between the empty check and the idle transition.
                let mut executing = self.executing.lock();
                if self.queue.is_empty() {
                    self.runtime.registry().remove(self.generator);
                    *executing = false;
                    break;
                }
                continue;
            };
            {
                let _handling = HandlingScope::enter(&fired);
                match self.tree.upgrade() {
                    Some(tree) => dispatch::dispatch(&tree, &self, &fired),
                    None => trace!(event = fired.name(), "tree gone, event discarded"),
                }
                for done in fired.decrement_open() {
                    if done.event().emits_completed() {
                        let channels = done.channels().to_vec();
                        let completed = Fired::wrap(Box::new(Completed::new(done)));
                        completed.set_channels(channels);
                        self.add(completed);
                    }
                }
            }
            self.queue.remove_first();
        }
        trace!(pipeline = %self.id, "pipeline idle");
    }
}

/// A handle to an event pipeline.
///
/// Obtained from `Manager::new_event_pipeline` or as a subchannel's
/// response pipeline. Events fired here are processed sequentially and
/// independently of other pipelines; a converter component uses one
/// pipeline per connection so responses for one connection never block
/// another.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) core: Arc<PipelineCore>,
}

impl Pipeline {
    pub(crate) fn new(core: Arc<PipelineCore>) -> Self {
        Self { core }
    }

    /// The pipeline's identity.
    #[must_use]
    pub fn id(&self) -> PipelineId {
        self.core.id()
    }

    /// Fires an event on this pipeline.
    ///
    /// Empty `channels` default to broadcast. The fired event records
    /// the currently handled event as its causal parent when called
    /// from inside a handler.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ForeignFire`] when the calling thread is
    /// executing a pipeline of a different tree, and
    /// [`PipelineError::TreeGone`] when this pipeline's tree has been
    /// dropped.
    pub fn fire<E: EventKind>(
        &self,
        event: E,
        channels: Vec<Channel>,
    ) -> Result<Fired, PipelineError> {
        self.fire_dyn(Box::new(event), channels)
    }

    /// Type-erased [`fire`](Pipeline::fire).
    pub fn fire_dyn(
        &self,
        event: Box<dyn Event>,
        mut channels: Vec<Channel>,
    ) -> Result<Fired, PipelineError> {
        self.check_origin()?;
        if self.core.tree().is_none() {
            return Err(PipelineError::TreeGone);
        }
        if channels.is_empty() {
            channels.push(Channel::broadcast());
        }
        let fired = Fired::wrap(event);
        fired.set_channels(channels);
        self.core.add(fired.clone());
        Ok(fired)
    }

    fn check_origin(&self) -> Result<(), PipelineError> {
        let Some(current) = feedback::current_pipeline() else {
            return Ok(());
        };
        if current.id() == self.core.id() {
            return Ok(());
        }
        let same_tree = match (current.tree(), self.core.tree()) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        };
        if same_tree {
            Ok(())
        } else {
            Err(PipelineError::ForeignFire)
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pipeline({})", self.id())
    }
}

/// Buffer standing in for the root pipeline of a tree that has not
/// been started. Fired events queue here with their causal fields in
/// place and are re-homed to a processing pipeline when the tree
/// starts or is attached to a started tree.
pub(crate) struct BufferingQueue {
    entries: EventQueue,
}

impl BufferingQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: EventQueue::new(),
        }
    }

    pub(crate) fn add(&self, fired: Fired) {
        fired.open_for_enqueue(feedback::currently_handling().as_ref());
        self.entries.push(fired);
    }

    /// Re-buffers an entry migrated from another buffering queue.
    pub(crate) fn accept(&self, fired: Fired) {
        self.entries.push(fired);
    }

    pub(crate) fn take_all(&self) -> Vec<Fired> {
        self.entries.take_all()
    }
}
