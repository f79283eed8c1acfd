//! Shared state of one component tree.
//!
//! Every node of a tree points at the same [`Tree`]: the root pipeline
//! (buffering until the tree is started), the handler-lookup cache and
//! the runtime the tree runs on. Attach and detach swap this shared
//! state wholesale for the affected subtree.

use crate::dispatch::HandlerRef;
use crate::feedback;
use crate::node::{self, Node};
use crate::pipeline::{BufferingQueue, PipelineCore};
use crate::runtime::Runtime;
use grove_event::{Channel, Fired};
use grove_types::Criterion;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// The tree's default event sink.
///
/// Trees buffer until started; `start` swaps the buffer for a real
/// pipeline and re-homes everything buffered so far.
pub(crate) enum RootPipeline {
    Buffering(Arc<BufferingQueue>),
    Processing(Arc<PipelineCore>),
}

/// Cache key: the event's criterion plus the criteria of the channels
/// it was fired on. The match result depends on nothing else.
type CacheKey = (Criterion, Vec<Criterion>);

pub(crate) struct Tree {
    root: RwLock<Weak<Node>>,
    pipeline: RwLock<RootPipeline>,
    cache: RwLock<HashMap<CacheKey, Arc<[HandlerRef]>>>,
    started: AtomicBool,
    runtime: Arc<Runtime>,
}

impl Tree {
    pub(crate) fn new(runtime: Arc<Runtime>) -> Arc<Self> {
        Arc::new(Self {
            root: RwLock::new(Weak::new()),
            pipeline: RwLock::new(RootPipeline::Buffering(Arc::new(BufferingQueue::new()))),
            cache: RwLock::new(HashMap::new()),
            started: AtomicBool::new(false),
            runtime,
        })
    }

    pub(crate) fn set_root(&self, node: &Arc<Node>) {
        *self.root.write() = Arc::downgrade(node);
    }

    pub(crate) fn root(&self) -> Option<Arc<Node>> {
        self.root.read().upgrade()
    }

    pub(crate) fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Converts the buffering root pipeline into a processing one and
    /// re-homes the buffered events. Idempotent.
    pub(crate) fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let processing = PipelineCore::new(self);
        let buffered = {
            let mut guard = self.pipeline.write();
            match &*guard {
                RootPipeline::Buffering(queue) => {
                    let entries = queue.take_all();
                    *guard = RootPipeline::Processing(Arc::clone(&processing));
                    entries
                }
                RootPipeline::Processing(_) => Vec::new(),
            }
        };
        for fired in buffered {
            processing.accept(fired);
        }
    }

    /// Routes a fired event. A handler firing without naming a
    /// pipeline stays on the pipeline that runs it, as long as that
    /// pipeline serves this tree; everything else goes to the root
    /// pipeline.
    pub(crate) fn fire(self: &Arc<Self>, fired: Fired) {
        if let Some(current) = feedback::current_pipeline() {
            if let Some(current_tree) = current.tree() {
                if Arc::ptr_eq(&current_tree, self) {
                    current.add(fired);
                    return;
                }
            }
        }
        let guard = self.pipeline.read();
        match &*guard {
            RootPipeline::Buffering(queue) => queue.add(fired),
            RootPipeline::Processing(pipeline) => Arc::clone(pipeline).add(fired),
        }
    }

    /// Empties the buffering queue for migration into another tree.
    pub(crate) fn take_buffered(&self) -> Vec<Fired> {
        match &*self.pipeline.read() {
            RootPipeline::Buffering(queue) => queue.take_all(),
            RootPipeline::Processing(_) => Vec::new(),
        }
    }

    /// Accepts events migrated out of another tree. Their causal
    /// fields are already in place; they only get a new home.
    pub(crate) fn adopt(&self, entries: Vec<Fired>) {
        if entries.is_empty() {
            return;
        }
        let guard = self.pipeline.read();
        match &*guard {
            RootPipeline::Buffering(queue) => {
                for fired in entries {
                    queue.accept(fired);
                }
            }
            RootPipeline::Processing(pipeline) => {
                let pipeline = Arc::clone(pipeline);
                for fired in entries {
                    pipeline.accept(fired);
                }
            }
        }
    }

    /// Allocates an ad-hoc pipeline dispatching into this tree.
    pub(crate) fn new_pipeline(self: &Arc<Self>) -> Arc<PipelineCore> {
        PipelineCore::new(self)
    }

    /// The handlers matching `fired`, collected tree-wide in pre-order
    /// and sorted by descending priority. Cached per
    /// (event criterion, channel criteria) until the next structural
    /// change.
    pub(crate) fn handlers_for(&self, fired: &Fired) -> Arc<[HandlerRef]> {
        let key: CacheKey = (
            fired.event().criterion(),
            fired.channels().iter().map(Channel::criterion).collect(),
        );
        if let Some(hit) = self.cache.read().get(&key) {
            return Arc::clone(hit);
        }
        let mut collected = Vec::new();
        if let Some(root) = self.root() {
            node::collect_handlers(&root, fired.event(), fired.channels(), &mut collected);
        }
        // Stable sort keeps the pre-order / insertion-order tie-break.
        collected.sort_by(|a, b| b.priority.cmp(&a.priority));
        let handlers: Arc<[HandlerRef]> = collected.into();
        self.cache.write().insert(key, Arc::clone(&handlers));
        handlers
    }

    pub(crate) fn clear_handler_cache(&self) {
        self.cache.write().clear();
    }
}
