//! Thread-local dispatch context, the feedback filter's substrate.
//!
//! While a pipeline drains its queue on a worker thread, two facts are
//! published thread-locally:
//!
//! - the **executing pipeline**, so that `fire` calls made from inside
//!   a handler without naming a pipeline land on the pipeline that is
//!   running the handler (as long as it serves the same tree), and
//! - the **currently handled event**, so that events fired from a
//!   handler record their causal parent.
//!
//! Both are maintained with RAII guards so a worker thread handed back
//! to the pool never carries stale context.

use crate::pipeline::PipelineCore;
use grove_event::Fired;
use std::cell::RefCell;
use std::sync::{Arc, Weak};

thread_local! {
    static CURRENT_PIPELINE: RefCell<Option<Weak<PipelineCore>>> = const { RefCell::new(None) };
    static CURRENTLY_HANDLING: RefCell<Option<Fired>> = const { RefCell::new(None) };
}

/// The pipeline executing on this thread, if any.
pub(crate) fn current_pipeline() -> Option<Arc<PipelineCore>> {
    CURRENT_PIPELINE.with(|cell| cell.borrow().as_ref().and_then(Weak::upgrade))
}

/// The event being dispatched on this thread, if any.
pub(crate) fn currently_handling() -> Option<Fired> {
    CURRENTLY_HANDLING.with(|cell| cell.borrow().clone())
}

/// Marks this thread as executing `pipeline` until dropped.
pub(crate) struct PipelineScope;

impl PipelineScope {
    pub(crate) fn enter(pipeline: &Arc<PipelineCore>) -> Self {
        CURRENT_PIPELINE.with(|cell| *cell.borrow_mut() = Some(Arc::downgrade(pipeline)));
        Self
    }
}

impl Drop for PipelineScope {
    fn drop(&mut self) {
        CURRENT_PIPELINE.with(|cell| *cell.borrow_mut() = None);
    }
}

/// Marks `fired` as the event being dispatched until dropped.
pub(crate) struct HandlingScope;

impl HandlingScope {
    pub(crate) fn enter(fired: &Fired) -> Self {
        CURRENTLY_HANDLING.with(|cell| *cell.borrow_mut() = Some(fired.clone()));
        Self
    }
}

impl Drop for HandlingScope {
    fn drop(&mut self) {
        CURRENTLY_HANDLING.with(|cell| *cell.borrow_mut() = None);
    }
}
