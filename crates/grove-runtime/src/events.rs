//! Built-in events.
//!
//! | Event | Fired on | Meaning |
//! |-------|----------|---------|
//! | [`Start`] | broadcast | Boot the tree; sources register generators here |
//! | [`Stop`] | broadcast | Quiesce; handlers release resources |
//! | [`Attached`] | see `Manager::attach` | A component gained a parent |
//! | [`Detached`] | both sides | A component left its parent |
//! | [`Completed`] | the event's channels | An event's open count returned to zero |
//! | [`HandlingError`] | the event's channels | A handler failed while dispatching |
//! | [`Action`] | caller's choice | A closure to run on a pipeline |
//!
//! All of these are ordinary events: they queue, dispatch and complete
//! like application events, with one exception: [`Completed`] does not
//! emit a completion event of its own.

use crate::node::ComponentInfo;
use grove_component::ComponentError;
use grove_event::{EventKind, Fired};
use parking_lot::Mutex;
use serde_json::Value;

/// Boots a component tree. Emitted once by `Manager::start` on the
/// broadcast channel. Components that need background activity
/// register generators in their `Start` handler.
pub struct Start;

impl EventKind for Start {}

/// Quiesces a component tree. Emitted by `Manager::stop` on the
/// broadcast channel; low-priority handlers release resources last.
pub struct Stop;

impl EventKind for Stop {}

/// A component was attached to a parent.
pub struct Attached {
    parent: ComponentInfo,
    child: ComponentInfo,
}

impl Attached {
    pub(crate) fn new(parent: ComponentInfo, child: ComponentInfo) -> Self {
        Self { parent, child }
    }

    /// The new parent.
    #[must_use]
    pub fn parent(&self) -> &ComponentInfo {
        &self.parent
    }

    /// The attached component.
    #[must_use]
    pub fn child(&self) -> &ComponentInfo {
        &self.child
    }
}

impl EventKind for Attached {}

/// A component was detached from its parent.
pub struct Detached {
    former_parent: ComponentInfo,
    node: ComponentInfo,
}

impl Detached {
    pub(crate) fn new(former_parent: ComponentInfo, node: ComponentInfo) -> Self {
        Self {
            former_parent,
            node,
        }
    }

    /// The parent the component left.
    #[must_use]
    pub fn former_parent(&self) -> &ComponentInfo {
        &self.former_parent
    }

    /// The detached component.
    #[must_use]
    pub fn node(&self) -> &ComponentInfo {
        &self.node
    }
}

impl EventKind for Detached {}

/// An event has been fully handled: its open count returned to zero
/// after having been positive, children included.
pub struct Completed {
    fired: Fired,
}

impl Completed {
    pub(crate) fn new(fired: Fired) -> Self {
        Self { fired }
    }

    /// The completed event.
    #[must_use]
    pub fn fired(&self) -> &Fired {
        &self.fired
    }
}

impl EventKind for Completed {
    // Completion events complete silently, otherwise every completion
    // would spawn the next one.
    fn emits_completed(&self) -> bool {
        false
    }
}

/// A handler raised an error (or panicked) while dispatching an event.
///
/// Fired on the offending event's channels. When no handler at all
/// listens for `HandlingError`, the runtime logs the failure through
/// `tracing`.
pub struct HandlingError {
    offending: Fired,
    error: ComponentError,
}

impl HandlingError {
    pub(crate) fn new(offending: Fired, error: ComponentError) -> Self {
        Self { offending, error }
    }

    /// The event whose handler failed.
    #[must_use]
    pub fn offending(&self) -> &Fired {
        &self.offending
    }

    /// The failure.
    #[must_use]
    pub fn error(&self) -> &ComponentError {
        &self.error
    }
}

impl EventKind for HandlingError {}

/// A closure pushed through a pipeline as an event.
///
/// Dispatched like any event; the `ActionRunner` component invokes the
/// closure once and stores its return value as the event result, so
/// `fired.get()` hands the value back to the producer with full causal
/// accounting.
pub struct Action {
    op: Mutex<Option<Box<dyn FnOnce() -> Value + Send>>>,
}

impl Action {
    /// Wraps a closure.
    #[must_use]
    pub fn new(op: impl FnOnce() -> Value + Send + 'static) -> Self {
        Self {
            op: Mutex::new(Some(Box::new(op))),
        }
    }

    /// Runs the closure. Later calls return `None`.
    #[must_use]
    pub fn invoke(&self) -> Option<Value> {
        self.op.lock().take().map(|op| op())
    }
}

impl EventKind for Action {}
