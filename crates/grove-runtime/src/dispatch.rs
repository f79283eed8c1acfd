//! Handler references and the dispatcher.
//!
//! Dispatching one event means: collect the matching handler
//! references from the whole tree (through the tree's cache), walk
//! them in priority order, and invoke each one unless the event was
//! stopped. A failing handler never aborts the walk: the failure is
//! wrapped in a `HandlingError` event fired on the same channels, and
//! dispatch continues with the remaining handlers.

use crate::events::HandlingError;
use crate::pipeline::{Pipeline, PipelineCore};
use crate::subchannel::Subchannel;
use crate::tree::Tree;
use grove_component::ComponentError;
use grove_event::{Channel, Event, EventKind, Fired};
use grove_types::Criterion;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

/// The callable stored for one registered handler.
pub(crate) type HandlerFn =
    Arc<dyn Fn(&EventContext<'_>) -> Result<(), ComponentError> + Send + Sync>;

/// One registered handler: match keys, priority and the bound callable.
#[derive(Clone)]
pub(crate) struct HandlerRef {
    pub(crate) event_key: Criterion,
    pub(crate) channel_key: Criterion,
    pub(crate) priority: i32,
    pub(crate) component: Arc<str>,
    pub(crate) call: HandlerFn,
}

/// What a handler sees while it runs.
///
/// Borrowed for the duration of one invocation. Besides access to the
/// event, the context lets the handler fire follow-up events; those
/// land on the pipeline that is executing the handler and record the
/// handled event as their causal parent, so a whole causally related
/// family of events quiesces together.
pub struct EventContext<'a> {
    fired: &'a Fired,
    pipeline: &'a Arc<PipelineCore>,
}

impl EventContext<'_> {
    /// The handle of the event being dispatched.
    #[must_use]
    pub fn fired(&self) -> &Fired {
        self.fired
    }

    /// The event being dispatched.
    #[must_use]
    pub fn event(&self) -> &dyn Event {
        self.fired.event()
    }

    /// The event, downcast to a concrete type.
    #[must_use]
    pub fn downcast_ref<E: 'static>(&self) -> Option<&E> {
        self.fired.downcast_ref::<E>()
    }

    /// The channels the event was fired on.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        self.fired.channels()
    }

    /// The first subchannel among the event's channels, if any.
    #[must_use]
    pub fn subchannel(&self) -> Option<Subchannel> {
        self.channels()
            .iter()
            .find_map(|channel| channel.kind_as::<Subchannel>().cloned())
    }

    /// Suppresses the remaining lower-priority handlers of this event.
    pub fn stop(&self) {
        self.fired.stop();
    }

    /// Sets the event's result.
    pub fn set_result(&self, value: Value) {
        self.fired.set_result(value);
    }

    /// Fires a follow-up event on the same channels as the handled
    /// event, through the executing pipeline.
    pub fn fire<E: EventKind>(&self, event: E) -> Fired {
        self.fire_on(event, self.channels().to_vec())
    }

    /// Fires a follow-up event on explicit channels, through the
    /// executing pipeline. Empty `channels` default to the handled
    /// event's channels.
    pub fn fire_on<E: EventKind>(&self, event: E, mut channels: Vec<Channel>) -> Fired {
        if channels.is_empty() {
            channels = self.channels().to_vec();
        }
        let fired = Fired::wrap(Box::new(event));
        fired.set_channels(channels);
        self.pipeline.add(fired.clone());
        fired
    }

    /// A handle to the pipeline executing this handler.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(self.pipeline))
    }
}

/// Dispatches one event to every matching handler in the tree.
pub(crate) fn dispatch(tree: &Arc<Tree>, pipeline: &Arc<PipelineCore>, fired: &Fired) {
    let handlers = tree.handlers_for(fired);
    if handlers.is_empty() {
        if let Some(unhandled) = fired.downcast_ref::<HandlingError>() {
            error!(
                event = unhandled.offending().name(),
                error = %unhandled.error(),
                "unhandled error while dispatching"
            );
        }
        return;
    }
    let ctx = EventContext { fired, pipeline };
    for handler in handlers.iter() {
        if fired.is_stopped() {
            break;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (handler.call)(&ctx)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(error)) => Some(error),
            Err(payload) => Some(ComponentError::Panicked(panic_message(payload.as_ref()))),
        };
        if let Some(error) = failure {
            report_failure(pipeline, fired, &handler.component, error);
        }
    }
}

fn report_failure(
    pipeline: &Arc<PipelineCore>,
    fired: &Fired,
    component: &str,
    error: ComponentError,
) {
    warn!(
        component,
        event = fired.name(),
        %error,
        "handler failed"
    );
    if fired.is::<HandlingError>() {
        // Errors raised while handling an error are logged, never
        // re-fired.
        error!(component, %error, "handler failed while handling an error");
        return;
    }
    let wrapped = Fired::wrap(Box::new(HandlingError::new(fired.clone(), error)));
    wrapped.set_channels(fired.channels().to_vec());
    pipeline.add(wrapped);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
