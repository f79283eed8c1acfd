//! The event trait and its helpers.
//!
//! Concrete event types implement [`EventKind`]; a blanket impl turns
//! every `EventKind` into an object-safe [`Event`]. Type-hierarchy
//! matching is expressed through [`EventKind::ancestry`]: an event type
//! lists the criteria of the types it wants to be handled *as*, and a
//! handler bound to any of those keys receives it. This replaces
//! runtime reflection with an explicit declaration while keeping the
//! cross-type subscription semantics.
//!
//! # Example
//!
//! ```
//! use grove_event::{Criterion, Event, EventKind};
//!
//! struct Opened;
//! struct FileOpened;
//!
//! impl EventKind for Opened {}
//!
//! impl EventKind for FileOpened {
//!     fn ancestry(&self) -> Vec<Criterion> {
//!         vec![Criterion::of::<Opened>()]
//!     }
//! }
//!
//! let event: &dyn Event = &FileOpened;
//! assert!(event.matches(&Criterion::of::<FileOpened>()));
//! assert!(event.matches(&Criterion::of::<Opened>()));
//! assert!(event.matches(&Criterion::Any));
//! assert!(!event.matches(&Criterion::name("FileOpened")));
//! ```

use grove_types::{Criterion, TypeKey};
use std::any::Any;
use std::sync::Arc;

/// A value routed through the runtime.
///
/// Object-safe; the runtime stores events as `Box<dyn Event>` behind a
/// [`Fired`](crate::Fired) handle. Do not implement this directly,
/// implement [`EventKind`]; the blanket impl supplies `Event`.
pub trait Event: Any + Send + Sync {
    /// The event's own match key.
    fn criterion(&self) -> Criterion;

    /// Whether a handler registered under `handler_key` receives this
    /// event. Pure and safe for concurrent evaluation.
    fn matches(&self, handler_key: &Criterion) -> bool;

    /// Short diagnostic name, used in logs and `HandlingError` output.
    fn name(&self) -> &str;

    /// Whether the runtime emits a `Completed` event once this event's
    /// open count returns to zero. Completion meta-events themselves
    /// opt out to terminate the regress.
    fn emits_completed(&self) -> bool;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// Sized helper trait for concrete event types.
///
/// All methods have defaults; a plain `impl EventKind for MyEvent {}`
/// yields a typed event matching its own type. Override
/// [`criterion`](Self::criterion) for per-instance keys (see
/// [`NamedEvent`]), [`ancestry`](Self::ancestry) for hierarchy
/// matching.
pub trait EventKind: Send + Sync + Sized + 'static {
    /// The event's match key. Defaults to the type itself.
    fn criterion(&self) -> Criterion {
        Criterion::of::<Self>()
    }

    /// Criteria of the event types this event also matches as.
    ///
    /// Defaults to none. The event's own criterion and
    /// [`Criterion::Any`] always match and need not be listed.
    fn ancestry(&self) -> Vec<Criterion> {
        Vec::new()
    }

    /// Short diagnostic name. Defaults to the type's short name.
    fn name(&self) -> &str {
        TypeKey::of::<Self>().name()
    }

    /// See [`Event::emits_completed`].
    fn emits_completed(&self) -> bool {
        true
    }
}

impl<T: EventKind> Event for T {
    fn criterion(&self) -> Criterion {
        EventKind::criterion(self)
    }

    fn matches(&self, handler_key: &Criterion) -> bool {
        handler_key.is_any()
            || *handler_key == EventKind::criterion(self)
            || self.ancestry().contains(handler_key)
    }

    fn name(&self) -> &str {
        EventKind::name(self)
    }

    fn emits_completed(&self) -> bool {
        EventKind::emits_completed(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An event identified by a string instead of a type.
///
/// Named events match handler keys by string equality only (plus the
/// universal key). Useful for dynamically constructed subscriptions
/// where no Rust type exists.
///
/// # Example
///
/// ```
/// use grove_event::{Criterion, Event, NamedEvent};
///
/// let event: &dyn Event = &NamedEvent::new("cache/flush");
/// assert!(event.matches(&Criterion::name("cache/flush")));
/// assert!(!event.matches(&Criterion::name("cache/fill")));
/// ```
pub struct NamedEvent {
    name: Arc<str>,
}

impl NamedEvent {
    /// Creates a named event.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }
}

impl EventKind for NamedEvent {
    fn criterion(&self) -> Criterion {
        Criterion::Name(Arc::clone(&self.name))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base;
    struct Derived;

    impl EventKind for Base {}

    impl EventKind for Derived {
        fn ancestry(&self) -> Vec<Criterion> {
            vec![Criterion::of::<Base>()]
        }
    }

    fn as_event<E: Event>(event: &E) -> &dyn Event {
        event
    }

    #[test]
    fn typed_event_matches_own_key() {
        let base = as_event(&Base);
        assert!(base.matches(&Criterion::of::<Base>()));
        assert!(!base.matches(&Criterion::of::<Derived>()));
    }

    #[test]
    fn typed_event_matches_ancestry() {
        let derived = as_event(&Derived);
        assert!(derived.matches(&Criterion::of::<Derived>()));
        assert!(derived.matches(&Criterion::of::<Base>()));
        // Matching is not symmetric.
        assert!(!as_event(&Base).matches(&Criterion::of::<Derived>()));
    }

    #[test]
    fn any_key_matches_everything() {
        assert!(as_event(&Base).matches(&Criterion::Any));
        assert!(as_event(&Derived).matches(&Criterion::Any));
        assert!(as_event(&NamedEvent::new("n")).matches(&Criterion::Any));
    }

    #[test]
    fn named_event_matches_by_string() {
        let event = NamedEvent::new("tick");
        let event = as_event(&event);
        assert!(event.matches(&Criterion::name("tick")));
        assert!(!event.matches(&Criterion::name("tock")));
        assert!(!event.matches(&Criterion::of::<Base>()));
        assert_eq!(event.name(), "tick");
        assert_eq!(event.criterion(), Criterion::name("tick"));
    }

    #[test]
    fn event_name_is_type_name() {
        assert_eq!(as_event(&Base).name(), "Base");
        assert_eq!(as_event(&Derived).name(), "Derived");
    }

    #[test]
    fn completion_is_emitted_by_default() {
        assert!(as_event(&Base).emits_completed());
    }

    #[test]
    fn downcast_through_as_any() {
        let boxed: Box<dyn Event> = Box::new(Derived);
        assert!(boxed.as_any().downcast_ref::<Derived>().is_some());
        assert!(boxed.as_any().downcast_ref::<Base>().is_none());
    }
}
