//! Declarative handler metadata.
//!
//! A [`Handling`] describes where a handler listens: which event keys,
//! which channel keys, and at which priority. Registration expands the
//! cross product of event keys × channel keys into individual handler
//! references, so one declaration can cover several subscriptions.
//!
//! Empty key lists are filled in at registration time: no event keys
//! means "the closure's event type" (or the universal key for untyped
//! handlers), no channel keys means "the component's default channel".

use grove_event::{Channel, Criterion};

/// Where a handler listens.
///
/// # Example
///
/// ```
/// use grove_component::Handling;
/// use grove_event::Channel;
///
/// struct Opened;
/// struct Closed;
///
/// let handling = Handling::new()
///     .event::<Opened>()
///     .event::<Closed>()
///     .channel(&Channel::named("files"))
///     .named_channel("sockets")
///     .priority(100);
///
/// // Expands to 2 events x 2 channels = 4 handler references.
/// assert_eq!(handling.event_keys().len(), 2);
/// assert_eq!(handling.channel_keys().len(), 2);
/// assert_eq!(handling.get_priority(), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Handling {
    events: Vec<Criterion>,
    channels: Vec<Criterion>,
    priority: i32,
}

impl Handling {
    /// An empty declaration: event and channel keys filled in at
    /// registration, priority 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the event type `E` to the event keys.
    #[must_use]
    pub fn event<E: 'static>(mut self) -> Self {
        self.events.push(Criterion::of::<E>());
        self
    }

    /// Adds a named event to the event keys.
    #[must_use]
    pub fn named_event(mut self, name: impl AsRef<str>) -> Self {
        self.events.push(Criterion::name(name));
        self
    }

    /// Adds the universal event key: the handler receives every event.
    #[must_use]
    pub fn any_event(mut self) -> Self {
        self.events.push(Criterion::Any);
        self
    }

    /// Adds a raw event criterion.
    #[must_use]
    pub fn event_key(mut self, key: Criterion) -> Self {
        self.events.push(key);
        self
    }

    /// Adds a channel's criterion to the channel keys.
    #[must_use]
    pub fn channel(mut self, channel: &Channel) -> Self {
        self.channels.push(channel.criterion());
        self
    }

    /// Adds a named channel to the channel keys.
    #[must_use]
    pub fn named_channel(mut self, name: impl AsRef<str>) -> Self {
        self.channels.push(Criterion::name(name));
        self
    }

    /// Adds the universal channel key: the handler listens on every
    /// channel.
    #[must_use]
    pub fn any_channel(mut self) -> Self {
        self.channels.push(Criterion::Any);
        self
    }

    /// Adds a raw channel criterion.
    #[must_use]
    pub fn channel_key(mut self, key: Criterion) -> Self {
        self.channels.push(key);
        self
    }

    /// Sets the handler priority. Handlers run in descending priority
    /// order; the default is 0.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// The declared event keys.
    #[must_use]
    pub fn event_keys(&self) -> &[Criterion] {
        &self.events
    }

    /// The declared channel keys.
    #[must_use]
    pub fn channel_keys(&self) -> &[Criterion] {
        &self.channels
    }

    /// The declared priority.
    #[must_use]
    pub fn get_priority(&self) -> i32 {
        self.priority
    }
}
