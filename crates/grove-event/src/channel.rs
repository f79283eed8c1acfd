//! Routing labels.
//!
//! A [`Channel`] is a cheap clonable handle over a [`ChannelKind`].
//! The set of channel kinds is open: this crate ships the broadcast
//! channel and [`NamedChannel`]; the runtime adds component SELF
//! channels and subchannels by implementing `ChannelKind` itself.
//!
//! Channels compare by criterion, so a subchannel that delegates its
//! criterion to a parent channel is equal to that parent for routing
//! purposes.

use grove_types::Criterion;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A concrete channel implementation behind a [`Channel`] handle.
pub trait ChannelKind: Send + Sync + 'static {
    /// The channel's match key.
    fn criterion(&self) -> Criterion;

    /// Upcast for recovering the concrete kind from a handle.
    fn as_any(&self) -> &dyn Any;
}

/// A routing label. Events are fired on channels; handlers subscribe
/// to channel criteria.
///
/// # Example
///
/// ```
/// use grove_event::{Channel, Criterion};
///
/// let all = Channel::broadcast();
/// let log = Channel::named("log");
///
/// // The broadcast channel accepts every handler key.
/// assert!(all.matches(&Criterion::name("log")));
/// // A named channel accepts its own key and the universal key.
/// assert!(log.matches(&Criterion::name("log")));
/// assert!(log.matches(&Criterion::Any));
/// assert!(!log.matches(&Criterion::name("audit")));
/// ```
#[derive(Clone)]
pub struct Channel {
    kind: Arc<dyn ChannelKind>,
}

impl Channel {
    /// The broadcast channel. Events fired here reach handlers on any
    /// channel key; handlers bound here receive events from any
    /// channel.
    #[must_use]
    pub fn broadcast() -> Self {
        static BROADCAST: OnceLock<Channel> = OnceLock::new();
        BROADCAST
            .get_or_init(|| Channel::from_kind(Arc::new(Broadcast)))
            .clone()
    }

    /// A channel identified by a string.
    #[must_use]
    pub fn named(name: impl AsRef<str>) -> Self {
        Channel::from_kind(Arc::new(NamedChannel::new(name)))
    }

    /// Wraps a concrete channel kind.
    #[must_use]
    pub fn from_kind(kind: Arc<dyn ChannelKind>) -> Self {
        Self { kind }
    }

    /// The channel's match key.
    #[must_use]
    pub fn criterion(&self) -> Criterion {
        self.kind.criterion()
    }

    /// Whether this is the broadcast channel (or any kind whose
    /// criterion is the universal key).
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.criterion().is_any()
    }

    /// Whether a handler registered under `handler_key` listens to
    /// this channel. Pure and safe for concurrent evaluation.
    #[must_use]
    pub fn matches(&self, handler_key: &Criterion) -> bool {
        handler_key.is_any() || self.is_broadcast() || *handler_key == self.criterion()
    }

    /// Recovers the concrete kind, if it is a `K`.
    #[must_use]
    pub fn kind_as<K: ChannelKind>(&self) -> Option<&K> {
        self.kind.as_any().downcast_ref::<K>()
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.criterion() == other.criterion()
    }
}

impl Eq for Channel {}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Channel({})", self.criterion())
    }
}

struct Broadcast;

impl ChannelKind for Broadcast {
    fn criterion(&self) -> Criterion {
        Criterion::Any
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A channel identified by a string, matching by equality.
pub struct NamedChannel {
    name: Arc<str>,
}

impl NamedChannel {
    /// Creates a named channel kind.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
        }
    }

    /// The channel's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ChannelKind for NamedChannel {
    fn criterion(&self) -> Criterion {
        Criterion::Name(Arc::clone(&self.name))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
