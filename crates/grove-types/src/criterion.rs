//! The match-key algebra shared by events and channels.
//!
//! Every event and every channel exposes a [`Criterion`]. Handlers are
//! registered against criteria, and the dispatcher asks the event and
//! the channel whether they accept a handler's key. The relation is
//! asymmetric: the event/channel side decides, the handler key is
//! passive data.
//!
//! # Variants
//!
//! | Variant | Used by | Matching |
//! |---------|---------|----------|
//! | [`Any`](Criterion::Any) | broadcast channel, match-every-event handlers | wildcard |
//! | [`Type`](Criterion::Type) | typed events, class-like channels | key equality, plus declared ancestry on the event side |
//! | [`Name`](Criterion::Name) | named events, named channels | string equality |
//! | [`Component`](Criterion::Component) | a component's SELF channel | id equality |
//!
//! The algebra itself is pure data; the actual `matches` decisions live
//! with the event and channel types that own a criterion.

use crate::ComponentId;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A type identifier with a human-readable name attached.
///
/// Equality and hashing consider only the [`TypeId`]; the name is kept
/// for diagnostics and log output.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Returns the key for the type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    /// Returns the unqualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// An opaque comparable match key.
///
/// # Example
///
/// ```
/// use grove_types::Criterion;
///
/// struct Ping;
///
/// let by_type = Criterion::of::<Ping>();
/// let by_name = Criterion::name("ping");
///
/// assert_eq!(by_type, Criterion::of::<Ping>());
/// assert_ne!(by_type, by_name);
/// assert_ne!(by_type, Criterion::Any);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Criterion {
    /// The universal key. As a channel criterion this is the broadcast
    /// channel; as a handler's event key it matches every event.
    Any,
    /// A concrete Rust type.
    Type(TypeKey),
    /// A plain string key. Matches by equality only.
    Name(Arc<str>),
    /// A component's own identity, the criterion of its SELF channel.
    Component(ComponentId),
}

impl Criterion {
    /// Returns the type criterion for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self::Type(TypeKey::of::<T>())
    }

    /// Returns a name criterion.
    #[must_use]
    pub fn name(name: impl AsRef<str>) -> Self {
        Self::Name(Arc::from(name.as_ref()))
    }

    /// Returns `true` for the universal key.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Type(key) => write!(f, "{key}"),
            Self::Name(name) => write!(f, "\"{name}\""),
            Self::Component(id) => write!(f, "{id}"),
        }
    }
}

/// Strips module segments and generic brackets from `type_name`.
fn short_type_name<T: 'static>() -> &'static str {
    let full = std::any::type_name::<T>();
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}
