//! Subchannels: per-connection context riding on a parent channel.
//!
//! A [`Subchannel`] shares its parent channel's criterion, so handlers
//! bound to the parent channel receive events fired on any of its
//! subchannels. What the subchannel adds:
//!
//! - an **association map**, a small concurrent dictionary keyed by
//!   type tags or names, threading per-connection state (a session, a
//!   codec, a buffer pool lease) through converter chains;
//! - a **response pipeline**, a dedicated event pipeline so responses
//!   for one connection are serialized among themselves and never
//!   block another connection;
//! - optionally an **upstream link** to the subchannel one converter
//!   closer to the origin. The link is weak and never pins the
//!   upstream; a strong back-link can be installed in the upstream's
//!   association map so the downstream can be found from there.
//!
//! Association lookups fall back along the upstream chain, so a
//! handler deep in a converter stack still sees, say, the TLS
//! session installed two hops up.

use crate::pipeline::Pipeline;
use grove_event::{Channel, ChannelKind};
use grove_types::Criterion;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

type AssocValue = Arc<dyn Any + Send + Sync>;

struct Inner {
    parent: Channel,
    associations: RwLock<HashMap<Criterion, AssocValue>>,
    response: Pipeline,
    upstream: RwLock<Option<Weak<Inner>>>,
}

/// A channel wrapping a parent channel with per-connection state.
///
/// Cheap to clone; clones share the association map and response
/// pipeline. Convert into a routing label with
/// [`as_channel`](Subchannel::as_channel); handlers recover the
/// subchannel from an event via `EventContext::subchannel`.
#[derive(Clone)]
pub struct Subchannel {
    inner: Arc<Inner>,
}

impl Subchannel {
    /// Creates a subchannel of `parent` with the given response
    /// pipeline.
    #[must_use]
    pub fn new(parent: &Channel, response: Pipeline) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: parent.clone(),
                associations: RwLock::new(HashMap::new()),
                response,
                upstream: RwLock::new(None),
            }),
        }
    }

    /// Creates a subchannel linked to an upstream subchannel. The
    /// upstream reference is weak.
    #[must_use]
    pub fn linked(parent: &Channel, response: Pipeline, upstream: &Subchannel) -> Self {
        let subchannel = Self::new(parent, response);
        *subchannel.inner.upstream.write() = Some(Arc::downgrade(&upstream.inner));
        subchannel
    }

    /// The wrapped parent channel.
    #[must_use]
    pub fn parent_channel(&self) -> &Channel {
        &self.inner.parent
    }

    /// The dedicated response pipeline.
    #[must_use]
    pub fn response_pipeline(&self) -> &Pipeline {
        &self.inner.response
    }

    /// The upstream subchannel, while it is still alive.
    #[must_use]
    pub fn upstream(&self) -> Option<Subchannel> {
        self.inner
            .upstream
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Subchannel { inner })
    }

    /// Installs this subchannel in the upstream's association map
    /// under `key`, so the downstream can be located given the
    /// upstream. The back-link holds the downstream strongly; the
    /// forward link stays weak.
    pub fn link_back(&self, upstream: &Subchannel, key: Criterion) {
        upstream.set_associated_by(key, Arc::new(self.clone()));
    }

    /// This subchannel as a routing label. Equal to the parent channel
    /// for matching purposes.
    #[must_use]
    pub fn as_channel(&self) -> Channel {
        Channel::from_kind(Arc::new(self.clone()))
    }

    /// Associates a value under the type tag `T`, replacing any
    /// previous value.
    pub fn set_associated<T: Any + Send + Sync>(&self, value: T) {
        self.set_associated_by(Criterion::of::<T>(), Arc::new(value));
    }

    /// Associates a value under an explicit key.
    pub fn set_associated_by(&self, key: Criterion, value: AssocValue) {
        self.inner.associations.write().insert(key, value);
    }

    /// The value associated under the type tag `T`, looked up on this
    /// subchannel first and then along the upstream chain.
    #[must_use]
    pub fn associated<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.associated_by(&Criterion::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// The value associated under an explicit key, with the same
    /// upstream fallback.
    #[must_use]
    pub fn associated_by(&self, key: &Criterion) -> Option<AssocValue> {
        let mut current = Some(Arc::clone(&self.inner));
        while let Some(inner) = current {
            if let Some(value) = inner.associations.read().get(key) {
                return Some(Arc::clone(value));
            }
            current = inner.upstream.read().as_ref().and_then(Weak::upgrade);
        }
        None
    }

    /// Whether two handles refer to the same subchannel.
    #[must_use]
    pub fn same(&self, other: &Subchannel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl ChannelKind for Subchannel {
    fn criterion(&self) -> Criterion {
        self.inner.parent.criterion()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for Subchannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subchannel({})", self.inner.parent.criterion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Manager;
    use crate::runtime::Runtime;
    use grove_component::ComponentType;

    struct Hub;
    impl ComponentType for Hub {
        fn channel(&self) -> Option<Channel> {
            Some(Channel::named("hub"))
        }
    }

    fn hub() -> Manager<Hub> {
        Manager::builder(Hub).runtime(Runtime::new()).mount()
    }

    #[test]
    fn shares_parent_criterion() {
        let manager = hub();
        let sub = manager.new_subchannel();
        assert_eq!(sub.as_channel(), manager.channel());
        assert!(sub.as_channel().matches(&Criterion::name("hub")));
    }

    #[test]
    fn association_round_trip() {
        struct Session {
            user: &'static str,
        }

        let sub = hub().new_subchannel();
        sub.set_associated(Session { user: "alice" });
        let session = sub.associated::<Session>().expect("session present");
        assert_eq!(session.user, "alice");
        assert!(sub.associated::<String>().is_none());
    }

    #[test]
    fn association_replaces() {
        let sub = hub().new_subchannel();
        sub.set_associated(1u32);
        sub.set_associated(2u32);
        assert_eq!(sub.associated::<u32>().as_deref(), Some(&2));
    }

    #[test]
    fn lookup_falls_back_upstream() {
        let manager = hub();
        let upstream = manager.new_subchannel();
        upstream.set_associated("from-upstream".to_string());
        let downstream = Subchannel::linked(
            &manager.channel(),
            manager.new_event_pipeline(),
            &upstream,
        );

        let found = downstream.associated::<String>().expect("fallback value");
        assert_eq!(found.as_str(), "from-upstream");

        // The nearer value wins once set.
        downstream.set_associated("local".to_string());
        assert_eq!(
            downstream.associated::<String>().as_deref().map(String::as_str),
            Some("local")
        );
    }

    #[test]
    fn upstream_is_not_pinned() {
        let manager = hub();
        let downstream = {
            let upstream = manager.new_subchannel();
            Subchannel::linked(&manager.channel(), manager.new_event_pipeline(), &upstream)
        };
        assert!(downstream.upstream().is_none());
        assert!(downstream.associated::<String>().is_none());
    }

    #[test]
    fn back_link_locates_downstream() {
        struct WebSocket;

        let manager = hub();
        let upstream = manager.new_subchannel();
        let downstream = Subchannel::linked(
            &manager.channel(),
            manager.new_event_pipeline(),
            &upstream,
        );
        downstream.link_back(&upstream, Criterion::of::<WebSocket>());

        let found = upstream
            .associated::<Subchannel>()
            .map(|_| ())
            .is_some();
        // The back-link key was explicit, not the Subchannel type tag.
        assert!(!found);
        let via_key = upstream
            .associated_by(&Criterion::of::<WebSocket>())
            .and_then(|value| value.downcast::<Subchannel>().ok())
            .expect("back-link present");
        assert!(via_key.same(&downstream));
    }

    #[test]
    fn recovered_from_channel_handle() {
        let sub = hub().new_subchannel();
        let channel = sub.as_channel();
        let recovered = channel.kind_as::<Subchannel>().expect("subchannel kind");
        assert!(recovered.same(&sub));
    }
}
