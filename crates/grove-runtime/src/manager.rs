//! The component manager, the application-facing surface.
//!
//! A [`Manager`] wraps any [`ComponentType`] value mounted into a
//! component tree. It is the one handle through which applications
//! build trees, register handlers, fire events and run the lifecycle:
//!
//! ```
//! use grove_runtime::{events::Start, Channel, Manager};
//!
//! struct Counter {
//!     ticks: usize,
//! }
//!
//! impl grove_runtime::ComponentType for Counter {
//!     fn channel(&self) -> Option<Channel> {
//!         Some(Channel::broadcast())
//!     }
//! }
//!
//! struct Tick;
//! impl grove_runtime::EventKind for Tick {}
//!
//! let root = Manager::new(Counter { ticks: 0 });
//! root.on(|counter: &mut Counter, _tick: &Tick, _ctx| {
//!     counter.ticks += 1;
//!     Ok(())
//! });
//!
//! root.start();
//! let _ = root.fire(Tick).get();
//! assert_eq!(root.with_component(|c| c.ticks), Ok(1));
//! ```
//!
//! Managers are cheap to clone and may be captured by handlers; they
//! do not keep the rest of the tree alive beyond their own subtree.

use crate::dispatch::{EventContext, HandlerFn, HandlerRef};
use crate::error::StructureError;
use crate::events::{Start, Stop};
use crate::node::{self, ComponentInfo, ComponentIter, Node};
use crate::pipeline::Pipeline;
use crate::runtime::{Runtime, StopDrain};
use crate::subchannel::Subchannel;
use grove_component::{ComponentError, ComponentType, Handling};
use grove_event::{Channel, Event, EventKind, Fired};
use grove_types::{ComponentId, Criterion, TypeKey};
use std::marker::PhantomData;
use std::sync::Arc;

/// Handle to a mounted component.
///
/// Typed by the component it manages; clones share the mount.
pub struct Manager<C> {
    node: Arc<Node>,
    _component: PhantomData<fn() -> C>,
}

impl<C> Clone for Manager<C> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            _component: PhantomData,
        }
    }
}

impl<C: ComponentType> Manager<C> {
    /// Mounts a component with defaults: the type's short name, the
    /// component's own default channel, the shared runtime.
    #[must_use]
    pub fn new(component: C) -> Self {
        Self::builder(component).mount()
    }

    /// Starts configuring a mount.
    #[must_use]
    pub fn builder(component: C) -> Mount<C> {
        Mount {
            component,
            name: None,
            channel: None,
            runtime: None,
        }
    }

    /// The component's identity.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.node.id()
    }

    /// The component's simple name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.node.name()
    }

    /// The slash-separated chain of names, root first.
    #[must_use]
    pub fn path(&self) -> String {
        node::path(&self.node)
    }

    /// The component's default channel.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.node.channel().clone()
    }

    /// Identity and name, as carried by structural events.
    #[must_use]
    pub fn info(&self) -> ComponentInfo {
        self.node.info()
    }

    /// The parent component, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<ComponentInfo> {
        self.node.parent_node().map(|parent| parent.info())
    }

    /// The direct children, in attach order.
    #[must_use]
    pub fn children(&self) -> Vec<ComponentInfo> {
        self.node
            .child_nodes()
            .iter()
            .map(|child| child.info())
            .collect()
    }

    /// The root of the component's tree.
    #[must_use]
    pub fn root(&self) -> ComponentInfo {
        self.node
            .tree()
            .root()
            .map_or_else(|| self.node.info(), |root| root.info())
    }

    /// Pre-order iterator over this component's subtree.
    #[must_use]
    pub fn iter(&self) -> ComponentIter {
        ComponentIter::new(Arc::clone(&self.node))
    }

    /// The runtime this component's tree runs on.
    #[must_use]
    pub fn runtime(&self) -> Arc<Runtime> {
        Arc::clone(self.node.tree().runtime())
    }

    /// Attaches a detached root under this component.
    ///
    /// The child's subtree adopts this tree's shared state; events
    /// buffered in the child's tree migrate to this tree's root
    /// pipeline. Fires `Attached` (see the channel rules on the event).
    ///
    /// # Errors
    ///
    /// [`StructureError::AlreadyAttached`] when the child has a
    /// parent, [`StructureError::SubtreeStarted`] when the child's
    /// tree was started, [`StructureError::CyclicAttach`] when the
    /// child already belongs to this tree.
    pub fn attach<D: ComponentType>(&self, child: &Manager<D>) -> Result<(), StructureError> {
        node::attach(&self.node, &child.node)
    }

    /// Detaches this component from its parent; the subtree becomes a
    /// standalone tree. Returns `false` if there was no parent.
    pub fn detach(&self) -> bool {
        node::detach(&self.node)
    }

    /// Fires an event on the component's default channel.
    ///
    /// From inside a handler, the event goes to the pipeline executing
    /// the handler (when it serves this tree) and records the handled
    /// event as its causal parent; otherwise it goes to the tree's
    /// root pipeline.
    pub fn fire<E: EventKind>(&self, event: E) -> Fired {
        self.fire_on(event, Vec::new())
    }

    /// Fires an event on explicit channels; empty channels default to
    /// the component's default channel.
    pub fn fire_on<E: EventKind>(&self, event: E, channels: Vec<Channel>) -> Fired {
        self.fire_dyn(Box::new(event), channels)
    }

    /// Type-erased [`fire_on`](Manager::fire_on).
    pub fn fire_dyn(&self, event: Box<dyn Event>, channels: Vec<Channel>) -> Fired {
        node::fire_from(&self.node, event, channels)
    }

    /// Registers a typed handler for events of type `E` on the
    /// component's default channel, priority 0.
    pub fn on<E, F>(&self, handler: F)
    where
        E: 'static,
        F: Fn(&mut C, &E, &EventContext<'_>) -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        self.on_with(Handling::new(), handler);
    }

    /// Registers a typed handler with explicit channel keys and
    /// priority.
    ///
    /// The event key is always `E`; event keys declared on `handling`
    /// are ignored because a closure typed on `E` cannot view other
    /// concrete types. Hierarchy and multi-event subscriptions use
    /// [`add_handler`](Manager::add_handler).
    pub fn on_with<E, F>(&self, handling: Handling, handler: F)
    where
        E: 'static,
        F: Fn(&mut C, &E, &EventContext<'_>) -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        let state = Arc::clone(self.node.state());
        let expects = TypeKey::of::<E>().name();
        let call: HandlerFn = Arc::new(move |ctx| {
            let Some(event) = ctx.downcast_ref::<E>() else {
                return Err(ComponentError::failed(format!(
                    "handler expected {expects}, got {}",
                    ctx.event().name()
                )));
            };
            let mut guard = state.lock();
            let component = guard
                .downcast_mut::<C>()
                .ok_or(ComponentError::StateMismatch)?;
            handler(component, event, ctx)
        });
        self.register(vec![Criterion::of::<E>()], &handling, call);
    }

    /// Registers an untyped handler from a declarative [`Handling`].
    ///
    /// This is the dynamic subscription API: event keys default to the
    /// universal key, channel keys to the component's default channel,
    /// priority to 0. The cross product of event keys and channel keys
    /// becomes one handler reference each.
    pub fn add_handler<F>(&self, handling: Handling, handler: F)
    where
        F: Fn(&mut C, &EventContext<'_>) -> Result<(), ComponentError> + Send + Sync + 'static,
    {
        let state = Arc::clone(self.node.state());
        let call: HandlerFn = Arc::new(move |ctx| {
            let mut guard = state.lock();
            let component = guard
                .downcast_mut::<C>()
                .ok_or(ComponentError::StateMismatch)?;
            handler(component, ctx)
        });
        let event_keys = if handling.event_keys().is_empty() {
            vec![Criterion::Any]
        } else {
            handling.event_keys().to_vec()
        };
        self.register(event_keys, &handling, call);
    }

    fn register(&self, event_keys: Vec<Criterion>, handling: &Handling, call: HandlerFn) {
        let channel_keys = if handling.channel_keys().is_empty() {
            vec![self.node.channel().criterion()]
        } else {
            handling.channel_keys().to_vec()
        };
        let component: Arc<str> = Arc::from(self.node.name());
        for event_key in &event_keys {
            for channel_key in &channel_keys {
                self.node.add_handler_ref(HandlerRef {
                    event_key: event_key.clone(),
                    channel_key: channel_key.clone(),
                    priority: handling.get_priority(),
                    component: Arc::clone(&component),
                    call: Arc::clone(&call),
                });
            }
        }
    }

    /// Allocates a dedicated pipeline dispatching into this tree.
    /// Events fired on it are serialized among themselves and
    /// independent of every other pipeline.
    #[must_use]
    pub fn new_event_pipeline(&self) -> Pipeline {
        Pipeline::new(self.node.tree().new_pipeline())
    }

    /// Creates a subchannel of the component's default channel with a
    /// dedicated response pipeline.
    #[must_use]
    pub fn new_subchannel(&self) -> Subchannel {
        Subchannel::new(&self.channel(), self.new_event_pipeline())
    }

    /// Boots the tree: converts the buffering root pipeline into a
    /// processing one (re-homing everything fired so far) and fires
    /// `Start` on broadcast. Returns the `Start` handle; `get()` on it
    /// blocks until the boot fully completed.
    pub fn start(&self) -> Fired {
        self.node.tree().start();
        self.fire_on(Start, vec![Channel::broadcast()])
    }

    /// Quiesces the tree: fires `Stop` on broadcast. With the
    /// runtime's default [`StopDrain::AwaitExhaustion`] policy the
    /// call also blocks until `Stop` completed and every generator
    /// deregistered; with [`StopDrain::Deferred`] it returns right
    /// after firing.
    pub fn stop(&self) -> Fired {
        let tree = self.node.tree();
        let fired = self.fire_on(Stop, vec![Channel::broadcast()]);
        if tree.is_started() && tree.runtime().stop_drain() == StopDrain::AwaitExhaustion {
            let _ = fired.get();
            let _ = tree.runtime().await_exhaustion(None);
        }
        fired
    }

    /// Runs a closure over the component's state.
    ///
    /// Takes the component's lock; do not call from a handler of the
    /// same component.
    ///
    /// # Errors
    ///
    /// [`ComponentError::StateMismatch`] when the mounted state is not
    /// a `C` (possible only through a mismatched manager clone).
    pub fn with_component<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R, ComponentError> {
        let mut guard = self.node.state().lock();
        let component = guard
            .downcast_mut::<C>()
            .ok_or(ComponentError::StateMismatch)?;
        Ok(f(component))
    }
}

impl<C> std::fmt::Debug for Manager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Manager({})", self.node.name())
    }
}

/// Mount configuration for a component.
pub struct Mount<C> {
    component: C,
    name: Option<String>,
    channel: Option<Channel>,
    runtime: Option<Arc<Runtime>>,
}

impl<C: ComponentType> Mount<C> {
    /// Overrides the component's name (defaults to the type's short
    /// name).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the default channel (defaults to the component's
    /// [`ComponentType::channel`], or its SELF channel).
    #[must_use]
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Mounts onto a specific runtime (defaults to
    /// [`Runtime::shared`]).
    #[must_use]
    pub fn runtime(mut self, runtime: Arc<Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Performs the mount. The component becomes the root of its own
    /// fresh tree until attached elsewhere.
    #[must_use]
    pub fn mount(self) -> Manager<C> {
        let channel = self.channel.or_else(|| self.component.channel());
        let name = self
            .name
            .unwrap_or_else(|| TypeKey::of::<C>().name().to_string());
        let runtime = self.runtime.unwrap_or_else(Runtime::shared);
        Manager {
            node: Node::new(name, channel, Box::new(self.component), runtime),
            _component: PhantomData,
        }
    }
}
