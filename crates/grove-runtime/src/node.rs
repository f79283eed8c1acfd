//! Nodes of the component tree.
//!
//! A [`Node`] is one mounted component: its identity, its default
//! channel, its state, its handler references and its place in the
//! parent/child graph. All nodes of one tree share a
//! [`Tree`](crate::tree::Tree).
//!
//! Structural changes (attach, detach) run under a single process-wide
//! mutation lock. Critical sections are short, amount to pointer
//! swaps and cache clears, and one lock cannot deadlock; the
//! structural events are fired after the lock is released.

use crate::dispatch::HandlerRef;
use crate::error::StructureError;
use crate::events::{Attached, Detached};
use crate::runtime::Runtime;
use crate::tree::Tree;
use grove_event::{Channel, ChannelKind, Event, Fired};
use grove_types::{ComponentId, Criterion};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::any::Any;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Serializes attach/detach across all trees.
static STRUCTURE: Mutex<()> = Mutex::new(());

/// A component's reflection surface: identity and name, as carried by
/// structural events and returned by the tree accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    id: ComponentId,
    name: String,
}

impl ComponentInfo {
    /// The component's identity.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The component's simple name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The SELF channel of a component: criterion is the component's own
/// identity.
struct SelfChannel {
    id: ComponentId,
}

impl ChannelKind for SelfChannel {
    fn criterion(&self) -> Criterion {
        Criterion::Component(self.id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct Node {
    id: ComponentId,
    name: String,
    channel: Channel,
    state: Arc<Mutex<Box<dyn Any + Send>>>,
    parent: RwLock<Weak<Node>>,
    children: RwLock<Vec<Arc<Node>>>,
    handlers: RwLock<Vec<HandlerRef>>,
    tree: RwLock<Arc<Tree>>,
}

impl Node {
    /// Mounts a component as the root of its own fresh tree.
    pub(crate) fn new(
        name: String,
        channel: Option<Channel>,
        state: Box<dyn Any + Send>,
        runtime: Arc<Runtime>,
    ) -> Arc<Self> {
        let id = ComponentId::new();
        let channel = channel.unwrap_or_else(|| Channel::from_kind(Arc::new(SelfChannel { id })));
        let tree = Tree::new(runtime);
        let node = Arc::new(Self {
            id,
            name,
            channel,
            state: Arc::new(Mutex::new(state)),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
            handlers: RwLock::new(Vec::new()),
            tree: RwLock::new(Arc::clone(&tree)),
        });
        tree.set_root(&node);
        node
    }

    pub(crate) fn id(&self) -> ComponentId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn channel(&self) -> &Channel {
        &self.channel
    }

    pub(crate) fn state(&self) -> &Arc<Mutex<Box<dyn Any + Send>>> {
        &self.state
    }

    pub(crate) fn tree(&self) -> Arc<Tree> {
        Arc::clone(&self.tree.read())
    }

    pub(crate) fn parent_node(&self) -> Option<Arc<Node>> {
        self.parent.read().upgrade()
    }

    pub(crate) fn child_nodes(&self) -> Vec<Arc<Node>> {
        self.children.read().clone()
    }

    pub(crate) fn info(&self) -> ComponentInfo {
        ComponentInfo {
            id: self.id,
            name: self.name.clone(),
        }
    }

    /// Registers a handler reference and invalidates the lookup cache.
    pub(crate) fn add_handler_ref(&self, handler: HandlerRef) {
        self.handlers.write().push(handler);
        self.tree().clear_handler_cache();
    }
}

/// Attaches `child`, a detached root, under `parent`. The child's
/// subtree adopts the parent's tree (pipeline, cache, runtime) and any
/// events buffered in the child's tree migrate along. Fires
/// `Attached`: on broadcast when either default channel is broadcast,
/// once on the shared channel when both are equal, else on both.
pub(crate) fn attach(parent: &Arc<Node>, child: &Arc<Node>) -> Result<(), StructureError> {
    {
        let _guard = STRUCTURE.lock();
        if child.parent.read().upgrade().is_some() {
            return Err(StructureError::AlreadyAttached);
        }
        let parent_tree = parent.tree();
        let child_tree = child.tree();
        if Arc::ptr_eq(&parent_tree, &child_tree) {
            return Err(StructureError::CyclicAttach);
        }
        if child_tree.is_started() {
            return Err(StructureError::SubtreeStarted);
        }
        *child.parent.write() = Arc::downgrade(parent);
        parent.children.write().push(Arc::clone(child));
        set_subtree_tree(child, &parent_tree);
        parent_tree.adopt(child_tree.take_buffered());
        parent_tree.clear_handler_cache();
    }
    debug!(component = child.name(), under = parent.name(), "attached");

    let parent_channel = parent.channel.clone();
    let child_channel = child.channel.clone();
    let channels = if parent_channel.is_broadcast() || child_channel.is_broadcast() {
        vec![Channel::broadcast()]
    } else if parent_channel == child_channel {
        vec![parent_channel]
    } else {
        vec![parent_channel, child_channel]
    };
    fire_from(
        parent,
        Box::new(Attached::new(parent.info(), child.info())),
        channels,
    );
    Ok(())
}

/// Detaches `node` from its parent; the subtree becomes its own tree
/// with a fresh root pipeline, started when the former tree was.
/// Fires `Detached` on both sides. Detaching a root is a no-op.
pub(crate) fn detach(node: &Arc<Node>) -> bool {
    let former_parent = {
        let _guard = STRUCTURE.lock();
        let Some(parent) = node.parent.read().upgrade() else {
            return false;
        };
        parent
            .children
            .write()
            .retain(|sibling| !Arc::ptr_eq(sibling, node));
        *node.parent.write() = Weak::new();

        let old_tree = node.tree();
        let new_tree = Tree::new(Arc::clone(old_tree.runtime()));
        new_tree.set_root(node);
        set_subtree_tree(node, &new_tree);
        if old_tree.is_started() {
            new_tree.start();
        }
        old_tree.clear_handler_cache();
        parent
    };
    debug!(component = node.name(), from = former_parent.name(), "detached");

    fire_from(
        &former_parent,
        Box::new(Detached::new(former_parent.info(), node.info())),
        Vec::new(),
    );
    fire_from(
        node,
        Box::new(Detached::new(former_parent.info(), node.info())),
        Vec::new(),
    );
    true
}

/// Fires an event from a node: empty channels default to the node's
/// default channel, routing goes through the node's tree.
pub(crate) fn fire_from(node: &Arc<Node>, event: Box<dyn Event>, mut channels: Vec<Channel>) -> Fired {
    if channels.is_empty() {
        channels.push(node.channel.clone());
    }
    let fired = Fired::wrap(event);
    fired.set_channels(channels);
    node.tree().fire(fired.clone());
    fired
}

/// Collects the handlers of `node` and its subtree matching the event
/// and at least one of the channels, in pre-order.
pub(crate) fn collect_handlers(
    node: &Arc<Node>,
    event: &dyn Event,
    channels: &[Channel],
    out: &mut Vec<HandlerRef>,
) {
    {
        let handlers = node.handlers.read();
        for handler in handlers.iter() {
            if !event.matches(&handler.event_key) {
                continue;
            }
            if !channels
                .iter()
                .any(|channel| channel.matches(&handler.channel_key))
            {
                continue;
            }
            out.push(handler.clone());
        }
    }
    for child in node.child_nodes() {
        collect_handlers(&child, event, channels, out);
    }
}

fn set_subtree_tree(node: &Arc<Node>, tree: &Arc<Tree>) {
    let mut stack = vec![Arc::clone(node)];
    while let Some(current) = stack.pop() {
        *current.tree.write() = Arc::clone(tree);
        stack.extend(current.child_nodes());
    }
}

/// The slash-separated chain of simple names from the root down to
/// `node`.
pub(crate) fn path(node: &Arc<Node>) -> String {
    let mut names = vec![node.name.clone()];
    let mut current = node.parent_node();
    while let Some(ancestor) = current {
        names.push(ancestor.name.clone());
        current = ancestor.parent_node();
    }
    names.reverse();
    format!("/{}", names.join("/"))
}

/// Pre-order iterator over a subtree.
pub struct ComponentIter {
    stack: Vec<Arc<Node>>,
}

impl ComponentIter {
    pub(crate) fn new(start: Arc<Node>) -> Self {
        Self { stack: vec![start] }
    }
}

impl Iterator for ComponentIter {
    type Item = ComponentInfo;

    fn next(&mut self) -> Option<ComponentInfo> {
        let node = self.stack.pop()?;
        let mut children = node.child_nodes();
        children.reverse();
        self.stack.extend(children);
        Some(node.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> Arc<Node> {
        Node::new(name.to_string(), None, Box::new(()), Runtime::new())
    }

    fn named(name: &str, channel: &str) -> Arc<Node> {
        Node::new(
            name.to_string(),
            Some(Channel::named(channel)),
            Box::new(()),
            Runtime::new(),
        )
    }

    #[test]
    fn fresh_node_is_its_own_root() {
        let n = node("root");
        assert!(n.parent_node().is_none());
        assert!(n.child_nodes().is_empty());
        assert!(n.tree().root().is_some_and(|r| Arc::ptr_eq(&r, &n)));
    }

    #[test]
    fn attach_merges_trees() {
        let parent = node("parent");
        let child = node("child");
        attach(&parent, &child).expect("attach");

        assert!(child
            .parent_node()
            .is_some_and(|p| Arc::ptr_eq(&p, &parent)));
        assert_eq!(parent.child_nodes().len(), 1);
        assert!(Arc::ptr_eq(&parent.tree(), &child.tree()));
    }

    #[test]
    fn attach_rejects_attached_child() {
        let parent = node("parent");
        let other = node("other");
        let child = node("child");
        attach(&parent, &child).expect("first attach");

        assert_eq!(
            attach(&other, &child),
            Err(StructureError::AlreadyAttached)
        );
    }

    #[test]
    fn attach_rejects_started_subtree() {
        let parent = node("parent");
        let child = node("child");
        child.tree().start();

        assert_eq!(attach(&parent, &child), Err(StructureError::SubtreeStarted));
        assert!(child.parent_node().is_none());
        assert!(parent.child_nodes().is_empty());
    }

    #[test]
    fn attach_rejects_own_tree() {
        let parent = node("parent");
        let child = node("child");
        attach(&parent, &child).expect("attach");

        assert_eq!(attach(&child, &parent), Err(StructureError::CyclicAttach));
    }

    #[test]
    fn detach_makes_standalone_tree() {
        let parent = node("parent");
        let child = node("child");
        attach(&parent, &child).expect("attach");

        assert!(detach(&child));
        assert!(child.parent_node().is_none());
        assert!(parent.child_nodes().is_empty());
        assert!(!Arc::ptr_eq(&parent.tree(), &child.tree()));
        assert!(child.tree().root().is_some_and(|r| Arc::ptr_eq(&r, &child)));
    }

    #[test]
    fn detach_of_root_is_noop() {
        let n = node("root");
        assert!(!detach(&n));
        assert!(!detach(&n));
    }

    #[test]
    fn detached_tree_inherits_started_state() {
        let parent = node("parent");
        let child = node("child");
        attach(&parent, &child).expect("attach");
        parent.tree().start();

        detach(&child);
        assert!(child.tree().is_started());
    }

    #[test]
    fn path_is_root_first() {
        let root = node("root");
        let mid = node("mid");
        let leaf = node("leaf");
        attach(&root, &mid).expect("attach mid");
        attach(&mid, &leaf).expect("attach leaf");

        assert_eq!(path(&root), "/root");
        assert_eq!(path(&leaf), "/root/mid/leaf");
    }

    #[test]
    fn iterator_is_preorder() {
        let root = node("root");
        let n1 = node("n1");
        let n2 = node("n2");
        let leaves: Vec<_> = (3..=8).map(|i| node(&format!("n{i}"))).collect();
        attach(&root, &n1).expect("attach n1");
        attach(&root, &n2).expect("attach n2");
        for leaf in &leaves[..3] {
            attach(&n1, leaf).expect("attach under n1");
        }
        for leaf in &leaves[3..] {
            attach(&n2, leaf).expect("attach under n2");
        }

        let names: Vec<_> = ComponentIter::new(root)
            .map(|info| info.name().to_string())
            .collect();
        assert_eq!(
            names,
            ["root", "n1", "n3", "n4", "n5", "n2", "n6", "n7", "n8"]
        );
    }

    #[test]
    fn self_channels_are_distinct() {
        let a = node("a");
        let b = node("b");
        assert_ne!(a.channel(), b.channel());
        assert_eq!(a.channel().criterion(), Criterion::Component(a.id()));
    }

    #[test]
    fn named_default_channels_compare_by_name() {
        let a = named("a", "shared");
        let b = named("b", "shared");
        assert_eq!(a.channel(), b.channel());
    }
}
