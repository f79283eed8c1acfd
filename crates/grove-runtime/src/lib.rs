//! The grove event runtime.
//!
//! Application logic is a tree of components exchanging typed events
//! over channels. Handlers are dispatched across the whole tree by
//! match keys and priority; events are processed on per-scope FIFO
//! pipelines drawing workers from a shared pool; causal links between
//! events make a tree of related work quiesce as one.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Manager<C>                            │
//! │  attach / detach / fire / on / start / stop / pipelines      │
//! └──────────────────────────────────────────────────────────────┘
//!        │                     │                      │
//!        ▼                     ▼                      ▼
//! ┌─────────────┐      ┌──────────────┐      ┌────────────────┐
//! │  Component  │      │   Pipeline   │      │    Runtime     │
//! │  tree +     │◄─────│   FIFO drain │─────►│  executor +    │
//! │  handler    │ dis- │   on shared  │ gen- │  generator     │
//! │  cache      │ patch│   pool       │ era- │  registry      │
//! └─────────────┘      └──────────────┘ tors └────────────────┘
//! ```
//!
//! # The short tour
//!
//! 1. Mount components with [`Manager::new`] (or
//!    [`Manager::builder`]) and [`attach`](Manager::attach) them into
//!    a tree.
//! 2. Register handlers with [`on`](Manager::on) (typed) or
//!    [`add_handler`](Manager::add_handler) (declarative,
//!    cross-product of event keys × channel keys).
//! 3. [`start`](Manager::start) the tree: `Start` goes out on
//!    broadcast, the buffering root pipeline becomes a live one.
//! 4. [`fire`](Manager::fire) events. Handlers fire follow-ups;
//!    children keep their parents open, so
//!    [`Runtime::await_exhaustion`] returns only when the whole
//!    causal family (and every registered generator) is done.
//!
//! # Ordering and blocking
//!
//! Within one pipeline dispatch is strictly FIFO; across pipelines
//! there is no ordering. Handlers run to completion on the pipeline's
//! worker and may block; the blocking core operations are
//! [`Fired::get`], [`Runtime::await_exhaustion`] and the draining
//! [`Manager::stop`]. There is no cancellation: a fired event runs to
//! completion.
//!
//! # Errors
//!
//! Misuse (attaching an attached node, firing on a foreign pipeline)
//! fails synchronously with [`StructureError`] / [`PipelineError`].
//! Handler failures never abort a pipeline: they become
//! [`events::HandlingError`] events on the failing event's channels,
//! logged by a default sink when nothing handles them.

mod components;
mod dispatch;
mod error;
pub mod events;
mod executor;
mod feedback;
mod manager;
mod node;
mod pipeline;
mod queue;
mod registry;
mod runtime;
mod subchannel;
pub mod testing;
mod tree;

pub use components::ActionRunner;
pub use dispatch::EventContext;
pub use error::{PipelineError, StructureError};
pub use executor::Executor;
pub use manager::{Manager, Mount};
pub use node::{ComponentInfo, ComponentIter};
pub use pipeline::Pipeline;
pub use registry::{Generator, GeneratorRegistry};
pub use runtime::{Runtime, RuntimeBuilder, StopDrain};
pub use subchannel::Subchannel;

// The vocabulary of the lower layers, re-exported so applications
// depend on one crate.
pub use grove_component::{ComponentError, ComponentType, Handling};
pub use grove_event::{
    Channel, ChannelKind, Criterion, Event, EventError, EventKind, Fired, NamedChannel, NamedEvent,
};
pub use grove_types::{ComponentId, ErrorCode, GeneratorId, PipelineId, TypeKey};
