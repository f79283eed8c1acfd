//! Event and channel types for the grove event runtime.
//!
//! This crate defines what flows through the runtime, not how it is
//! routed. Routing (trees, pipelines, dispatch) lives in
//! `grove-runtime`.
//!
//! # Model
//!
//! ```text
//!   fire(event, channels)
//!        │
//!        ▼
//!   ┌──────────┐   wraps    ┌──────────────────────────────┐
//!   │  Event   │ ─────────► │  Fired                       │
//!   │ (value)  │            │  open count, causal parent,  │
//!   └──────────┘            │  stop flag, result, get()    │
//!                           └──────────────────────────────┘
//! ```
//!
//! - [`Event`] is the object-safe trait every routed value implements.
//!   Concrete event types implement the sized helper [`EventKind`] and
//!   get `Event` for free; [`NamedEvent`] implements `Event` directly
//!   with a string criterion.
//! - [`Channel`] is a cheap clonable routing label over a
//!   [`ChannelKind`]; channels compare by criterion.
//! - [`Fired`] is the shared lifecycle handle of one fired event. It
//!   carries the open-handler count, the weak link to the event whose
//!   handler fired it, the per-event stop flag, the recorded channels
//!   and the settable result.
//!
//! # Matching
//!
//! The match relation is asymmetric and pure. An event accepts a
//! handler's event key if the key is [`Criterion::Any`], equals the
//! event's own criterion, or appears in the event type's declared
//! ancestry. A channel accepts a handler's channel key if the key is
//! `Any`, the channel is the broadcast channel, or the key equals the
//! channel's criterion.
//!
//! [`Criterion::Any`]: grove_types::Criterion::Any

mod channel;
mod error;
mod event;
mod fired;

pub use channel::{Channel, ChannelKind, NamedChannel};
pub use error::EventError;
pub use event::{Event, EventKind, NamedEvent};
pub use fired::Fired;

// Re-exported so downstream crates name one vocabulary.
pub use grove_types::{Criterion, TypeKey};
