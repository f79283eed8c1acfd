//! Component-facing contracts of the grove event runtime.
//!
//! Application logic lives in components: plain Rust values mounted
//! into a component tree by the runtime crate. This crate defines what
//! a component author touches:
//!
//! - [`ComponentType`] - the marker trait a mountable value implements,
//!   supplying its default channel
//! - [`Handling`] - the declarative handler descriptor: event keys ×
//!   channel keys × priority, expanded to the cross product when the
//!   handler is registered
//! - [`ComponentError`] - the failure type handlers return; carried
//!   inside `HandlingError` events when a handler fails
//!
//! Handler bodies themselves are closures passed to the runtime's
//! `Manager`; there is no reflection and no method-name lookup.

mod component;
mod error;
mod handling;

pub use component::ComponentType;
pub use error::ComponentError;
pub use handling::Handling;
