//! Core vocabulary for the grove event runtime.
//!
//! This crate is the bottom layer of the workspace. It carries the
//! types every other crate agrees on, and nothing else:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  grove-runtime : tree, pipelines, dispatch, registry    │
//! ├─────────────────────────────────────────────────────────┤
//! │  grove-component : ComponentType, Handling              │
//! ├─────────────────────────────────────────────────────────┤
//! │  grove-event : Event, Channel, Fired                    │
//! ├─────────────────────────────────────────────────────────┤
//! │  grove-types : ids, Criterion, ErrorCode   ◄── HERE     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`ComponentId`], [`PipelineId`], [`GeneratorId`] - uuid-backed
//!   identities for components, event pipelines and work generators
//! - [`Criterion`] / [`TypeKey`] - the match-key algebra used by both
//!   events and channels
//! - [`ErrorCode`] - the unified machine-readable error convention

mod criterion;
mod error;
mod id;

pub use criterion::{Criterion, TypeKey};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ComponentId, GeneratorId, PipelineId};
