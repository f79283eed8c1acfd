//! Runtime layer errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`StructureError::AlreadyAttached`] | `TREE_ALREADY_ATTACHED` | No |
//! | [`StructureError::SubtreeStarted`] | `TREE_SUBTREE_STARTED` | No |
//! | [`StructureError::CyclicAttach`] | `TREE_CYCLIC_ATTACH` | No |
//! | [`PipelineError::TreeGone`] | `PIPELINE_TREE_GONE` | No |
//! | [`PipelineError::ForeignFire`] | `PIPELINE_FOREIGN_FIRE` | No |
//!
//! All of these are misuse errors: they are raised synchronously to
//! the caller and never travel through the event system. Handler
//! failures are a different animal, see `HandlingError`.

use grove_types::ErrorCode;
use thiserror::Error;

/// Invalid structural operation on a component tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StructureError {
    /// The child is already attached to a parent.
    #[error("cannot attach a component that already has a parent")]
    AlreadyAttached,

    /// The child's subtree has been started and may own generators.
    #[error("cannot attach a subtree that has been started")]
    SubtreeStarted,

    /// Attaching would make a node an ancestor of itself.
    #[error("cannot attach a component into its own subtree")]
    CyclicAttach,
}

impl ErrorCode for StructureError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyAttached => "TREE_ALREADY_ATTACHED",
            Self::SubtreeStarted => "TREE_SUBTREE_STARTED",
            Self::CyclicAttach => "TREE_CYCLIC_ATTACH",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Invalid use of an event pipeline handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The component tree behind the pipeline has been dropped.
    #[error("pipeline belongs to a component tree that no longer exists")]
    TreeGone,

    /// The calling thread is executing a pipeline of a different tree.
    #[error("cannot fire from a handler running on another tree's pipeline")]
    ForeignFire,
}

impl ErrorCode for PipelineError {
    fn code(&self) -> &'static str {
        match self {
            Self::TreeGone => "PIPELINE_TREE_GONE",
            Self::ForeignFire => "PIPELINE_FOREIGN_FIRE",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
