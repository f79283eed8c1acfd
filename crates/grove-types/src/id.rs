//! Identifier types for the grove runtime.
//!
//! All identifiers are UUID v4 newtypes. Identity is the uuid alone;
//! names and paths are presentation concerns kept elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a fresh random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the backing uuid.
            #[must_use]
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Short form keeps log lines readable.
                let text = self.0.simple().to_string();
                write!(f, concat!($prefix, ":{}"), &text[..8])
            }
        }
    };
}

id_type! {
    /// Identity of a component in a component tree.
    ///
    /// A component's id doubles as the criterion of its SELF channel,
    /// so firing on a component's own channel only reaches handlers
    /// bound to that exact component.
    ComponentId, "comp"
}

id_type! {
    /// Identity of an event pipeline.
    ///
    /// Recorded on every fired event as `processed_by` when the event
    /// is first accepted by a pipeline.
    PipelineId, "pipe"
}

id_type! {
    /// Identity of a registered work generator.
    GeneratorId, "gen"
}
