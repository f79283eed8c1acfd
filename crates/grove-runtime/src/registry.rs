//! The generator registry: the bookkeeping behind quiescence.
//!
//! A *generator* is anything that currently produces work: an
//! executing pipeline, an I/O loop, a background source. Pipelines
//! register themselves while executing; long-running sources hold a
//! [`Generator`] token. [`GeneratorRegistry::await_exhaustion`] blocks
//! until the set is empty, which is exactly the moment no work is in
//! flight anywhere in the runtime.

use grove_types::GeneratorId;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// The set of currently registered generators.
pub struct GeneratorRegistry {
    members: Mutex<HashMap<GeneratorId, String>>,
    drained: Condvar,
}

impl GeneratorRegistry {
    pub(crate) fn new() -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            drained: Condvar::new(),
        }
    }

    pub(crate) fn add(&self, id: GeneratorId, label: &str) {
        let mut members = self.members.lock();
        members.insert(id, label.to_string());
        trace!(%id, label, active = members.len(), "generator registered");
    }

    pub(crate) fn remove(&self, id: GeneratorId) {
        let mut members = self.members.lock();
        if members.remove(&id).is_some() {
            trace!(%id, active = members.len(), "generator deregistered");
            if members.is_empty() {
                self.drained.notify_all();
            }
        }
    }

    /// The number of currently registered generators.
    #[must_use]
    pub fn count(&self) -> usize {
        self.members.lock().len()
    }

    /// Blocks until the registry is empty.
    ///
    /// With a `timeout`, returns whether exhaustion was reached within
    /// the bound; without one, always returns `true` (eventually).
    /// Generators may churn while waiting; the call returns as soon as
    /// the set is observed empty.
    #[must_use]
    pub fn await_exhaustion(&self, timeout: Option<Duration>) -> bool {
        let mut members = self.members.lock();
        match timeout {
            None => {
                while !members.is_empty() {
                    self.drained.wait(&mut members);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !members.is_empty() {
                    if self.drained.wait_until(&mut members, deadline).timed_out() {
                        return members.is_empty();
                    }
                }
                true
            }
        }
    }
}

/// RAII registration of a long-running work source.
///
/// Obtained from [`Runtime::register_generator`](crate::Runtime::register_generator).
/// The source counts as work in flight until the token is dropped or
/// [`close`](Generator::close)d, keeping `await_exhaustion` callers
/// blocked.
pub struct Generator {
    id: GeneratorId,
    registry: Arc<GeneratorRegistry>,
}

impl Generator {
    pub(crate) fn new(registry: Arc<GeneratorRegistry>, label: &str) -> Self {
        let id = GeneratorId::new();
        registry.add(id, label);
        Self { id, registry }
    }

    /// The generator's identity.
    #[must_use]
    pub fn id(&self) -> GeneratorId {
        self.id
    }

    /// Deregisters the generator now.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}
