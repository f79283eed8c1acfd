//! The injectable runtime object.
//!
//! A [`Runtime`] bundles what the whole process otherwise shares: the
//! worker pool pipelines draw from, the generator registry behind
//! quiescence, and the stop policy. Component trees are created
//! against a runtime; most programs use the process-wide
//! [`Runtime::shared`] instance, tests and embedders build their own.
//!
//! ```
//! use grove_runtime::{Runtime, StopDrain};
//! use std::time::Duration;
//!
//! let runtime = Runtime::builder().stop_drain(StopDrain::Deferred).build();
//! assert!(runtime.await_exhaustion(Some(Duration::from_millis(1))));
//! ```

use crate::executor::Executor;
use crate::registry::{Generator, GeneratorRegistry};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// What `Manager::stop` does after the `Stop` event completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopDrain {
    /// Block until every generator has deregistered.
    #[default]
    AwaitExhaustion,
    /// Return immediately; callers await quiescence themselves.
    Deferred,
}

/// Shared services of one event runtime.
pub struct Runtime {
    executor: Executor,
    registry: Arc<GeneratorRegistry>,
    stop_drain: StopDrain,
}

impl Runtime {
    /// Builds a runtime with default settings.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    /// Starts configuring a runtime.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The process-wide default instance.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<Runtime>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Runtime::builder().build()))
    }

    /// The worker pool pipelines run on.
    #[must_use]
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The generator registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<GeneratorRegistry> {
        &self.registry
    }

    pub(crate) fn stop_drain(&self) -> StopDrain {
        self.stop_drain
    }

    /// Blocks until no generator remains registered: every pipeline is
    /// idle and every long-running source has deregistered.
    ///
    /// With a `timeout`, returns whether exhaustion was reached.
    #[must_use]
    pub fn await_exhaustion(&self, timeout: Option<Duration>) -> bool {
        self.registry.await_exhaustion(timeout)
    }

    /// Registers a long-running work source. The runtime does not
    /// quiesce until the returned token is dropped.
    #[must_use]
    pub fn register_generator(&self, label: &str) -> Generator {
        Generator::new(Arc::clone(&self.registry), label)
    }
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    executor: Option<Executor>,
    stop_drain: StopDrain,
}

impl RuntimeBuilder {
    /// Uses the given worker pool instead of the process default.
    #[must_use]
    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the stop policy.
    #[must_use]
    pub fn stop_drain(mut self, stop_drain: StopDrain) -> Self {
        self.stop_drain = stop_drain;
        self
    }

    /// Finishes the runtime.
    #[must_use]
    pub fn build(self) -> Arc<Runtime> {
        Arc::new(Runtime {
            executor: self.executor.unwrap_or_else(Executor::shared),
            registry: Arc::new(GeneratorRegistry::new()),
            stop_drain: self.stop_drain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_runtime_is_exhausted() {
        let runtime = Runtime::new();
        assert!(runtime.await_exhaustion(Some(Duration::from_millis(1))));
    }

    #[test]
    fn generator_token_blocks_exhaustion() {
        let runtime = Runtime::new();
        let token = runtime.register_generator("poller");
        assert!(!runtime.await_exhaustion(Some(Duration::from_millis(10))));
        token.close();
        assert!(runtime.await_exhaustion(Some(Duration::from_millis(10))));
    }

    #[test]
    fn shared_instance_is_stable() {
        let a = Runtime::shared();
        let b = Runtime::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn builder_sets_stop_policy() {
        let runtime = Runtime::builder().stop_drain(StopDrain::Deferred).build();
        assert_eq!(runtime.stop_drain(), StopDrain::Deferred);
    }
}
