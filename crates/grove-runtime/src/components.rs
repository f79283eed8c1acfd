//! Built-in components.

use crate::events::Action;
use crate::manager::Manager;
use crate::runtime::Runtime;
use grove_component::ComponentType;
use grove_event::Channel;
use std::sync::Arc;

/// Executes [`Action`] events.
///
/// Mount one anywhere in a tree and fire `Action`s on any channel; the
/// runner invokes the wrapped closure on the processing pipeline and
/// stores its return value as the event result:
///
/// ```
/// use grove_runtime::{events::Action, ActionRunner, Runtime};
/// use serde_json::json;
///
/// let runner = ActionRunner::mount_with(Runtime::new());
/// runner.start();
///
/// let fired = runner.fire(Action::new(|| json!("computed")));
/// assert_eq!(fired.get(), Some(json!("computed")));
/// ```
pub struct ActionRunner;

impl ComponentType for ActionRunner {
    fn channel(&self) -> Option<Channel> {
        Some(Channel::broadcast())
    }
}

impl ActionRunner {
    /// Mounts a runner on the shared runtime with its handler
    /// registered.
    #[must_use]
    pub fn mount() -> Manager<ActionRunner> {
        Self::mount_with(Runtime::shared())
    }

    /// Mounts a runner on a specific runtime.
    #[must_use]
    pub fn mount_with(runtime: Arc<Runtime>) -> Manager<ActionRunner> {
        let manager = Manager::builder(ActionRunner).runtime(runtime).mount();
        manager.on(|_runner: &mut ActionRunner, action: &Action, ctx| {
            if let Some(value) = action.invoke() {
                ctx.set_result(value);
            }
            Ok(())
        });
        manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn runs_the_closure_and_stores_the_result() {
        let runtime = Runtime::new();
        let runner = ActionRunner::mount_with(Arc::clone(&runtime));
        runner.start();

        let fired = runner.fire(Action::new(|| json!({ "n": 3 })));
        let result = fired
            .get_timeout(Duration::from_secs(5))
            .expect("action handled");
        assert_eq!(result, Some(json!({ "n": 3 })));
    }

    #[test]
    fn actions_complete_causally() {
        let runtime = Runtime::new();
        let runner = ActionRunner::mount_with(Arc::clone(&runtime));
        runner.start();

        let _ = runner.fire(Action::new(|| json!(1)));
        let _ = runner.fire(Action::new(|| json!(2)));
        assert!(runtime.await_exhaustion(Some(Duration::from_secs(5))));
    }
}
