//! Handler failures: dispatch continues, `HandlingError` is fired
//! exactly once per failure, and the tree stays live.

use grove_runtime::events::HandlingError;
use grove_runtime::testing::Probe;
use grove_runtime::{Channel, ComponentError, EventKind, Manager, Runtime};
use std::sync::Arc;
use std::time::Duration;

struct E5;
impl EventKind for E5 {}

struct Healthy;
impl EventKind for Healthy {}

fn probe_root(runtime: &Arc<Runtime>) -> (Manager<Probe>, grove_runtime::testing::EventLog) {
    let (probe, log) = Probe::new();
    let manager = Manager::builder(probe)
        .name("root")
        .channel(Channel::broadcast())
        .runtime(Arc::clone(runtime))
        .mount();
    (manager, log)
}

#[test]
fn failing_handler_does_not_block_the_next() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    root.on(|_probe: &mut Probe, _event: &E5, _ctx| {
        Err(ComponentError::failed("deliberate"))
    });
    root.on(|probe: &mut Probe, _event: &E5, _ctx| {
        probe.log().record("second-ran");
        Ok(())
    });
    root.on(|probe: &mut Probe, error: &HandlingError, _ctx| {
        probe.log().record(format!(
            "error:{}:{}",
            error.offending().name(),
            error.error()
        ));
        Ok(())
    });
    root.start();

    let _ = root.fire(E5).get_timeout(Duration::from_secs(5));
    assert!(runtime.await_exhaustion(Some(Duration::from_secs(5))));

    assert!(log.contains("second-ran"));
    assert_eq!(
        log.entries()
            .iter()
            .filter(|entry| entry.starts_with("error:E5"))
            .count(),
        1
    );
    assert!(log.contains("error:E5:deliberate"));
}

#[test]
fn panicking_handler_is_contained() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    root.on(|_probe: &mut Probe, _event: &E5, _ctx| -> Result<(), ComponentError> {
        panic!("handler blew up");
    });
    root.on(|probe: &mut Probe, error: &HandlingError, _ctx| {
        probe.log().record(format!("caught:{}", error.error()));
        Ok(())
    });
    root.start();

    let _ = root.fire(E5).get_timeout(Duration::from_secs(5));
    assert!(runtime.await_exhaustion(Some(Duration::from_secs(5))));

    assert!(log
        .entries()
        .iter()
        .any(|entry| entry.starts_with("caught:") && entry.contains("handler blew up")));
}

#[test]
fn tree_stays_live_after_failures() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    root.on(|_probe: &mut Probe, _event: &E5, _ctx| {
        Err(ComponentError::failed("still failing"))
    });
    root.on(|probe: &mut Probe, _event: &Healthy, _ctx| {
        probe.log().record("healthy");
        Ok(())
    });
    root.start();

    for _ in 0..3 {
        let _ = root.fire(E5).get_timeout(Duration::from_secs(5));
    }
    let _ = root.fire(Healthy).get_timeout(Duration::from_secs(5));
    assert!(runtime.await_exhaustion(Some(Duration::from_secs(5))));

    assert!(log.contains("healthy"));
}

#[test]
fn handling_error_keeps_the_offending_event_open() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    root.on(|_probe: &mut Probe, _event: &E5, _ctx| {
        Err(ComponentError::failed("fail"))
    });
    let observed = log.clone();
    root.on(move |_probe: &mut Probe, error: &HandlingError, _ctx| {
        // The error event is a causal child: the offending event is
        // still open while the error is being handled.
        if !error.offending().is_done() {
            observed.record("offending-open");
        }
        Ok(())
    });
    root.start();

    let fired = root.fire(E5);
    let _ = fired.get_timeout(Duration::from_secs(5)).expect("handled");
    assert!(log.contains("offending-open"));
    assert!(fired.is_done());
}

#[test]
fn error_in_error_handler_is_not_refired() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    root.on(|_probe: &mut Probe, _event: &E5, _ctx| {
        Err(ComponentError::failed("first"))
    });
    let seen = log.clone();
    root.on(move |_probe: &mut Probe, _error: &HandlingError, _ctx| {
        seen.record("error-handler");
        Err(ComponentError::failed("second"))
    });
    root.start();

    let _ = root.fire(E5).get_timeout(Duration::from_secs(5));
    assert!(runtime.await_exhaustion(Some(Duration::from_secs(5))));

    // One HandlingError for the first failure; the failure inside the
    // error handler is only logged.
    assert_eq!(
        log.entries()
            .iter()
            .filter(|entry| entry.as_str() == "error-handler")
            .count(),
        1
    );
}
