//! Causal completion: child events keep parents open, completion
//! events arrive child first, and quiescence covers the whole family.

use grove_runtime::events::Completed;
use grove_runtime::testing::Probe;
use grove_runtime::{Channel, EventKind, Fired, Manager, Runtime};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct E3;
impl EventKind for E3 {}

struct E4;
impl EventKind for E4 {}

struct Ask;
impl EventKind for Ask {}

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
fn child_sleep_delays_exhaustion_and_parent_completion() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    root.on(|_probe: &mut Probe, _event: &E3, ctx| {
        let _child = ctx.fire(E4);
        Ok(())
    });
    root.on(|_probe: &mut Probe, _event: &E4, _ctx| {
        std::thread::sleep(Duration::from_millis(50));
        Ok(())
    });
    root.on(|probe: &mut Probe, completed: &Completed, _ctx| {
        if completed.fired().is::<E3>() {
            probe.log().record("completed:e3");
        } else if completed.fired().is::<E4>() {
            probe.log().record("completed:e4");
        }
        Ok(())
    });
    root.start();

    let started = Instant::now();
    let fired = root.fire(E3);
    assert!(runtime.await_exhaustion(Some(Duration::from_secs(5))));
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(50), "elapsed {elapsed:?}");
    assert!(fired.is_done());
    assert_eq!(log.position("completed:e4"), Some(0));
    assert_eq!(log.position("completed:e3"), Some(1));
}

#[test]
fn parent_is_not_done_before_child() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    let slot: Arc<Mutex<Option<Fired>>> = Arc::new(Mutex::new(None));
    let writer = Arc::clone(&slot);
    root.on(move |_probe: &mut Probe, _event: &E3, ctx| {
        *writer.lock().unwrap() = Some(ctx.fired().clone());
        let _child = ctx.fire(E4);
        Ok(())
    });
    let reader = Arc::clone(&slot);
    let observed = log.clone();
    root.on(move |_probe: &mut Probe, _event: &E4, _ctx| {
        // The parent's dispatch finished, but this very event holds it
        // open.
        let parent = reader.lock().unwrap().clone().expect("parent recorded");
        if !parent.is_done() {
            observed.record("parent-open");
        }
        Ok(())
    });
    root.start();

    let parent = root.fire(E3);
    let _ = parent
        .get_timeout(Duration::from_secs(5))
        .expect("family completed");
    assert!(log.contains("parent-open"));
}

#[test]
fn result_is_settable_and_awaitable() {
    let runtime = Runtime::new();
    let (root, _log) = probe_root(&runtime);
    root.on(|_probe: &mut Probe, _event: &Ask, ctx| {
        ctx.set_result(json!({ "answer": 42 }));
        Ok(())
    });
    root.start();

    let result = root
        .fire(Ask)
        .get_timeout(Duration::from_secs(5))
        .expect("handled");
    assert_eq!(result, Some(json!({ "answer": 42 })));
}

#[test]
fn get_timeout_expires_for_buffered_events() {
    let runtime = Runtime::new();
    let (root, _log) = probe_root(&runtime);
    // Tree not started: the fire is buffered and cannot complete.
    let fired = root.fire(Ask);
    assert!(fired.get_timeout(Duration::from_millis(20)).is_err());

    // Starting the tree releases the buffered event.
    root.start();
    assert!(fired.get_timeout(Duration::from_secs(5)).is_ok());
}

#[test]
fn grandchildren_extend_the_family() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    struct Mid;
    impl EventKind for Mid {}

    root.on(|_probe: &mut Probe, _event: &E3, ctx| {
        let _ = ctx.fire(Mid);
        Ok(())
    });
    root.on(|_probe: &mut Probe, _event: &Mid, ctx| {
        let _ = ctx.fire(E4);
        Ok(())
    });
    root.on(|probe: &mut Probe, _event: &E4, _ctx| {
        std::thread::sleep(Duration::from_millis(30));
        probe.log().record("leaf-ran");
        Ok(())
    });
    root.start();

    let ancestor = root.fire(E3);
    let _ = ancestor
        .get_timeout(Duration::from_secs(5))
        .expect("ancestor completed");
    // The ancestor could only complete after the whole chain ran.
    assert!(log.contains("leaf-ran"));
}

#[test]
fn sibling_events_are_processed_in_fire_order() {
    let runtime = Runtime::new();
    let (root, log) = probe_root(&runtime);

    struct Tagged(u32);
    impl EventKind for Tagged {}

    root.on(|probe: &mut Probe, event: &Tagged, _ctx| {
        probe.log().record(format!("t{}", event.0));
        Ok(())
    });
    root.start();

    let last = {
        let mut last = None;
        for n in 0..5 {
            last = Some(root.fire(Tagged(n)));
        }
        last.expect("fired five")
    };
    let _ = last.get_timeout(Duration::from_secs(5)).expect("handled");

    assert_eq!(log.entries(), ["t0", "t1", "t2", "t3", "t4"]);
}
