//! Integration Tests for Signal Watching
//!
//! These tests drive elements through the scheduler the way a host would:
//! connect, write signals, flush, and check what was rendered.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use signal_watcher::{
    Computed, Element, Error, ReactiveElement, SchedulerConfig, Signal, TrackingState,
    UpdateScheduler, WatchSignals, Watcher,
};

/// An element that renders `value: N` from `signal`.
fn display(
    scheduler: &UpdateScheduler,
    signal: &Signal<i32>,
) -> Element<impl FnMut() -> signal_watcher::Result<String>> {
    let signal = signal.clone();
    Element::new(scheduler, move || Ok(format!("value: {}", signal.get())))
}

/// Connecting renders once; a signal write renders exactly once more.
#[test]
fn signal_write_rerenders_once() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());

    handle.connect();
    scheduler.flush();
    assert_eq!(handle.borrow().base().render_count(), 1);
    assert_eq!(handle.borrow().base().output(), Some("value: 1"));

    s.set(2);
    let report = scheduler.flush();

    assert!(report.is_clean());
    assert_eq!(handle.borrow().base().render_count(), 2);
    assert_eq!(handle.borrow().base().output(), Some("value: 2"));
}

/// A disconnected element ignores writes and renders once on reconnect.
#[test]
fn reconnect_renders_latest_value() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());
    handle.connect();
    scheduler.flush();
    s.set(2);
    scheduler.flush();

    handle.disconnect();
    s.set(3);
    scheduler.flush();
    assert_eq!(handle.borrow().base().render_count(), 2);
    assert_eq!(handle.borrow().base().output(), Some("value: 2"));

    handle.connect();
    assert_eq!(
        handle.borrow().tracking_state(),
        TrackingState::ConnectedUntracked
    );
    scheduler.flush();

    let element = handle.borrow();
    assert_eq!(element.base().render_count(), 3);
    assert_eq!(element.base().output(), Some("value: 3"));
    assert_eq!(element.tracking_state(), TrackingState::ConnectedTracked);
}

/// Tracking resumes after a reconnect.
#[test]
fn tracking_resumes_after_reconnect() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());
    handle.connect();
    scheduler.flush();

    handle.disconnect();
    handle.connect();
    scheduler.flush();

    s.set(7);
    scheduler.flush();
    assert_eq!(handle.borrow().base().output(), Some("value: 7"));
    assert_eq!(handle.borrow().base().render_count(), 3);
}

/// A direct update with nothing pending neither renders nor touches the watcher.
#[test]
fn update_without_pending_is_a_no_op() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());
    handle.connect();
    scheduler.flush();

    let before = handle.borrow().watcher().stats();
    let target = handle.borrow().disposer().and_then(|d| d.target());
    assert!(!handle.borrow().is_update_pending());

    handle.perform_update().unwrap();
    handle.perform_update().unwrap();

    let element = handle.borrow();
    assert_eq!(element.watcher().stats(), before);
    assert_eq!(element.disposer().and_then(|d| d.target()), target);
    assert_eq!(element.base().render_count(), 1);
    assert_eq!(element.watcher().watched_count(), 1);
}

/// However many cycles run, one render computation stays registered.
#[test]
fn one_registration_after_every_cycle() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(0);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());
    handle.connect();

    for i in 1..=10 {
        scheduler.flush();
        assert_eq!(handle.borrow().watcher().watched_count(), 1);
        s.set(i);
    }

    let stats = handle.borrow().watcher().stats();
    assert_eq!(stats.watches, 10);
    assert_eq!(stats.unwatches, 9);
    assert_eq!(s.consumer_count(), 1);
}

/// The previous render stays watched until the new one has been evaluated.
#[test]
fn old_render_released_after_new_render() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(0);
    let probe: Rc<RefCell<Option<Watcher>>> = Rc::new(RefCell::new(None));
    let observed: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));

    let source = s.clone();
    let watcher = probe.clone();
    let seen = observed.clone();
    let element = Element::new(&scheduler, move || {
        if let Some(watcher) = watcher.borrow().as_ref() {
            seen.borrow_mut().push(watcher.watched_count());
        }
        Ok(format!("value: {}", source.get()))
    });
    let handle = scheduler.mount(element.watch_signals());
    *probe.borrow_mut() = Some(handle.borrow().watcher().clone());

    handle.connect();
    scheduler.flush();
    for i in 1..=3 {
        s.set(i);
        scheduler.flush();
    }

    // the first render has no predecessor
    assert_eq!(*observed.borrow(), vec![1, 2, 2, 2]);
    assert_eq!(handle.borrow().watcher().watched_count(), 1);
}

/// Several writes before a flush produce one render.
#[test]
fn writes_before_flush_coalesce() {
    let scheduler = UpdateScheduler::default();
    let a = Signal::new(1);
    let b = Signal::new(10);

    let (left, right) = (a.clone(), b.clone());
    let element = Element::new(&scheduler, move || {
        Ok(format!("{}", left.get() + right.get()))
    });
    let handle = scheduler.mount(element.watch_signals());
    handle.connect();
    scheduler.flush();

    a.set(2);
    a.set(3);
    b.set(20);
    assert_eq!(scheduler.pending_len(), 1);
    assert_eq!(handle.borrow().watcher().stats().notifications, 1);

    scheduler.flush();
    assert_eq!(handle.borrow().base().render_count(), 2);
    assert_eq!(handle.borrow().base().output(), Some("23"));
}

/// Writing a signal the last render did not read does nothing.
#[test]
fn unread_signal_does_not_rerender() {
    let scheduler = UpdateScheduler::default();
    let flag = Signal::new(true);
    let a = Signal::new("a");
    let b = Signal::new("b");

    let (f, x, y) = (flag.clone(), a.clone(), b.clone());
    let element = Element::new(&scheduler, move || {
        Ok(if f.get() { x.get() } else { y.get() }.to_string())
    });
    let handle = scheduler.mount(element.watch_signals());
    handle.connect();
    scheduler.flush();

    b.set("B");
    assert!(scheduler.is_idle());

    flag.set(false);
    scheduler.flush();
    assert_eq!(handle.borrow().base().output(), Some("B"));

    a.set("A");
    assert!(scheduler.is_idle());
    assert_eq!(handle.borrow().base().render_count(), 2);
}

/// A failed render keeps its subscription, so the next write retries.
#[test]
fn failed_render_retries_on_change() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(-1);

    let source = s.clone();
    let element = Element::new(&scheduler, move || {
        let value = source.get();
        if value < 0 {
            return Err(Error::render(format!("negative value {value}")));
        }
        Ok(format!("value: {value}"))
    });
    let handle = scheduler.mount(element.watch_signals());
    handle.connect();

    let report = scheduler.flush();
    assert_eq!(
        report.failures,
        vec![(handle.id(), Error::render("negative value -1"))]
    );
    assert_eq!(handle.borrow().watcher().watched_count(), 1);
    assert_eq!(handle.borrow().base().output(), None);

    s.set(4);
    let report = scheduler.flush();
    assert!(report.is_clean());
    assert_eq!(handle.borrow().base().output(), Some("value: 4"));
}

/// A later failing render still replaces the previous registration.
#[test]
fn failed_rerender_replaces_registration() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);

    let source = s.clone();
    let element = Element::new(&scheduler, move || {
        let value = source.get();
        if value < 0 {
            return Err(Error::render(format!("negative value {value}")));
        }
        Ok(format!("value: {value}"))
    });
    let handle = scheduler.mount(element.watch_signals());
    handle.connect();
    scheduler.flush();
    let before = handle.borrow().watcher().stats();

    s.set(-2);
    let report = scheduler.flush();
    assert_eq!(report.failures.len(), 1);

    {
        let element = handle.borrow();
        assert_eq!(element.watcher().watched_count(), 1);
        assert_eq!(element.watcher().stats().unwatches, before.unwatches + 1);
        assert_eq!(element.base().output(), Some("value: 1"));
    }
    assert_eq!(s.consumer_count(), 1);

    s.set(6);
    let report = scheduler.flush();
    assert!(report.is_clean());
    assert_eq!(handle.borrow().base().output(), Some("value: 6"));
    assert_eq!(handle.borrow().base().render_count(), 3);
    assert_eq!(handle.borrow().watcher().watched_count(), 1);
}

/// An update queued before disconnect renders once and leaves nothing
/// subscribed.
#[test]
fn update_queued_before_disconnect_stays_silent() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());
    handle.connect();
    scheduler.flush();

    s.set(2);
    handle.disconnect();
    scheduler.flush();
    {
        let element = handle.borrow();
        assert_eq!(element.base().render_count(), 2);
        assert_eq!(element.base().output(), Some("value: 2"));
        assert_eq!(element.tracking_state(), TrackingState::Unconnected);
        assert_eq!(element.watcher().watched_count(), 0);
    }
    assert_eq!(s.consumer_count(), 0);

    s.set(3);
    s.set(4);
    assert!(scheduler.is_idle());
    scheduler.flush();
    s.set(5);
    scheduler.flush();
    assert_eq!(handle.borrow().base().render_count(), 2);

    handle.connect();
    scheduler.flush();
    assert_eq!(handle.borrow().base().render_count(), 3);
    assert_eq!(handle.borrow().base().output(), Some("value: 5"));
    assert_eq!(handle.borrow().watcher().watched_count(), 1);
}

/// Updating an element that was never connected does not subscribe it.
#[test]
fn update_before_connect_stays_silent() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());

    handle.perform_update().unwrap();
    assert_eq!(handle.borrow().base().render_count(), 1);
    assert_eq!(handle.borrow().watcher().watched_count(), 0);

    s.set(2);
    let report = scheduler.flush();
    assert_eq!(report.updates, 0);
    assert_eq!(handle.borrow().base().render_count(), 1);

    handle.connect();
    scheduler.flush();
    assert_eq!(handle.borrow().base().output(), Some("value: 2"));
    assert_eq!(handle.borrow().tracking_state(), TrackingState::ConnectedTracked);
}

/// A render that writes what it reads keeps requesting updates until the
/// scheduler gives up.
#[test]
fn self_invalidating_render_exhausts_flush() {
    let config = SchedulerConfig::from_json(r#"{ "max_passes": 4 }"#).unwrap();
    let scheduler = UpdateScheduler::new(config).unwrap();
    let s = Signal::new(0);

    let source = s.clone();
    let element = Element::new(&scheduler, move || {
        let value = source.get();
        source.set(value + 1);
        Ok(format!("value: {value}"))
    });
    let handle = scheduler.mount(element.watch_signals());
    handle.connect();

    let report = scheduler.flush();
    assert!(report.exhausted);
    assert_eq!(report.passes, 4);
    assert_eq!(handle.borrow().base().render_count(), 4);
    assert_eq!(s.get_untracked(), 4);
    assert_eq!(handle.borrow().watcher().watched_count(), 1);
}

/// Computeds read during render are tracked through to their signals.
#[test]
fn derived_values_are_tracked() {
    let scheduler = UpdateScheduler::default();
    let price = Signal::new(3);
    let quantity = Signal::new(2);

    let (p, q) = (price.clone(), quantity.clone());
    let total = Computed::new(move || p.get() * q.get());
    let derived = total.clone();
    let element = Element::new(&scheduler, move || {
        Ok(format!("total: {}", derived.get()?))
    });
    let handle = scheduler.mount(element.watch_signals());
    handle.connect();
    scheduler.flush();
    assert_eq!(handle.borrow().base().output(), Some("total: 6"));

    quantity.set(5);
    scheduler.flush();
    assert_eq!(handle.borrow().base().output(), Some("total: 15"));
    assert_eq!(total.consumer_count(), 1);
}

/// Dropping the element releases every subscription it held.
#[test]
fn dropping_element_releases_signals() {
    let scheduler = UpdateScheduler::default();
    let s = Signal::new(1);
    let handle = scheduler.mount(display(&scheduler, &s).watch_signals());
    handle.connect();
    scheduler.flush();
    assert_eq!(s.consumer_count(), 1);

    drop(handle);
    assert_eq!(s.consumer_count(), 0);

    s.set(2);
    let report = scheduler.flush();
    assert_eq!(report.updates, 0);
}

/// Elements sharing a signal each re-render once per write.
#[test]
fn shared_signal_updates_every_element() {
    let scheduler = UpdateScheduler::default();
    let renders = Rc::new(Cell::new(0));
    let s = Signal::new(0);

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let (source, count) = (s.clone(), renders.clone());
            let element = Element::new(&scheduler, move || {
                count.set(count.get() + 1);
                Ok(source.get().to_string())
            });
            let handle = scheduler.mount(element.watch_signals());
            handle.connect();
            handle
        })
        .collect();
    scheduler.flush();
    assert_eq!(renders.get(), 3);

    s.set(9);
    let report = scheduler.flush();
    assert_eq!(report.updates, 3);
    assert_eq!(renders.get(), 6);
    for handle in &handles {
        assert_eq!(handle.borrow().base().output(), Some("9"));
    }
}
