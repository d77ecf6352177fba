//! Watcher Implementation
//!
//! A Watcher turns "some watched computed became stale" into a single
//! callback invocation. It does not re-evaluate anything itself; whoever
//! owns it decides what to do when notified (typically: request a render).
//!
//! # Notification Rules
//!
//! - The callback runs synchronously inside the signal write that made a
//!   watched computed stale. It should only schedule work.
//! - After notifying, the watcher stays quiet until the next call to
//!   [`Watcher::watch`], so any number of changes between two watches
//!   produce one notification.
//! - A watched computed is held strongly by the watcher; unwatching drops
//!   that reference.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::computed::Computed;
use super::node::NodeId;
use super::runtime::{Producer, Reactive};

/// Registration counters for a watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherStats {
    /// Computeds added to the watch set.
    pub watches: u64,
    /// Computeds removed from the watch set.
    pub unwatches: u64,
    /// Callback invocations.
    pub notifications: u64,
}

struct WatcherNode {
    id: NodeId,
    notify: Box<dyn Fn()>,
    notified: Cell<bool>,
    watched: RefCell<IndexMap<NodeId, Rc<dyn Producer>>>,
    stats: Cell<WatcherStats>,
}

impl WatcherNode {
    fn bump(&self, f: impl FnOnce(&mut WatcherStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Reactive for WatcherNode {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn mark_stale(&self) {
        if self.notified.replace(true) {
            trace!(watcher = %self.id, "notification coalesced");
            return;
        }

        self.bump(|stats| stats.notifications += 1);
        debug!(watcher = %self.id, "watched dependency changed");
        (self.notify)();
    }
}

impl Drop for WatcherNode {
    fn drop(&mut self) {
        for (_, producer) in self.watched.get_mut().drain(..) {
            producer.remove_consumer(self.id);
        }
    }
}

/// Invokes a callback when any watched computed becomes stale.
///
/// Cloning a `Watcher` creates a new handle to the same watch set.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
/// let source = count.clone();
/// let view = Computed::new(move || format!("count: {}", source.get()));
///
/// let watcher = Watcher::new(|| println!("view is stale"));
/// watcher.watch(&view);
/// view.get()?;
///
/// count.set(1);  // prints "view is stale"
/// count.set(2);  // coalesced, prints nothing
/// ```
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherNode>,
}

impl Watcher {
    /// Create a watcher with the given notification callback.
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            inner: Rc::new(WatcherNode {
                id: NodeId::new(),
                notify: Box::new(notify),
                notified: Cell::new(false),
                watched: RefCell::new(IndexMap::new()),
                stats: Cell::new(WatcherStats::default()),
            }),
        }
    }

    /// Get the watcher's unique ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Add a computed to the watch set and re-arm the callback.
    ///
    /// Watching a computed that is already watched only re-arms.
    pub fn watch<T: 'static>(&self, computed: &Computed<T>) {
        self.watch_node(computed.producer());
    }

    pub(crate) fn watch_node(&self, producer: Rc<dyn Producer>) {
        self.inner.notified.set(false);

        let id = producer.node_id();
        if self.inner.watched.borrow().contains_key(&id) {
            return;
        }

        let weak: Weak<WatcherNode> = Rc::downgrade(&self.inner);
        let consumer: Weak<dyn Reactive> = weak;
        producer.add_consumer(self.inner.id, consumer);
        self.inner.watched.borrow_mut().insert(id, producer);
        self.inner.bump(|stats| stats.watches += 1);
        trace!(watcher = %self.inner.id, computed = %id, "watch");
    }

    /// Remove a computed from the watch set.
    ///
    /// Returns `false` if it was not watched.
    pub fn unwatch<T: 'static>(&self, computed: &Computed<T>) -> bool {
        self.unwatch_node(computed.id())
    }

    pub(crate) fn unwatch_node(&self, id: NodeId) -> bool {
        let removed = self.inner.watched.borrow_mut().shift_remove(&id);
        let Some(producer) = removed else {
            return false;
        };

        producer.remove_consumer(self.inner.id);
        self.inner.bump(|stats| stats.unwatches += 1);
        trace!(watcher = %self.inner.id, computed = %id, "unwatch");
        true
    }

    /// Whether `computed` is in the watch set.
    pub fn is_watching<T: 'static>(&self, computed: &Computed<T>) -> bool {
        self.inner.watched.borrow().contains_key(&computed.id())
    }

    /// Number of computeds in the watch set.
    pub fn watched_count(&self) -> usize {
        self.inner.watched.borrow().len()
    }

    /// Number of watched computeds that are stale.
    pub fn pending_count(&self) -> usize {
        self.inner
            .watched
            .borrow()
            .values()
            .filter(|producer| producer.is_stale())
            .count()
    }

    /// Registration and notification counters.
    pub fn stats(&self) -> WatcherStats {
        self.inner.stats.get()
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("watched_count", &self.watched_count())
            .field("stats", &self.stats())
            .finish()
    }
}
