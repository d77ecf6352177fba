//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change. It is the tracked computation a [`Watcher`]
//! subscribes to.
//!
//! # How Computeds Work
//!
//! 1. A new computed starts dirty. The first `get()` runs the computation
//!    inside a tracking scope and caches the result.
//!
//! 2. While clean, `get()` returns the cached value.
//!
//! 3. When a dependency changes, the computed becomes dirty and forwards the
//!    notification to its own consumers exactly once. Further changes are
//!    absorbed until it is evaluated again.
//!
//! 4. Before re-running, the computed unsubscribes from its previous
//!    dependencies and records a fresh set.
//!
//! # Failure Modes
//!
//! - **Self-read while computing**: `get()` returns [`Error::Cycle`].
//! - **Computation panics**: the tracking scope is popped and the computed is
//!   left dirty, so the next `get()` retries.
//! - **Invalidated while computing**: the new value is cached but the node is
//!   left dirty and its consumers are notified.
//!
//! [`Watcher`]: super::Watcher

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::context::{Dependencies, ReactiveContext};
use super::node::NodeId;
use super::runtime::{ConsumerSet, Producer, Reactive};
use crate::error::{Error, Result};

/// Evaluation state for a computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency changed (or the computed never ran). Next read recomputes.
    Dirty,

    /// The computation is running right now.
    Computing,
}

struct ComputedNode<T> {
    id: NodeId,
    this: Weak<ComputedNode<T>>,
    compute: RefCell<Box<dyn FnMut() -> T>>,
    value: RefCell<Option<T>>,
    state: Cell<ComputedState>,
    invalidated: Cell<bool>,
    sources: RefCell<Dependencies>,
    consumers: ConsumerSet,
}

/// Resets a node left in `Computing` by a panicking computation.
struct ComputingGuard<'a> {
    state: &'a Cell<ComputedState>,
}

impl Drop for ComputingGuard<'_> {
    fn drop(&mut self) {
        if self.state.get() == ComputedState::Computing {
            self.state.set(ComputedState::Dirty);
        }
    }
}

impl<T: 'static> ComputedNode<T> {
    fn release_sources(&self) {
        let stale = std::mem::take(&mut *self.sources.borrow_mut());
        for source in &stale {
            source.remove_consumer(self.id);
        }
    }

    fn recompute(&self) -> T
    where
        T: Clone,
    {
        self.release_sources();
        self.state.set(ComputedState::Computing);
        self.invalidated.set(false);
        let _guard = ComputingGuard { state: &self.state };

        let value = {
            let consumer: Weak<dyn Reactive> = self.this.clone();
            let _ctx = ReactiveContext::enter(self.id, consumer);
            let value = {
                let mut compute = self.compute.borrow_mut();
                (&mut **compute)()
            };
            *self.sources.borrow_mut() = ReactiveContext::take_dependencies();
            value
        };

        trace!(
            computed = %self.id,
            dependencies = self.sources.borrow().len(),
            "computed evaluated"
        );
        *self.value.borrow_mut() = Some(value.clone());

        if self.invalidated.replace(false) {
            self.state.set(ComputedState::Dirty);
            self.consumers.notify(self.id);
        } else {
            self.state.set(ComputedState::Clean);
        }

        value
    }
}

impl<T> Reactive for ComputedNode<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn mark_stale(&self) {
        match self.state.get() {
            ComputedState::Clean => {
                self.state.set(ComputedState::Dirty);
                self.consumers.notify(self.id);
            }
            ComputedState::Computing => self.invalidated.set(true),
            ComputedState::Dirty => {}
        }
    }
}

impl<T> Producer for ComputedNode<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn add_consumer(&self, id: NodeId, consumer: Weak<dyn Reactive>) {
        self.consumers.insert(id, consumer);
    }

    fn remove_consumer(&self, id: NodeId) {
        self.consumers.remove(id);
    }

    fn is_stale(&self) -> bool {
        self.state.get() != ComputedState::Clean
    }
}

impl<T> Drop for ComputedNode<T> {
    fn drop(&mut self) {
        for source in self.sources.get_mut().drain(..) {
            source.remove_consumer(self.id);
        }
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// Cloning a `Computed` creates a new handle to the same node.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(2);
/// let source = count.clone();
/// let doubled = Computed::new(move || source.get() * 2);
///
/// assert_eq!(doubled.get()?, 4);
/// count.set(5);
/// assert_eq!(doubled.get()?, 10);
/// ```
pub struct Computed<T> {
    node: Rc<ComputedNode<T>>,
}

impl<T: 'static> Computed<T> {
    /// Create a new computed with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: FnMut() -> T + 'static,
    {
        let node = Rc::new_cyclic(|this| ComputedNode {
            id: NodeId::new(),
            this: this.clone(),
            compute: RefCell::new(Box::new(compute)),
            value: RefCell::new(None),
            state: Cell::new(ComputedState::Dirty),
            invalidated: Cell::new(false),
            sources: RefCell::new(Dependencies::new()),
            consumers: ConsumerSet::default(),
        });
        Self { node }
    }

    /// Get the computed's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Get the current value, recomputing if necessary.
    ///
    /// Inside another computation this also records the computed as one of
    /// its dependencies.
    pub fn get(&self) -> Result<T>
    where
        T: Clone,
    {
        let node = &self.node;
        if node.state.get() == ComputedState::Computing {
            return Err(Error::Cycle(node.id));
        }

        if ReactiveContext::is_active() {
            ReactiveContext::track(node.clone());
        }

        if node.state.get() == ComputedState::Clean {
            if let Some(value) = node.value.borrow().as_ref() {
                return Ok(value.clone());
            }
        }

        Ok(node.recompute())
    }

    /// Get the current evaluation state.
    pub fn state(&self) -> ComputedState {
        self.node.state.get()
    }

    /// Whether the next `get()` will recompute.
    pub fn is_dirty(&self) -> bool {
        self.node.state.get() != ComputedState::Clean
    }

    /// Number of producers read during the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.node.sources.borrow().len()
    }

    /// Number of live consumers (computeds and watchers).
    pub fn consumer_count(&self) -> usize {
        self.node.consumers.len()
    }

    /// Whether the computed has a cached value.
    pub fn has_value(&self) -> bool {
        self.node.value.borrow().is_some()
    }

    pub(crate) fn producer(&self) -> Rc<dyn Producer> {
        self.node.clone()
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Debug> Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.node.id)
            .field("state", &self.node.state.get())
            .field("value", &*self.node.value.borrow())
            .field("consumer_count", &self.node.consumers.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
