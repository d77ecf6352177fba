//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (a computed), the
//!    signal registers that computation as a consumer.
//!
//! 2. When a signal's value changes, all consumers are marked stale.
//!
//! 3. Writing a value equal to the current one is a no-op: no consumer is
//!    notified.
//!
//! # Threading
//!
//! Signals are single-threaded (`Rc` + `RefCell`). Clones share the same
//! value and consumer set.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::{Rc, Weak};

use tracing::trace;

use super::context::ReactiveContext;
use super::node::NodeId;
use super::runtime::{ConsumerSet, Producer, Reactive};

struct SignalNode<T> {
    id: NodeId,
    value: RefCell<T>,
    consumers: ConsumerSet,
}

impl<T> Producer for SignalNode<T> {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn add_consumer(&self, id: NodeId, consumer: Weak<dyn Reactive>) {
        self.consumers.insert(id, consumer);
    }

    fn remove_consumer(&self, id: NodeId) {
        self.consumers.remove(id);
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (marks dependent computeds stale)
/// count.set(5);
/// ```
pub struct Signal<T> {
    node: Rc<SignalNode<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            node: Rc::new(SignalNode {
                id: NodeId::new(),
                value: RefCell::new(value),
                consumers: ConsumerSet::default(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    fn track(&self) {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.node.clone());
        }
    }

    /// Borrow the current value.
    ///
    /// Tracked like [`get`](Self::get). Writing this signal from inside `f`
    /// panics, because the value is borrowed for the duration of the call.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.node.value.borrow())
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a consumer.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.node.value.borrow().clone()
    }

    /// Set a new value and notify consumers.
    ///
    /// Does nothing if `value` equals the current value.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        {
            let mut current = self.node.value.borrow_mut();
            if *current == value {
                trace!(signal = %self.node.id, "write skipped, value unchanged");
                return;
            }
            *current = value;
        }

        trace!(signal = %self.node.id, "signal changed");
        self.node.consumers.notify(self.node.id);
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
        T: PartialEq,
    {
        let next = f(&*self.node.value.borrow());
        self.set(next);
    }

    /// Get the number of live consumers.
    pub fn consumer_count(&self) -> usize {
        self.node.consumers.len()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node.id)
            .field("value", &*self.node.value.borrow())
            .field("consumer_count", &self.node.consumers.len())
            .finish()
    }
}
