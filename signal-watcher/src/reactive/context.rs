//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the current computation is registered as one of its consumers.
//!
//! # Implementation
//!
//! We use a thread-local stack of tracking scopes. Entering a computed's
//! evaluation pushes a scope; the guard pops it again, even if the
//! computation panics. Nested computeds therefore record their own
//! dependencies without leaking them into the outer scope.
//!
//! [`untracked`] pushes a scope without a consumer, which hides reads from
//! every enclosing computation.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::trace;

use super::node::NodeId;
use super::runtime::{Producer, Reactive};

/// Dependencies recorded by one tracking scope.
pub(crate) type Dependencies = SmallVec<[Rc<dyn Producer>; 4]>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The node being evaluated, `None` for an untracked scope.
    node_id: Option<NodeId>,
    /// Handle producers store so they can invalidate the node later.
    consumer: Option<Weak<dyn Reactive>>,
    /// Producers read so far, deduplicated by node ID.
    dependencies: Dependencies,
}

/// Guard that pops the context when dropped.
pub(crate) struct ReactiveContext {
    node_id: Option<NodeId>,
}

impl ReactiveContext {
    /// Enter a tracking scope for `node_id`.
    ///
    /// Every producer read while the returned guard is alive registers
    /// `consumer` as a dependent.
    pub(crate) fn enter(node_id: NodeId, consumer: Weak<dyn Reactive>) -> Self {
        Self::push(ContextEntry {
            node_id: Some(node_id),
            consumer: Some(consumer),
            dependencies: SmallVec::new(),
        })
    }

    fn enter_untracked() -> Self {
        Self::push(ContextEntry {
            node_id: None,
            consumer: None,
            dependencies: SmallVec::new(),
        })
    }

    fn push(entry: ContextEntry) -> Self {
        let node_id = entry.node_id;
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(entry));
        Self { node_id }
    }

    /// Check if reads are currently being tracked.
    pub(crate) fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.consumer.is_some())
        })
    }

    /// Get the node currently being evaluated, if any.
    #[cfg(test)]
    pub(crate) fn current_node() -> Option<NodeId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.node_id))
    }

    /// Record a read of `producer` in the innermost scope.
    ///
    /// Reading the same producer twice in one scope registers it once.
    pub(crate) fn track(producer: Rc<dyn Producer>) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let Some(entry) = stack.last_mut() else {
                return;
            };
            let (Some(node_id), Some(consumer)) = (entry.node_id, entry.consumer.as_ref()) else {
                return;
            };

            let producer_id = producer.node_id();
            if entry
                .dependencies
                .iter()
                .any(|dependency| dependency.node_id() == producer_id)
            {
                return;
            }

            producer.add_consumer(node_id, consumer.clone());
            trace!(consumer = %node_id, producer = %producer_id, "dependency recorded");
            entry.dependencies.push(producer);
        });
    }

    /// Take the dependencies collected by the innermost scope.
    pub(crate) fn take_dependencies() -> Dependencies {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|entry| std::mem::take(&mut entry.dependencies))
                .unwrap_or_default()
        })
    }

    /// Number of dependencies recorded so far by the innermost scope.
    #[cfg(test)]
    pub(crate) fn dependency_count() -> usize {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map_or(0, |entry| entry.dependencies.len())
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.node_id, self.node_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.node_id, entry.node_id
                );
            }
        });
    }
}

/// Run a closure without tracking dependencies.
///
/// Reads inside `f` do not subscribe the enclosing computation, so changes to
/// those values will not invalidate it.
///
/// ```rust,ignore
/// let label = Computed::new(move || {
///     let count = count.get();                     // tracked
///     let unit = untracked(|| unit.get());         // not tracked
///     format!("{count} {unit}")
/// });
/// ```
pub fn untracked<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _ctx = ReactiveContext::enter_untracked();
    f()
}
