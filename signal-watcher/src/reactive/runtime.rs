//! Reactive Runtime
//!
//! The seam between the nodes of the reactive graph.
//!
//! # How It Works
//!
//! 1. A [`Producer`] (signal or computed) is read inside a tracking scope
//!    and records the scope's consumer in its [`ConsumerSet`].
//!
//! 2. The consumer keeps the producer alive (strong reference) so it can
//!    unsubscribe before re-running or when it is dropped.
//!
//! 3. When the producer changes it calls [`ConsumerSet::notify`], which
//!    marks every live consumer stale:
//!    a. Computeds become dirty and forward the notification once
//!    b. Watchers invoke their callback once
//!
//! Producers only hold consumers weakly, so a dropped computed never stays
//! reachable through the signals it used to read.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::node::NodeId;

/// A node that can be invalidated when something it read changes.
pub(crate) trait Reactive {
    /// Get the node ID of this consumer.
    fn node_id(&self) -> NodeId;

    /// Mark this consumer as stale.
    ///
    /// Called synchronously from the write that changed one of its sources.
    fn mark_stale(&self);
}

/// A node whose reads can be tracked.
pub(crate) trait Producer {
    /// Get the node ID of this producer.
    fn node_id(&self) -> NodeId;

    /// Register `consumer` to be marked stale when this producer changes.
    fn add_consumer(&self, id: NodeId, consumer: Weak<dyn Reactive>);

    /// Remove a consumer previously registered under `id`.
    fn remove_consumer(&self, id: NodeId);

    /// Whether the producer holds an outdated value.
    fn is_stale(&self) -> bool {
        false
    }
}

/// Consumers of a single producer, in registration order.
#[derive(Default)]
pub(crate) struct ConsumerSet {
    entries: RefCell<IndexMap<NodeId, Weak<dyn Reactive>>>,
}

impl ConsumerSet {
    pub(crate) fn insert(&self, id: NodeId, consumer: Weak<dyn Reactive>) {
        self.entries.borrow_mut().insert(id, consumer);
    }

    pub(crate) fn remove(&self, id: NodeId) {
        self.entries.borrow_mut().shift_remove(&id);
    }

    /// Number of consumers that are still alive.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .values()
            .filter(|consumer| consumer.strong_count() > 0)
            .count()
    }

    /// Mark every live consumer stale.
    ///
    /// Dead entries are pruned first. The set is not borrowed while consumers
    /// run, so they may subscribe or unsubscribe from inside `mark_stale`.
    pub(crate) fn notify(&self, source: NodeId) {
        let live: SmallVec<[Rc<dyn Reactive>; 4]> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|_, consumer| consumer.strong_count() > 0);
            entries.values().filter_map(Weak::upgrade).collect()
        };

        for consumer in live {
            trace!(%source, consumer = %consumer.node_id(), "marking consumer stale");
            consumer.mark_stale();
        }
    }
}
