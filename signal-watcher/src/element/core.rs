//! Element identity and update bookkeeping.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

/// Queue of elements waiting for `perform_update`, shared with the scheduler.
pub(crate) type UpdateQueue = Rc<RefCell<VecDeque<ElementId>>>;

/// Unique identifier for an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Generate a new unique element ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element-{}", self.0)
    }
}

/// Requests updates for one element without borrowing it.
///
/// Clones share the element's pending flag. Requesting while an update is
/// already pending does nothing, so an element is queued at most once per
/// update.
#[derive(Clone)]
pub struct UpdateRequester {
    id: ElementId,
    pending: Rc<Cell<bool>>,
    queue: UpdateQueue,
}

impl UpdateRequester {
    pub(crate) fn new(queue: UpdateQueue) -> Self {
        Self {
            id: ElementId::new(),
            pending: Rc::new(Cell::new(false)),
            queue,
        }
    }

    /// The element this requester schedules.
    pub fn element_id(&self) -> ElementId {
        self.id
    }

    /// Mark the element pending and queue it, unless it already is.
    pub fn request_update(&self) {
        if self.pending.replace(true) {
            trace!(element = %self.id, "update already pending");
            return;
        }
        trace!(element = %self.id, "update requested");
        self.enqueue();
    }

    /// Whether an update has been requested and not yet performed.
    pub fn is_update_pending(&self) -> bool {
        self.pending.get()
    }

    fn enqueue(&self) {
        self.queue.borrow_mut().push_back(self.id);
    }
}

impl fmt::Debug for UpdateRequester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequester")
            .field("id", &self.id)
            .field("pending", &self.pending.get())
            .finish()
    }
}

/// Lifecycle state an element embeds to satisfy
/// [`ReactiveElement`](super::ReactiveElement).
///
/// A new core starts with an update pending but not queued. The first
/// [`connect`](Self::connect) queues it, so nothing renders before the
/// element is attached.
#[derive(Debug)]
pub struct ElementCore {
    requester: UpdateRequester,
    connected: bool,
    has_connected: bool,
}

impl ElementCore {
    /// Create the lifecycle state for a new element on `scheduler`.
    pub fn new(scheduler: &super::UpdateScheduler) -> Self {
        let requester = scheduler.requester();
        requester.pending.set(true);
        Self {
            requester,
            connected: false,
            has_connected: false,
        }
    }

    /// Get the element's ID.
    pub fn id(&self) -> ElementId {
        self.requester.id
    }

    /// A handle for requesting updates on this element.
    pub fn requester(&self) -> UpdateRequester {
        self.requester.clone()
    }

    /// Request an update.
    pub fn request_update(&self) {
        self.requester.request_update();
    }

    /// Whether an update is pending.
    pub fn is_update_pending(&self) -> bool {
        self.requester.is_update_pending()
    }

    /// Clear the pending flag after an update ran.
    pub fn mark_updated(&self) {
        self.requester.pending.set(false);
    }

    /// Record that the element was attached.
    pub fn connect(&mut self) {
        self.connected = true;
        debug!(element = %self.id(), "connected");

        if !self.has_connected {
            self.has_connected = true;
            if self.is_update_pending() {
                self.requester.enqueue();
            }
        }
    }

    /// Record that the element was detached.
    pub fn disconnect(&mut self) {
        self.connected = false;
        debug!(element = %self.id(), "disconnected");
    }

    /// Whether the element is attached.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
