//! Update Scheduler
//!
//! The scheduler owns the host's update queue and decides when queued
//! elements run `perform_update`.
//!
//! # Algorithm
//!
//! `flush` works in passes:
//!
//! 1. Drain the queue into a batch (request order)
//! 2. Run `perform_update` for every element in the batch that is still alive
//! 3. Updates may queue more work (a render that invalidates itself, or a
//!    signal written by another element); that work lands in the next pass
//! 4. Stop when the queue is empty or `max_passes` is reached
//!
//! Failures do not stop the flush. They are logged and reported back.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, debug_span, trace, warn};

use super::core::{ElementId, UpdateQueue, UpdateRequester};
use super::ReactiveElement;
use crate::config::SchedulerConfig;
use crate::error::{Error, Result};

/// Outcome of one [`UpdateScheduler::flush`].
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Queue passes executed.
    pub passes: usize,
    /// `perform_update` calls made.
    pub updates: usize,
    /// Updates that returned an error.
    pub failures: Vec<(ElementId, Error)>,
    /// The queue was still non-empty when `max_passes` ran out.
    pub exhausted: bool,
}

impl FlushReport {
    /// Whether every update succeeded and the queue drained.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.exhausted
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    queue: UpdateQueue,
    elements: RefCell<IndexMap<ElementId, Weak<RefCell<dyn ReactiveElement>>>>,
}

/// Shared host queue that runs requested element updates.
///
/// Cloning a scheduler creates a new handle to the same queue.
#[derive(Clone)]
pub struct UpdateScheduler {
    inner: Rc<SchedulerInner>,
}

impl Default for UpdateScheduler {
    fn default() -> Self {
        Self::with_config(SchedulerConfig::default())
    }
}

impl UpdateScheduler {
    /// Create a scheduler after validating `config`.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                config,
                queue: Rc::new(RefCell::new(VecDeque::new())),
                elements: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// A requester for a new element on this scheduler.
    pub fn requester(&self) -> UpdateRequester {
        UpdateRequester::new(Rc::clone(&self.inner.queue))
    }

    /// Attach an element so queued updates can reach it.
    ///
    /// The scheduler only keeps a weak reference; dropping every handle
    /// unmounts the element.
    pub fn mount<E>(&self, element: E) -> ElementHandle<E>
    where
        E: ReactiveElement + 'static,
    {
        let id = element.update_requester().element_id();
        let element = Rc::new(RefCell::new(element));
        let weak: Weak<RefCell<E>> = Rc::downgrade(&element);
        let weak: Weak<RefCell<dyn ReactiveElement>> = weak;
        self.inner.elements.borrow_mut().insert(id, weak);
        debug!(element = %id, "mounted");

        ElementHandle { id, element }
    }

    /// Number of queued update requests.
    pub fn pending_len(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Whether no update is queued.
    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    fn lookup(&self, id: ElementId) -> Option<Rc<RefCell<dyn ReactiveElement>>> {
        let mut elements = self.inner.elements.borrow_mut();
        let element = elements.get(&id).and_then(Weak::upgrade);
        if element.is_none() {
            elements.shift_remove(&id);
        }
        element
    }

    /// Run queued updates until the queue drains or `max_passes` is reached.
    pub fn flush(&self) -> FlushReport {
        let _span = debug_span!("flush").entered();
        let mut report = FlushReport::default();

        while report.passes < self.inner.config.max_passes {
            let batch: Vec<ElementId> = self.inner.queue.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            report.passes += 1;
            trace!(pass = report.passes, queued = batch.len(), "flush pass");

            for id in batch {
                let Some(element) = self.lookup(id) else {
                    trace!(element = %id, "skipping unmounted element");
                    continue;
                };

                let outcome = match element.try_borrow_mut() {
                    Ok(mut element) => element.perform_update(),
                    Err(_) => Err(Error::ReentrantUpdate),
                };
                report.updates += 1;

                if let Err(error) = outcome {
                    warn!(element = %id, %error, "update failed");
                    report.failures.push((id, error));
                }
            }
        }

        if !self.is_idle() {
            report.exhausted = true;
            warn!(
                max_passes = self.inner.config.max_passes,
                queued = self.pending_len(),
                "flush stopped with updates still queued"
            );
        }

        debug!(
            passes = report.passes,
            updates = report.updates,
            failures = report.failures.len(),
            "flush complete"
        );
        report
    }
}

impl std::fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("config", &self.inner.config)
            .field("queued", &self.pending_len())
            .field("mounted", &self.inner.elements.borrow().len())
            .finish()
    }
}

/// Owning handle to a mounted element.
pub struct ElementHandle<E> {
    id: ElementId,
    element: Rc<RefCell<E>>,
}

impl<E> Clone for ElementHandle<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            element: Rc::clone(&self.element),
        }
    }
}

impl<E: ReactiveElement> ElementHandle<E> {
    /// Get the element's ID.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Attach the element (runs `connected_callback`).
    pub fn connect(&self) {
        self.element.borrow_mut().connected_callback();
    }

    /// Detach the element (runs `disconnected_callback`).
    pub fn disconnect(&self) {
        self.element.borrow_mut().disconnected_callback();
    }

    /// Run an update cycle right away, outside the scheduler.
    pub fn perform_update(&self) -> Result<()> {
        self.element
            .try_borrow_mut()
            .map_err(|_| Error::ReentrantUpdate)?
            .perform_update()
    }

    /// Borrow the element.
    pub fn borrow(&self) -> Ref<'_, E> {
        self.element.borrow()
    }

    /// Mutably borrow the element.
    pub fn borrow_mut(&self) -> RefMut<'_, E> {
        self.element.borrow_mut()
    }
}
