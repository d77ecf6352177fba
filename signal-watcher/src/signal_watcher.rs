//! Signal Watcher
//!
//! [`SignalWatcher`] wraps any [`ReactiveElement`] so that it re-renders
//! whenever a signal read during its last render changes.
//!
//! # How It Works
//!
//! 1. Each update cycle runs the inner element's `perform_update` inside a
//!    fresh [`Computed`], so every signal read while rendering is recorded.
//!
//! 2. The computed is registered with the wrapper's [`Watcher`] before it is
//!    evaluated. The previous cycle's computed is unwatched only afterwards,
//!    so the element is never without a watched render while connected.
//!
//! 3. When a recorded signal changes, the watcher requests an update from
//!    the scheduler. The next cycle builds a new computed; the old one is
//!    never re-evaluated.
//!
//! 4. Disconnecting unwatches the current computed, so a detached element
//!    ignores signal writes. An update that still runs while detached is
//!    unwatched as soon as it has rendered. Reconnecting forces one render to
//!    rediscover its dependencies.
//!
//! # Re-entrancy
//!
//! An update that re-enters the inner element while it is rendering is not
//! supported and fails with [`Error::ReentrantUpdate`].

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::element::{ElementId, ReactiveElement, UpdateRequester};
use crate::error::{Error, Result};
use crate::reactive::{Computed, NodeId, Watcher};

/// Where an element is in the connect / track cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// Not attached. Signal writes do not trigger renders.
    Unconnected,

    /// Attached, waiting for the forced render that re-establishes tracking.
    ConnectedUntracked,

    /// Attached, and the last render is being watched.
    ConnectedTracked,
}

/// Revokes one computed's registration with one watcher.
///
/// Disposing is idempotent.
#[derive(Debug)]
pub struct Disposer {
    watcher: Watcher,
    target: Cell<Option<NodeId>>,
}

impl Disposer {
    fn new(watcher: &Watcher, target: NodeId) -> Self {
        Self {
            watcher: watcher.clone(),
            target: Cell::new(Some(target)),
        }
    }

    /// Unwatch the computed this disposer was created for.
    pub fn dispose(&self) {
        if let Some(target) = self.target.take() {
            self.watcher.unwatch_node(target);
            trace!(watcher = %self.watcher.id(), computed = %target, "disposed");
        }
    }

    /// Whether [`dispose`](Self::dispose) already ran.
    pub fn is_disposed(&self) -> bool {
        self.target.get().is_none()
    }

    /// The computed this disposer unwatches, until it is disposed.
    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }
}

/// Adds signal tracking to an element's update lifecycle.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = UpdateScheduler::default();
/// let count = Signal::new(1);
///
/// let source = count.clone();
/// let counter = Element::new(&scheduler, move || Ok(format!("count: {}", source.get())));
/// let handle = scheduler.mount(SignalWatcher::new(counter));
///
/// handle.connect();
/// scheduler.flush();        // renders "count: 1"
///
/// count.set(2);
/// scheduler.flush();        // renders "count: 2", no request_update needed
/// ```
pub struct SignalWatcher<B> {
    id: ElementId,
    base: Rc<RefCell<B>>,
    watcher: Watcher,
    dispose: Option<Disposer>,
    state: TrackingState,
}

impl<B: ReactiveElement + 'static> SignalWatcher<B> {
    /// Wrap `base`.
    pub fn new(base: B) -> Self {
        let requester = base.update_requester();
        let id = requester.element_id();
        let watcher = Watcher::new(move || requester.request_update());

        Self {
            id,
            base: Rc::new(RefCell::new(base)),
            watcher,
            dispose: None,
            state: TrackingState::Unconnected,
        }
    }

    /// Current connect / track state.
    pub fn tracking_state(&self) -> TrackingState {
        self.state
    }

    /// The watcher that owns this element's render subscriptions.
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    /// The disposer for the most recently registered render, if any.
    pub fn disposer(&self) -> Option<&Disposer> {
        self.dispose.as_ref()
    }

    /// Borrow the wrapped element.
    pub fn base(&self) -> Ref<'_, B> {
        self.base.borrow()
    }

    /// Mutably borrow the wrapped element.
    pub fn base_mut(&self) -> RefMut<'_, B> {
        self.base.borrow_mut()
    }
}

impl<B: ReactiveElement + 'static> ReactiveElement for SignalWatcher<B> {
    fn perform_update(&mut self) -> Result<()> {
        // Bail out like the base does, so a skipped cycle never replaces the
        // watched render with one that read nothing.
        if !self.is_update_pending() {
            trace!(element = %self.id, "no update pending");
            return Ok(());
        }

        let last_dispose = self.dispose.take();

        let base = Rc::downgrade(&self.base);
        let render = Computed::new(move || {
            let element = base.upgrade().ok_or(Error::ElementDropped)?;
            let mut element = element
                .try_borrow_mut()
                .map_err(|_| Error::ReentrantUpdate)?;
            element.perform_update()
        });

        self.watcher.watch(&render);
        self.dispose = Some(Disposer::new(&self.watcher, render.id()));
        debug!(element = %self.id, computed = %render.id(), "update cycle");

        let outcome = render.get().and_then(|rendered| rendered);
        match self.state {
            TrackingState::ConnectedUntracked => self.state = TrackingState::ConnectedTracked,
            TrackingState::ConnectedTracked => {}
            TrackingState::Unconnected => {
                // rendered while detached; nothing may stay subscribed
                if let Some(dispose) = &self.dispose {
                    dispose.dispose();
                }
                debug!(element = %self.id, "detached render left untracked");
            }
        }

        if let Some(last_dispose) = last_dispose {
            last_dispose.dispose();
        }
        outcome
    }

    fn connected_callback(&mut self) {
        self.base.borrow_mut().connected_callback();
        self.state = TrackingState::ConnectedUntracked;
        // Tracking was torn down on disconnect, and signals may have changed
        // since; only a fresh render can rediscover the dependencies.
        self.request_update();
    }

    fn disconnected_callback(&mut self) {
        self.base.borrow_mut().disconnected_callback();
        if let Some(dispose) = &self.dispose {
            dispose.dispose();
        }
        self.state = TrackingState::Unconnected;
        debug!(element = %self.id, "tracking released");
    }

    fn update_requester(&self) -> UpdateRequester {
        self.base.borrow().update_requester()
    }

    fn request_update(&mut self) {
        self.base.borrow_mut().request_update();
    }

    fn is_update_pending(&self) -> bool {
        self.base.borrow().is_update_pending()
    }
}

/// Extension for wrapping any element in a [`SignalWatcher`].
pub trait WatchSignals: ReactiveElement + Sized + 'static {
    /// Wrap `self` so it re-renders when the signals it reads change.
    fn watch_signals(self) -> SignalWatcher<Self> {
        SignalWatcher::new(self)
    }
}

impl<E: ReactiveElement + 'static> WatchSignals for E {}
