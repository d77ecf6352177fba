//! Host Element Model
//!
//! This module implements the element lifecycle the watcher plugs into:
//! a [`ReactiveElement`] trait, a plain [`Element`] base, and the
//! [`UpdateScheduler`] that runs requested updates.
//!
//! # Overview
//!
//! Elements never render themselves on demand. Instead:
//!
//! - `request_update()` marks the element pending and queues it once
//! - the host calls [`UpdateScheduler::flush`], which runs `perform_update()`
//!   for every queued element in request order
//! - `perform_update()` bails out when nothing is pending, otherwise renders
//!   and clears the pending flag
//!
//! Connection is signalled through `connected_callback()` and
//! `disconnected_callback()`. An element created with an update pending does
//! not render until it is connected for the first time.

mod base;
mod core;
mod scheduler;

pub use self::base::{Element, Render};
pub use self::core::{ElementCore, ElementId, UpdateRequester};
pub use self::scheduler::{ElementHandle, FlushReport, UpdateScheduler};

use crate::error::Result;

/// The update lifecycle of an element.
///
/// Wrappers such as [`SignalWatcher`](crate::SignalWatcher) implement this
/// trait by delegating to an inner element and adding behavior around the
/// calls.
pub trait ReactiveElement {
    /// Render if an update is pending.
    fn perform_update(&mut self) -> Result<()>;

    /// Called when the element is attached to the host.
    fn connected_callback(&mut self);

    /// Called when the element is detached from the host.
    fn disconnected_callback(&mut self);

    /// Handle for requesting updates without borrowing the element.
    fn update_requester(&self) -> UpdateRequester;

    /// Schedule a future `perform_update`.
    fn request_update(&mut self) {
        self.update_requester().request_update();
    }

    /// Whether an update has been requested and not yet performed.
    fn is_update_pending(&self) -> bool {
        self.update_requester().is_update_pending()
    }
}
