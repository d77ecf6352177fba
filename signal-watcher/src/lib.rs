//! Signal Watcher
//!
//! This crate re-renders reactive elements when the signals they read
//! change. It implements:
//!
//! - Reactive primitives (signals, computeds, watchers)
//! - A host element lifecycle (connect, disconnect, request / perform update)
//! - [`SignalWatcher`], which ties the two together
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Signals, computeds, watchers and dependency tracking
//! - `element`: Element lifecycle trait, base element, update scheduler
//! - `signal_watcher`: The wrapper that tracks an element's renders
//!
//! Everything is single-threaded. Signal writes mark elements pending
//! synchronously; renders happen when the host flushes the scheduler.
//!
//! # Example
//!
//! ```rust,ignore
//! use signal_watcher::{Element, Signal, UpdateScheduler, WatchSignals};
//!
//! let scheduler = UpdateScheduler::default();
//! let count = Signal::new(0);
//!
//! let source = count.clone();
//! let counter = Element::new(&scheduler, move || Ok(format!("count: {}", source.get())));
//! let handle = scheduler.mount(counter.watch_signals());
//!
//! handle.connect();
//! scheduler.flush();
//! // renders "count: 0"
//!
//! count.set(5);
//! scheduler.flush();
//! // renders "count: 5"
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod reactive;
mod signal_watcher;

pub use config::SchedulerConfig;
pub use element::{
    Element, ElementCore, ElementHandle, ElementId, FlushReport, ReactiveElement, Render,
    UpdateRequester, UpdateScheduler,
};
pub use error::{Error, Result};
pub use reactive::{untracked, Computed, ComputedState, Signal, Watcher, WatcherStats};
pub use signal_watcher::{Disposer, SignalWatcher, TrackingState, WatchSignals};
