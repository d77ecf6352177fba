//! Reactive Primitives
//!
//! This module implements the reactive system the watcher composes: signals,
//! computeds, and watchers.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (a computed), the signal registers that computed
//! as a consumer. When the value changes, every consumer is marked stale.
//!
//! ## Computeds
//!
//! A Computed is a derived value that caches its result. Evaluating it runs
//! the computation inside a tracking context, which records every signal or
//! computed read along the way.
//!
//! ## Watchers
//!
//! A Watcher holds a set of computeds and invokes a callback once when any of
//! them becomes stale. It is how code outside the reactive graph (such as an
//! element's update scheduler) learns that it should do work again.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.
//!
//! Everything here is single-threaded: nodes live behind `Rc`, producers hold
//! their consumers weakly, and consumers hold their producers strongly.

mod computed;
mod context;
mod node;
mod runtime;
mod signal;
mod watcher;

pub use computed::{Computed, ComputedState};
pub use context::untracked;
pub use node::NodeId;
pub use signal::Signal;
pub use watcher::{Watcher, WatcherStats};
