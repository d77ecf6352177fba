//! A plain element that renders through a [`Render`] implementation.

use tracing::debug;

use super::core::{ElementCore, UpdateRequester};
use super::{ReactiveElement, UpdateScheduler};
use crate::error::Result;

/// Produces an element's output.
pub trait Render {
    /// Render the element's current output.
    fn render(&mut self) -> Result<String>;
}

impl<F> Render for F
where
    F: FnMut() -> Result<String>,
{
    fn render(&mut self) -> Result<String> {
        self()
    }
}

/// Base element: lifecycle bookkeeping around a renderer.
///
/// Knows nothing about signals. Wrap it in a
/// [`SignalWatcher`](crate::SignalWatcher) to re-render when the signals
/// read by the renderer change.
///
/// # Example
///
/// ```rust,ignore
/// let scheduler = UpdateScheduler::default();
/// let greeting = Element::new(&scheduler, || Ok("hello".to_string()));
/// let handle = scheduler.mount(greeting);
///
/// handle.connect();
/// scheduler.flush();
/// assert_eq!(handle.borrow().output(), Some("hello"));
/// ```
pub struct Element<R> {
    core: ElementCore,
    renderer: R,
    output: Option<String>,
    render_count: usize,
}

impl<R: Render> Element<R> {
    /// Create an element on `scheduler`, with its first update pending.
    pub fn new(scheduler: &UpdateScheduler, renderer: R) -> Self {
        Self {
            core: ElementCore::new(scheduler),
            renderer,
            output: None,
            render_count: 0,
        }
    }

    /// Output of the last successful render.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// Number of times the renderer was called.
    pub fn render_count(&self) -> usize {
        self.render_count
    }

    /// Whether the element is attached.
    pub fn is_connected(&self) -> bool {
        self.core.is_connected()
    }

    /// Access the renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

impl<R: Render> ReactiveElement for Element<R> {
    fn perform_update(&mut self) -> Result<()> {
        if !self.core.is_update_pending() {
            return Ok(());
        }

        self.render_count += 1;
        let rendered = self.renderer.render();
        // cleared even when rendering failed, so a later request can retry
        self.core.mark_updated();

        let output = rendered?;
        debug!(element = %self.core.id(), render = self.render_count, "rendered");
        self.output = Some(output);
        Ok(())
    }

    fn connected_callback(&mut self) {
        self.core.connect();
    }

    fn disconnected_callback(&mut self) {
        self.core.disconnect();
    }

    fn update_requester(&self) -> UpdateRequester {
        self.core.requester()
    }
}
