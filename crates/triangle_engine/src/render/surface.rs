//! Presentation surface abstraction
//!
//! The window side of the frame loop: close requests, the event pump and the
//! drawable size.

use crate::render::backend::Extent;

/// A window the scheduler presents into
pub trait PresentationSurface {
    /// Whether the user asked to close the window
    fn should_close(&self) -> bool;

    /// Process pending window events without blocking
    fn poll_events(&mut self);

    /// Block until at least one window event arrives, then process it
    fn wait_events(&mut self);

    /// Current framebuffer size in pixels; zero while minimised
    fn framebuffer_extent(&self) -> Extent;

    /// Return and clear the pending framebuffer-resize notification
    fn take_resize(&mut self) -> bool;
}
