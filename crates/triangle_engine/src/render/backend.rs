//! Backend abstraction traits for the frame scheduler
//!
//! The scheduler never touches graphics API handles directly. Everything it
//! needs from the GPU side goes through [`GraphicsBackend`], which the Vulkan
//! backend implements for real rendering and the scheduler tests implement
//! with a recording mock.

use std::time::Duration;
use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by a graphics backend
///
/// Stale surfaces are not errors; they are reported through [`Acquire`] and
/// [`SurfaceStatus`]. Everything here is fatal to the frame loop.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Device lost or any other unrecoverable API failure
    #[error("Device error: {0}")]
    Device(String),

    /// A bounded wait on the GPU expired
    #[error("Timed out after {timeout:?} waiting for {operation}")]
    Timeout {
        /// What the backend was waiting for
        operation: &'static str,
        /// The bound that expired
        timeout: Duration,
    },

    /// Host or device memory exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Backend could not be constructed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

/// Framebuffer or swapchain dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent {
    /// Create an extent
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimised window reports a zero-sized framebuffer
    pub const fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The scheduler's view of the current swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainState {
    /// Image dimensions
    pub extent: Extent,
    /// Number of presentable images
    pub image_count: u32,
    /// Backend pixel format code (`vk::Format` raw value for Vulkan)
    pub format: i32,
    /// Bumped on every rebuild
    pub generation: u64,
}

/// Outcome of requesting the next presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// An image was acquired
    Image {
        /// Index into the swapchain images
        index: u32,
        /// Usable, but the swapchain no longer matches the surface exactly
        suboptimal: bool,
    },
    /// The swapchain can no longer present to the surface
    OutOfDate,
}

/// Surface condition reported by presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Presented and the swapchain still matches the surface
    Optimal,
    /// Presented, but the swapchain should be rebuilt
    Suboptimal,
    /// The swapchain can no longer present to the surface
    OutOfDate,
}

impl SurfaceStatus {
    /// Whether the swapchain must be rebuilt before the next frame
    pub const fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Optimal)
    }
}

/// GPU-side operations used by the frame scheduler
///
/// A frame slot bundles the per-frame synchronization objects: an
/// image-acquired signal, a render-complete signal and an in-flight gate that
/// starts out signaled. Per-slot command buffers are owned by the backend and
/// addressed by `frame_index`.
pub trait GraphicsBackend {
    /// Per-slot synchronization objects
    type FrameSlot;

    /// Create the synchronization objects for ring entry `index`, gate signaled
    fn create_frame_slot(&mut self, index: usize) -> BackendResult<Self::FrameSlot>;

    /// Current swapchain description
    fn swapchain_state(&self) -> SwapchainState;

    /// Block until the slot's in-flight gate is signaled
    fn wait_for_slot(&mut self, slot: &Self::FrameSlot, timeout: Option<Duration>) -> BackendResult<()>;

    /// Request the next presentable image, signalling the slot's image-acquired semaphore
    fn acquire_next_image(&mut self, slot: &Self::FrameSlot, timeout: Option<Duration>) -> BackendResult<Acquire>;

    /// Re-arm the slot's in-flight gate
    fn reset_slot(&mut self, slot: &Self::FrameSlot) -> BackendResult<()>;

    /// Reset and re-record the command buffer of `frame_index` for `image_index`
    fn record_frame(&mut self, frame_index: usize, image_index: u32, extent: Extent) -> BackendResult<()>;

    /// Submit the recorded commands, signalling the slot's render-complete semaphore and gate
    fn submit(&mut self, frame_index: usize, slot: &Self::FrameSlot) -> BackendResult<()>;

    /// Queue `image_index` for presentation once rendering completes
    fn present(&mut self, slot: &Self::FrameSlot, image_index: u32) -> BackendResult<SurfaceStatus>;

    /// Replace the swapchain and everything derived from it
    fn rebuild_swapchain(&mut self, extent: Extent) -> BackendResult<SwapchainState>;

    /// Block until all submitted GPU work has completed
    fn drain_all_work(&mut self) -> BackendResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_extent_detection() {
        assert!(Extent::new(0, 600).is_zero());
        assert!(Extent::new(800, 0).is_zero());
        assert!(!Extent::new(800, 600).is_zero());
        assert_eq!(Extent::new(800, 600).to_string(), "800x600");
    }

    #[test]
    fn test_only_optimal_present_keeps_swapchain() {
        assert!(!SurfaceStatus::Optimal.needs_rebuild());
        assert!(SurfaceStatus::Suboptimal.needs_rebuild());
        assert!(SurfaceStatus::OutOfDate.needs_rebuild());
    }
}
