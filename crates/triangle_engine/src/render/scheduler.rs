//! Frame scheduler
//!
//! Owns a ring of N frame slots and drives the per-frame loop:
//!
//! ```text
//! Throttled -> Acquiring -> Recording -> Submitted -> Presenting -> Throttled
//!                 |  ^                                     |
//!                 v  |                                     v
//!              Rebuilding                              Rebuilding
//! ```
//!
//! At most N frames are in flight: before slot `i` is reused the scheduler
//! waits on the gate signaled by the GPU when the previous submission from
//! slot `i` finished. An out-of-date surface at acquisition rebuilds the
//! swapchain and restarts the frame on the same slot. A suboptimal or stale
//! surface at presentation, or a window resize, rebuilds after the frame has
//! been presented. Everything else the backend reports is fatal.
//!
//! All GPU work is drained before the swapchain is rebuilt and before any slot
//! is destroyed.

use std::mem::ManuallyDrop;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::RendererConfig;
use crate::render::backend::{Acquire, BackendError, GraphicsBackend, SwapchainState};
use crate::render::surface::PresentationSurface;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Where the scheduler is in the frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Waiting for the current slot's in-flight gate
    Throttled,
    /// Requesting the next swapchain image
    Acquiring,
    /// Waiting for a drawable surface or rebuilding the swapchain
    Rebuilding,
    /// Re-arming the gate and recording commands
    Recording,
    /// Commands handed to the graphics queue
    Submitted,
    /// Queuing the image for presentation
    Presenting,
    /// Loop ended by a close request or a fatal error
    Terminated,
}

impl std::fmt::Display for FramePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Throttled => "throttle",
            Self::Acquiring => "acquire",
            Self::Rebuilding => "rebuild",
            Self::Recording => "record",
            Self::Submitted => "submit",
            Self::Presenting => "present",
            Self::Terminated => "teardown",
        };
        f.write_str(name)
    }
}

/// Errors that end the frame loop
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Rejected configuration
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// Frame slots could not be created
    #[error("Failed to create frame slots: {0}")]
    Initialization(#[source] BackendError),

    /// Fatal backend failure
    #[error("Backend failure during {phase}: {source}")]
    Backend {
        /// Phase the scheduler was in when the backend failed
        phase: FramePhase,
        /// Underlying backend error
        #[source]
        source: BackendError,
    },

    /// The scheduler already terminated
    #[error("Frame scheduler has terminated")]
    Terminated,
}

impl SchedulerError {
    /// Phase that failed, for backend errors
    pub const fn phase(&self) -> Option<FramePhase> {
        match self {
            Self::Backend { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

fn in_phase(phase: FramePhase) -> impl FnOnce(BackendError) -> SchedulerError {
    move |source| SchedulerError::Backend { phase, source }
}

/// Cycling index into the frame ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIndex {
    current: usize,
    ring_size: usize,
}

impl FrameIndex {
    /// Start at slot 0 of a ring with `ring_size` entries
    pub const fn new(ring_size: usize) -> Self {
        Self { current: 0, ring_size }
    }

    /// Current slot
    pub const fn get(self) -> usize {
        self.current
    }

    /// Number of slots in the ring
    pub const fn ring_size(self) -> usize {
        self.ring_size
    }

    /// Move to the next slot, wrapping at the ring size
    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.ring_size;
    }
}

/// Counters accumulated by the frame loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frames submitted and queued for presentation
    pub frames_presented: u64,
    /// Swapchain rebuilds, whatever triggered them
    pub swapchain_rebuilds: u64,
    /// Acquisitions that found the swapchain out of date
    pub out_of_date_acquires: u64,
}

/// Result of one call to [`FrameScheduler::draw_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and queued for presentation
    Presented {
        /// Swapchain image that was presented
        image_index: u32,
        /// Ring slot that rendered it
        frame_index: usize,
    },
    /// The window closed while waiting for a drawable surface
    Skipped,
}

/// Drives the acquire, record, submit and present loop over a ring of frame slots
pub struct FrameScheduler<B: GraphicsBackend> {
    // Field order is drop order: slots go before the backend that created them.
    slots: Vec<B::FrameSlot>,
    frame_index: FrameIndex,
    swapchain: SwapchainState,
    phase: FramePhase,
    rebuild_pending: bool,
    stats: FrameStats,
    timeout: Option<Duration>,
    drained: bool,
    backend: ManuallyDrop<B>,
}

impl<B: GraphicsBackend> FrameScheduler<B> {
    /// Create the frame ring on top of `backend`
    ///
    /// All slots are created up front with their gates signaled, so the first
    /// N frames never block.
    pub fn new(mut backend: B, config: &RendererConfig) -> SchedulerResult<Self> {
        let frames_in_flight = config.max_frames_in_flight;
        if frames_in_flight == 0 {
            return Err(SchedulerError::InvalidConfig(
                "max_frames_in_flight must be at least 1".to_string(),
            ));
        }

        let slots = (0..frames_in_flight)
            .map(|index| backend.create_frame_slot(index))
            .collect::<Result<Vec<_>, _>>()
            .map_err(SchedulerError::Initialization)?;

        let swapchain = backend.swapchain_state();
        log::info!(
            "Frame scheduler ready: {} frames in flight, swapchain {} with {} images",
            frames_in_flight,
            swapchain.extent,
            swapchain.image_count
        );

        Ok(Self {
            slots,
            frame_index: FrameIndex::new(frames_in_flight),
            swapchain,
            phase: FramePhase::Throttled,
            rebuild_pending: false,
            stats: FrameStats::default(),
            timeout: config.frame_timeout(),
            drained: true,
            backend: ManuallyDrop::new(backend),
        })
    }

    /// Run the frame loop until the surface asks to close
    ///
    /// In-flight work is drained exactly once on the way out, whether the loop
    /// ended normally or on a fatal error. A fatal error takes precedence over
    /// a failing drain.
    pub fn run<S: PresentationSurface>(&mut self, surface: &mut S) -> SchedulerResult<FrameStats> {
        log::info!("Entering frame loop");
        let result = self.frame_loop(surface);

        self.phase = FramePhase::Terminated;
        let drained = self.drain();

        match (result, drained) {
            (Ok(()), Ok(())) => {
                log::info!(
                    "Frame loop finished: {} frames, {} swapchain rebuilds",
                    self.stats.frames_presented,
                    self.stats.swapchain_rebuilds
                );
                Ok(self.stats)
            }
            (Err(error), Ok(())) | (Ok(()), Err(error)) => Err(error),
            (Err(error), Err(drain_error)) => {
                log::error!("Draining after a fatal error also failed: {drain_error}");
                Err(error)
            }
        }
    }

    fn frame_loop<S: PresentationSurface>(&mut self, surface: &mut S) -> SchedulerResult<()> {
        loop {
            surface.poll_events();
            if surface.should_close() {
                log::info!("Close requested");
                return Ok(());
            }
            self.draw_frame(surface)?;
        }
    }

    /// Render and present one frame
    pub fn draw_frame<S: PresentationSurface>(&mut self, surface: &mut S) -> SchedulerResult<FrameOutcome> {
        if self.phase == FramePhase::Terminated {
            return Err(SchedulerError::Terminated);
        }

        // Errors are reported by whoever owns the loop.
        let outcome = self.try_draw_frame(surface);
        if outcome.is_err() {
            self.phase = FramePhase::Terminated;
        }
        outcome
    }

    fn try_draw_frame<S: PresentationSurface>(&mut self, surface: &mut S) -> SchedulerResult<FrameOutcome> {
        let frame_index = self.frame_index.get();

        let image_index = loop {
            self.phase = FramePhase::Throttled;
            self.backend
                .wait_for_slot(&self.slots[frame_index], self.timeout)
                .map_err(in_phase(FramePhase::Throttled))?;

            self.phase = FramePhase::Acquiring;
            let acquired = self
                .backend
                .acquire_next_image(&self.slots[frame_index], self.timeout)
                .map_err(in_phase(FramePhase::Acquiring))?;

            match acquired {
                Acquire::Image { index, suboptimal } => {
                    if suboptimal {
                        log::debug!("Acquired image {index} from a suboptimal swapchain");
                        self.rebuild_pending = true;
                    }
                    break index;
                }
                Acquire::OutOfDate => {
                    log::debug!("Swapchain out of date at acquisition, rebuilding");
                    self.stats.out_of_date_acquires += 1;
                    if !self.rebuild_swapchain(surface)? {
                        return Ok(FrameOutcome::Skipped);
                    }
                }
            }
        };

        // The gate is only re-armed once an image is in hand, so an out-of-date
        // restart above never leaves it unsignaled.
        self.phase = FramePhase::Recording;
        self.backend
            .reset_slot(&self.slots[frame_index])
            .map_err(in_phase(FramePhase::Recording))?;
        self.backend
            .record_frame(frame_index, image_index, self.swapchain.extent)
            .map_err(in_phase(FramePhase::Recording))?;

        self.phase = FramePhase::Submitted;
        self.backend
            .submit(frame_index, &self.slots[frame_index])
            .map_err(in_phase(FramePhase::Submitted))?;
        self.drained = false;

        self.phase = FramePhase::Presenting;
        let status = self
            .backend
            .present(&self.slots[frame_index], image_index)
            .map_err(in_phase(FramePhase::Presenting))?;
        self.stats.frames_presented += 1;

        if status.needs_rebuild() {
            log::debug!("Presentation reported {status:?}, rebuilding");
            self.rebuild_pending = true;
        }
        if surface.take_resize() {
            log::debug!("Framebuffer resized, rebuilding");
            self.rebuild_pending = true;
        }
        if self.rebuild_pending {
            self.rebuild_swapchain(surface)?;
        }

        self.frame_index.advance();
        self.phase = FramePhase::Throttled;

        log::trace!("Presented image {image_index} from frame slot {frame_index}");
        Ok(FrameOutcome::Presented { image_index, frame_index })
    }

    /// Rebuild the swapchain at the surface's current size
    ///
    /// While the surface is minimised this blocks on window events. Returns
    /// `false` without rebuilding if a close is requested during that wait.
    pub fn rebuild_swapchain<S: PresentationSurface>(&mut self, surface: &mut S) -> SchedulerResult<bool> {
        self.phase = FramePhase::Rebuilding;

        let mut extent = surface.framebuffer_extent();
        while extent.is_zero() {
            if surface.should_close() {
                log::info!("Window closed while minimised, skipping swapchain rebuild");
                return Ok(false);
            }
            log::debug!("Surface is minimised, waiting for events");
            surface.wait_events();
            extent = surface.framebuffer_extent();
        }

        self.backend
            .drain_all_work()
            .map_err(in_phase(FramePhase::Rebuilding))?;
        self.swapchain = self
            .backend
            .rebuild_swapchain(extent)
            .map_err(in_phase(FramePhase::Rebuilding))?;

        // Resizes reported up to now are covered by this rebuild.
        surface.take_resize();
        self.rebuild_pending = false;
        self.stats.swapchain_rebuilds += 1;

        log::info!(
            "Swapchain rebuilt: {} with {} images (generation {})",
            self.swapchain.extent,
            self.swapchain.image_count,
            self.swapchain.generation
        );
        Ok(true)
    }

    /// Drain, destroy the frame slots and hand back the backend
    pub fn shutdown(mut self) -> SchedulerResult<B> {
        self.phase = FramePhase::Terminated;
        let drained = if self.drained { Ok(()) } else { self.drain() };
        drop(std::mem::take(&mut self.slots));

        // SAFETY: `self` is forgotten right after, so the backend is never
        // touched or dropped again through it.
        let backend = unsafe { ManuallyDrop::take(&mut self.backend) };
        std::mem::forget(self);

        drained.map(|()| backend)
    }

    fn drain(&mut self) -> SchedulerResult<()> {
        self.drained = true;
        self.backend
            .drain_all_work()
            .map_err(in_phase(FramePhase::Terminated))
    }

    /// Ring slot the next frame renders with
    pub const fn frame_index(&self) -> usize {
        self.frame_index.get()
    }

    /// Number of frame slots
    pub const fn frames_in_flight(&self) -> usize {
        self.frame_index.ring_size()
    }

    /// Current state machine phase
    pub const fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Swapchain the next frame renders into
    pub const fn swapchain(&self) -> &SwapchainState {
        &self.swapchain
    }

    /// Counters so far
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// The backend driving the GPU
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: GraphicsBackend> Drop for FrameScheduler<B> {
    fn drop(&mut self) {
        if !self.drained {
            if let Err(error) = self.drain() {
                log::error!("Failed to drain GPU work during teardown: {error}");
            }
        }
        self.slots.clear();

        // SAFETY: the backend is dropped exactly once, here; `shutdown` forgets
        // `self` instead of running this destructor.
        unsafe { ManuallyDrop::drop(&mut self.backend) };
    }
}
