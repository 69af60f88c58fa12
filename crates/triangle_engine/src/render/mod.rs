//! Rendering
//!
//! The frame scheduler and its backend seam, the window, built-in geometry
//! and the Vulkan implementation.

pub mod backend;
pub mod mesh;
pub mod scheduler;
pub mod surface;
pub mod vulkan;
pub mod window;


pub use backend::{Acquire, BackendError, BackendResult, Extent, GraphicsBackend, SurfaceStatus, SwapchainState};
pub use mesh::{Mesh, Vertex};
pub use scheduler::{FrameIndex, FrameOutcome, FramePhase, FrameScheduler, FrameStats, SchedulerError, SchedulerResult};
pub use surface::PresentationSurface;
pub use window::{Window, WindowError};
