//! # Triangle Engine
//!
//! Frame scheduling and Vulkan presentation for a "Hello Triangle" renderer.
//!
//! ## Features
//!
//! - **Frame Scheduler**: bounded frames-in-flight with per-slot semaphores and fences
//! - **Swapchain Recreation**: out-of-date and suboptimal surfaces are rebuilt transparently
//! - **Backend Abstraction**: the scheduler only talks to [`render::GraphicsBackend`]
//! - **Configuration**: TOML/RON application configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use triangle_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut window = Window::new(&config.window)?;
//!     let backend = VulkanBackend::new(&mut window, &config.renderer)?;
//!     let mut scheduler = FrameScheduler::new(backend, &config.renderer)?;
//!     let stats = scheduler.run(&mut window)?;
//!     log::info!("Presented {} frames", stats.frames_presented);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::config::{ApplicationConfig, EngineConfig, MeshKind, RendererConfig, ShaderConfig, WindowConfig},
        render::{
            FrameOutcome, FramePhase, FrameScheduler, FrameStats, GraphicsBackend, PresentationSurface,
            SchedulerError,
            vulkan::{VulkanBackend, VulkanError},
            window::{Window, WindowError},
        },
    };
}
