//! # Core Engine Module
//!
//! Shared configuration used by the window, the Vulkan backend and the
//! frame scheduler.

pub mod config;

pub use config::{
    ApplicationConfig,
    EngineConfig,
    MeshKind,
    RendererConfig,
    ShaderConfig,
    WindowConfig,
};
