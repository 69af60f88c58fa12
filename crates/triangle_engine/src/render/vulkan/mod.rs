//! Vulkan rendering backend
//!
//! Thin RAII wrappers over `ash` plus [`VulkanBackend`], which implements
//! [`crate::render::GraphicsBackend`] on top of them.

pub mod backend;
pub mod buffer;
pub mod commands;
pub mod context;
pub mod framebuffer;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex_layout;

pub use backend::VulkanBackend;
pub use buffer::Buffer;
pub use commands::{ActiveRenderPass, CommandPool, CommandRecorder};
pub use context::{
    LogicalDevice, PhysicalDeviceInfo, QueueFamilies, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
    WindowSurface,
};
pub use framebuffer::Framebuffer;
pub use render_pass::RenderPass;
pub use shader::{GraphicsPipeline, ShaderModule};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use vertex_layout::VulkanVertexLayout;
