//! Vulkan implementation of the frame scheduler backend
//!
//! Owns every GPU object the triangle needs. Frame slots (semaphores and the
//! in-flight fence) are created on request and owned by the scheduler; the
//! command buffer for each slot stays here, indexed by frame.
//!
//! Resources are released by field order: swapchain-derived objects first,
//! the context (and with it the device) last.

use ash::prelude::VkResult;
use ash::{vk, Device};
use std::time::Duration;

use crate::core::config::{RendererConfig, ShaderConfig};
use crate::render::backend::{
    Acquire, BackendError, BackendResult, Extent, GraphicsBackend, SurfaceStatus, SwapchainState,
};
use crate::render::mesh::Mesh;
use crate::render::surface::PresentationSurface;
use crate::render::vulkan::sync::timeout_nanos;
use crate::render::vulkan::{
    Buffer, CommandPool, CommandRecorder, Framebuffer, FrameSync, GraphicsPipeline, RenderPass, ShaderModule,
    Swapchain, VulkanContext, VulkanError, VulkanResult, VulkanVertexLayout,
};
use crate::render::window::Window;

/// Fail before touching the driver when a SPIR-V file is missing
fn check_shader_files(shaders: &ShaderConfig) -> VulkanResult<()> {
    shaders.validate().map_err(VulkanError::InitializationFailed)
}

/// Map an expired bounded wait onto the backend's timeout error
fn classify_wait(result: VulkanResult<()>, operation: &'static str, timeout: Option<Duration>) -> BackendResult<()> {
    match result {
        Err(VulkanError::Api(vk::Result::TIMEOUT)) => Err(BackendError::Timeout {
            operation,
            timeout: timeout.unwrap_or(Duration::MAX),
        }),
        other => other.map_err(BackendError::from),
    }
}

/// Translate `vkAcquireNextImageKHR` results
fn classify_acquire(result: VkResult<(u32, bool)>, timeout: Option<Duration>) -> BackendResult<Acquire> {
    match result {
        Ok((index, suboptimal)) => Ok(Acquire::Image { index, suboptimal }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Acquire::OutOfDate),
        Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Err(BackendError::Timeout {
            operation: "swapchain image",
            timeout: timeout.unwrap_or(Duration::MAX),
        }),
        Err(code) => Err(VulkanError::Api(code).into()),
    }
}

/// Translate `vkQueuePresentKHR` results
fn classify_present(result: VkResult<bool>) -> BackendResult<SurfaceStatus> {
    match result {
        Ok(false) => Ok(SurfaceStatus::Optimal),
        Ok(true) => Ok(SurfaceStatus::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::OutOfDate),
        Err(code) => Err(VulkanError::Api(code).into()),
    }
}

/// Vulkan renderer driven by [`crate::render::FrameScheduler`]
pub struct VulkanBackend {
    framebuffers: Vec<Framebuffer>,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
    command_buffers: Vec<vk::CommandBuffer>,
    command_pool: CommandPool,
    swapchain: Swapchain,
    generation: u64,
    clear_color: [f32; 4],
    device: Device,
    context: VulkanContext,
}

impl VulkanBackend {
    /// Create the device, swapchain, pipeline and geometry for `window`
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        check_shader_files(&config.shaders)?;
        let context = VulkanContext::new(window, config)?;
        let device = context.raw_device();

        let swapchain = Swapchain::new(&context, window.framebuffer_extent(), None)?;
        let render_pass = RenderPass::new_color_pass(device.clone(), swapchain.format().format)?;
        let framebuffers = Framebuffer::for_swapchain(&device, render_pass.handle(), &swapchain)?;

        let pipeline = {
            let vertex_shader = ShaderModule::from_file(device.clone(), &config.shaders.vertex_shader_path)?;
            let fragment_shader = ShaderModule::from_file(device.clone(), &config.shaders.fragment_shader_path)?;

            let bindings = [VulkanVertexLayout::binding_description()];
            let attributes = VulkanVertexLayout::attribute_descriptions();
            let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
                .vertex_binding_descriptions(&bindings)
                .vertex_attribute_descriptions(&attributes);

            // Shader modules are only needed until the pipeline exists.
            GraphicsPipeline::new(
                device.clone(),
                render_pass.handle(),
                &vertex_shader,
                &fragment_shader,
                &vertex_input_info,
            )?
        };

        let command_pool = CommandPool::new(device.clone(), context.queue_families().graphics)?;

        let mesh = Mesh::from_kind(config.mesh);
        let memory_properties = &context.physical_device.memory_properties;
        let vertex_buffer = Buffer::device_local(
            &device,
            memory_properties,
            &command_pool,
            context.graphics_queue(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            bytemuck::cast_slice(&mesh.vertices),
        )?;
        let index_buffer = Buffer::device_local(
            &device,
            memory_properties,
            &command_pool,
            context.graphics_queue(),
            vk::BufferUsageFlags::INDEX_BUFFER,
            bytemuck::cast_slice(&mesh.indices),
        )?;

        log::info!(
            "Vulkan backend ready on {}: {:?} mesh, {} indices",
            context.physical_device.name(),
            config.mesh,
            mesh.index_count()
        );

        Ok(Self {
            framebuffers,
            pipeline,
            render_pass,
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            command_buffers: Vec::new(),
            command_pool,
            swapchain,
            generation: 0,
            clear_color: config.clear_color,
            device,
            context,
        })
    }

    /// The underlying context
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }

    fn command_buffer(&self, frame_index: usize) -> VulkanResult<vk::CommandBuffer> {
        self.command_buffers
            .get(frame_index)
            .copied()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("No command buffer for frame {frame_index}"),
            })
    }

    fn record(&self, frame_index: usize, image_index: u32, extent: Extent) -> VulkanResult<()> {
        let framebuffer = self
            .framebuffers
            .get(image_index as usize)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("Swapchain image {image_index} has no framebuffer"),
            })?
            .handle();

        let mut recorder = CommandRecorder::new(self.command_buffer(frame_index)?, self.device.clone());
        recorder.reset()?.begin(vk::CommandBufferUsageFlags::empty())?;

        let extent = vk::Extent2D {
            width: extent.width,
            height: extent.height,
        };
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];

        {
            let mut render_pass =
                recorder.begin_render_pass(self.render_pass.handle(), framebuffer, render_area, &clear_values)?;

            render_pass.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            render_pass.set_viewport(&viewport);
            render_pass.set_scissor(&render_area);

            render_pass.cmd_bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
            render_pass.cmd_bind_index_buffer(self.index_buffer.handle(), 0, vk::IndexType::UINT16);
            render_pass.cmd_draw_indexed(self.index_count, 1, 0, 0, 0);
        }

        recorder.end()?;
        Ok(())
    }

    fn submit_recorded(&self, frame_index: usize, slot: &FrameSync) -> VulkanResult<()> {
        let wait_semaphores = [slot.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.command_buffer(frame_index)?];
        let signal_semaphores = [slot.render_finished.handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device
                .queue_submit(self.context.graphics_queue(), &[submit_info.build()], slot.in_flight.handle())
                .map_err(VulkanError::Api)
        }
    }

    fn recreate_swapchain(&mut self, extent: Extent) -> VulkanResult<()> {
        let swapchain = Swapchain::new(&self.context, extent, Some(&self.swapchain))?;
        if swapchain.format().format != self.swapchain.format().format {
            return Err(VulkanError::InvalidOperation {
                reason: format!(
                    "Surface format changed from {:?} to {:?}",
                    self.swapchain.format().format,
                    swapchain.format().format
                ),
            });
        }
        let framebuffers = Framebuffer::for_swapchain(&self.device, self.render_pass.handle(), &swapchain)?;

        // Old framebuffers reference the old image views, so they go first.
        self.framebuffers = framebuffers;
        self.swapchain = swapchain;
        self.generation += 1;
        Ok(())
    }
}

impl GraphicsBackend for VulkanBackend {
    type FrameSlot = FrameSync;

    fn create_frame_slot(&mut self, index: usize) -> BackendResult<FrameSync> {
        if index > self.command_buffers.len() {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Frame slot {index} created out of order"),
            }
            .into());
        }

        let slot = FrameSync::new(self.device.clone())?;
        if index == self.command_buffers.len() {
            let buffers = self.command_pool.allocate_command_buffers(1)?;
            self.command_buffers.extend(buffers);
        }
        Ok(slot)
    }

    fn swapchain_state(&self) -> SwapchainState {
        let extent = self.swapchain.extent();
        SwapchainState {
            extent: Extent::new(extent.width, extent.height),
            image_count: self.swapchain.image_count(),
            format: self.swapchain.format().format.as_raw(),
            generation: self.generation,
        }
    }

    fn wait_for_slot(&mut self, slot: &FrameSync, timeout: Option<Duration>) -> BackendResult<()> {
        classify_wait(slot.in_flight.wait(timeout_nanos(timeout)), "frame slot", timeout)
    }

    fn acquire_next_image(&mut self, slot: &FrameSync, timeout: Option<Duration>) -> BackendResult<Acquire> {
        let result = self
            .swapchain
            .acquire_next_image(slot.image_available.handle(), timeout_nanos(timeout));
        classify_acquire(result, timeout)
    }

    fn reset_slot(&mut self, slot: &FrameSync) -> BackendResult<()> {
        Ok(slot.in_flight.reset()?)
    }

    fn record_frame(&mut self, frame_index: usize, image_index: u32, extent: Extent) -> BackendResult<()> {
        Ok(self.record(frame_index, image_index, extent)?)
    }

    fn submit(&mut self, frame_index: usize, slot: &FrameSync) -> BackendResult<()> {
        Ok(self.submit_recorded(frame_index, slot)?)
    }

    fn present(&mut self, slot: &FrameSync, image_index: u32) -> BackendResult<SurfaceStatus> {
        let result = self.swapchain.queue_present(
            self.context.present_queue(),
            slot.render_finished.handle(),
            image_index,
        );
        classify_present(result)
    }

    fn rebuild_swapchain(&mut self, extent: Extent) -> BackendResult<SwapchainState> {
        log::info!("Recreating swapchain for {extent}");
        self.recreate_swapchain(extent)?;
        Ok(self.swapchain_state())
    }

    fn drain_all_work(&mut self) -> BackendResult<()> {
        Ok(self.context.wait_idle()?)
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        log::debug!("Cleaning up VulkanBackend...");
        if let Err(error) = self.context.wait_idle() {
            log::warn!("Device did not go idle before cleanup: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_shader_rejected_at_startup() {
        let config = RendererConfig::default()
            .with_shaders(ShaderConfig::new("missing/vert.spv", "missing/frag.spv"));
        match check_shader_files(&config.shaders) {
            Err(VulkanError::InitializationFailed(reason)) => assert!(reason.contains("missing/vert.spv"), "{reason}"),
            other => panic!("expected initialization failure, got {other:?}"),
        }
    }

    #[test]
    fn test_acquire_classification() {
        assert_eq!(
            classify_acquire(Ok((2, false)), None).unwrap(),
            Acquire::Image { index: 2, suboptimal: false }
        );
        assert_eq!(
            classify_acquire(Ok((0, true)), None).unwrap(),
            Acquire::Image { index: 0, suboptimal: true }
        );
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR), None).unwrap(),
            Acquire::OutOfDate
        );
        assert!(matches!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST), None),
            Err(BackendError::Device(_))
        ));
    }

    #[test]
    fn test_acquire_timeout_is_fatal() {
        let bound = Some(Duration::from_millis(50));
        for code in [vk::Result::TIMEOUT, vk::Result::NOT_READY] {
            match classify_acquire(Err(code), bound) {
                Err(BackendError::Timeout { operation, timeout }) => {
                    assert_eq!(operation, "swapchain image");
                    assert_eq!(timeout, Duration::from_millis(50));
                }
                other => panic!("expected timeout, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_present_classification() {
        assert_eq!(classify_present(Ok(false)).unwrap(), SurfaceStatus::Optimal);
        assert_eq!(classify_present(Ok(true)).unwrap(), SurfaceStatus::Suboptimal);
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            SurfaceStatus::OutOfDate
        );
        assert!(matches!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY)),
            Err(BackendError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_wait_classification() {
        assert!(classify_wait(Ok(()), "frame slot", None).is_ok());
        assert!(matches!(
            classify_wait(Err(VulkanError::Api(vk::Result::TIMEOUT)), "frame slot", Some(Duration::from_secs(1))),
            Err(BackendError::Timeout { operation: "frame slot", .. })
        ));
        assert!(matches!(
            classify_wait(Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST)), "frame slot", None),
            Err(BackendError::Device(_))
        ));
    }
}
