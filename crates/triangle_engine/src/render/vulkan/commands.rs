//! Command buffer management and recording
//!
//! `CommandRecorder` tracks whether a buffer is recording; `ActiveRenderPass`
//! ends its render pass when dropped.

use ash::{vk, Device};

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Command pool wrapper
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device.create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            command_pool,
        })
    }

    /// Allocate primary command buffers
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        unsafe {
            self.device.allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)
        }
    }

    /// Record commands into a temporary buffer, submit them and wait for completion
    pub fn execute_one_shot<F>(&self, queue: vk::Queue, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&mut CommandRecorder),
    {
        let command_buffer = self
            .allocate_command_buffers(1)?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "Driver returned no command buffer".to_string(),
            })?;

        let result = (|| {
            let mut recorder = CommandRecorder::new(command_buffer, self.device.clone());
            recorder.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
            record(&mut recorder);
            let command_buffer = recorder.end()?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers).build();
            unsafe {
                self.device
                    .queue_submit(queue, &[submit_info], vk::Fence::null())
                    .map_err(VulkanError::Api)?;
                self.device.queue_wait_idle(queue).map_err(VulkanError::Api)
            }
        })();

        unsafe {
            self.device.free_command_buffers(self.command_pool, &[command_buffer]);
        }
        result
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // Frees every buffer allocated from the pool.
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Command buffer recording wrapper
pub struct CommandRecorder {
    command_buffer: vk::CommandBuffer,
    device: Device,
    recording: bool,
}

impl CommandRecorder {
    /// Wrap an allocated command buffer
    pub fn new(command_buffer: vk::CommandBuffer, device: Device) -> Self {
        Self {
            command_buffer,
            device,
            recording: false,
        }
    }

    /// Discard previously recorded commands
    pub fn reset(&mut self) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Cannot reset a command buffer while recording".to_string(),
            });
        }

        unsafe {
            self.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
        }
        Ok(self)
    }

    /// Begin recording
    pub fn begin(&mut self, flags: vk::CommandBufferUsageFlags) -> VulkanResult<&mut Self> {
        if self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer already recording".to_string(),
            });
        }

        let begin_info = vk::CommandBufferBeginInfo::builder().flags(flags);

        unsafe {
            self.device.begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        self.recording = true;
        Ok(self)
    }

    /// Begin a render pass with inline contents
    pub fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) -> VulkanResult<ActiveRenderPass<'_>> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(render_area)
            .clear_values(clear_values);

        unsafe {
            self.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );
        }

        Ok(ActiveRenderPass { recorder: self })
    }

    /// Copy a whole buffer region
    pub fn cmd_copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, size: vk::DeviceSize) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.device.cmd_copy_buffer(self.command_buffer, src, dst, &[region]);
        }
    }

    /// Finish recording
    pub fn end(mut self) -> VulkanResult<vk::CommandBuffer> {
        if !self.recording {
            return Err(VulkanError::InvalidOperation {
                reason: "Command buffer not recording".to_string(),
            });
        }

        unsafe {
            self.device.end_command_buffer(self.command_buffer)
                .map_err(VulkanError::Api)?;
        }

        self.recording = false;
        Ok(self.command_buffer)
    }
}

/// Render pass in progress, ended on drop
pub struct ActiveRenderPass<'a> {
    recorder: &'a mut CommandRecorder,
}

impl ActiveRenderPass<'_> {
    /// Set dynamic viewport 0
    pub fn set_viewport(&mut self, viewport: &vk::Viewport) {
        unsafe {
            self.recorder.device.cmd_set_viewport(self.recorder.command_buffer, 0, &[*viewport]);
        }
    }

    /// Set dynamic scissor 0
    pub fn set_scissor(&mut self, scissor: &vk::Rect2D) {
        unsafe {
            self.recorder.device.cmd_set_scissor(self.recorder.command_buffer, 0, &[*scissor]);
        }
    }

    /// Bind a pipeline
    pub fn cmd_bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        unsafe {
            self.recorder.device.cmd_bind_pipeline(self.recorder.command_buffer, bind_point, pipeline);
        }
    }

    /// Bind vertex buffers
    pub fn cmd_bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[vk::Buffer], offsets: &[vk::DeviceSize]) {
        unsafe {
            self.recorder.device.cmd_bind_vertex_buffers(self.recorder.command_buffer, first_binding, buffers, offsets);
        }
    }

    /// Bind an index buffer
    pub fn cmd_bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        unsafe {
            self.recorder.device.cmd_bind_index_buffer(self.recorder.command_buffer, buffer, offset, index_type);
        }
    }

    /// Indexed draw
    pub fn cmd_draw_indexed(&mut self, index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32) {
        unsafe {
            self.recorder.device.cmd_draw_indexed(
                self.recorder.command_buffer,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
    }
}

impl Drop for ActiveRenderPass<'_> {
    fn drop(&mut self) {
        unsafe {
            self.recorder.device.cmd_end_render_pass(self.recorder.command_buffer);
        }
    }
}
