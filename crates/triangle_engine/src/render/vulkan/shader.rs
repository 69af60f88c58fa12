//! Shader module and graphics pipeline management

use ash::{vk, Device};
use std::ffi::CStr;
use std::path::Path;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Shader module wrapper
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a module from SPIR-V bytes
    pub fn from_bytes(device: Device, bytes: &[u8]) -> VulkanResult<Self> {
        let code = ash::util::read_spv(&mut std::io::Cursor::new(bytes))
            .map_err(|e| VulkanError::InitializationFailed(format!("Invalid SPIR-V: {e}")))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);

        let module = unsafe {
            device.create_shader_module(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, module })
    }

    /// Load a compiled SPIR-V file
    pub fn from_file(device: Device, path: impl AsRef<Path>) -> VulkanResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            VulkanError::InitializationFailed(format!("Failed to read shader {}: {e}", path.display()))
        })?;
        log::debug!("Loaded shader {} ({} bytes)", path.display(), bytes.len());

        Self::from_bytes(device, &bytes)
    }

    /// Stage description using `entry_point`
    pub fn stage_info(&self, stage: vk::ShaderStageFlags, entry_point: &CStr) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// Graphics pipeline with its layout
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build the triangle pipeline
    ///
    /// Viewport and scissor are dynamic, so the pipeline survives swapchain
    /// rebuilds.
    pub fn new(
        device: Device,
        render_pass: vk::RenderPass,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        vertex_input_info: &vk::PipelineVertexInputStateCreateInfo,
    ) -> VulkanResult<Self> {
        let entry_point = CStr::from_bytes_with_nul(b"main\0")
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;

        let shader_stages = [
            vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX, entry_point),
            fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT, entry_point),
        ];

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_attachment = vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build();
        let color_blend_attachments = [color_blend_attachment];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        let layout = unsafe {
            device.create_pipeline_layout(&layout_info, None)
                .map_err(VulkanError::Api)?
        };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
        };

        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };

        Ok(Self {
            device,
            pipeline,
            layout,
        })
    }

    /// Get the pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

