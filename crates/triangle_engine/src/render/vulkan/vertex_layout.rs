//! Vulkan vertex input layout for [`Vertex`]

use ash::vk;
use std::mem::size_of;

use crate::render::mesh::Vertex;

/// Vertex input description matching the triangle shaders
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// Single interleaved binding
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Vertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position at location 0, colour at location 1
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: size_of::<[f32; 2]>() as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_vertex() {
        let binding = VulkanVertexLayout::binding_description();
        assert_eq!(binding.stride, 20);

        let [position, color] = VulkanVertexLayout::attribute_descriptions();
        assert_eq!(position.offset, 0);
        assert_eq!(color.offset, 8);
        assert_eq!(color.location, 1);
    }
}
