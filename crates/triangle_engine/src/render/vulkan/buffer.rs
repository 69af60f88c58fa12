//! Buffer management and memory allocation
//!
//! Geometry lives in device-local memory. It is written once through a
//! host-visible staging buffer and a one-shot copy on the graphics queue.

use ash::{vk, Device};

use crate::render::vulkan::{CommandPool, VulkanError, VulkanResult};

/// Buffer wrapper with its dedicated memory allocation
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a buffer and bind freshly allocated memory with `properties`
    pub fn new(
        device: Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device.create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };

        let memory = find_memory_type(memory_properties, mem_requirements.memory_type_bits, properties)
            .and_then(|memory_type_index| {
                let alloc_info = vk::MemoryAllocateInfo::builder()
                    .allocation_size(mem_requirements.size)
                    .memory_type_index(memory_type_index);
                unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api) }
            });
        let memory = match memory {
            Ok(memory) => memory,
            Err(error) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(error);
            }
        };

        // From here on Drop releases both handles.
        let buffer = Self {
            device,
            buffer,
            memory,
            size,
        };
        unsafe {
            buffer
                .device
                .bind_buffer_memory(buffer.buffer, buffer.memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Ok(buffer)
    }

    /// Copy `bytes` into host-visible memory
    pub fn write_bytes(&self, bytes: &[u8]) -> VulkanResult<()> {
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("Writing {} bytes into a {} byte buffer", bytes.len(), self.size),
            });
        }

        unsafe {
            let data_ptr = self
                .device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), data_ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Upload `bytes` into a new device-local buffer with `usage`
    pub fn device_local(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        command_pool: &CommandPool,
        queue: vk::Queue,
        usage: vk::BufferUsageFlags,
        bytes: &[u8],
    ) -> VulkanResult<Self> {
        let size = bytes.len() as vk::DeviceSize;

        let staging = Self::new(
            device.clone(),
            memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.write_bytes(bytes)?;

        let buffer = Self::new(
            device.clone(),
            memory_properties,
            size,
            vk::BufferUsageFlags::TRANSFER_DST | usage,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;

        command_pool.execute_one_shot(queue, |recorder| {
            recorder.cmd_copy_buffer(staging.handle(), buffer.handle(), size);
        })?;

        Ok(buffer)
    }

    /// Get the buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// First memory type allowed by `type_filter` that has all of `properties`
pub fn find_memory_type(
    mem_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    (0..mem_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && mem_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in properties.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        properties
    }

    #[test]
    fn test_finds_first_matching_type() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;

        assert_eq!(find_memory_type(&props, 0b111, host).unwrap(), 1);
        assert_eq!(find_memory_type(&props, 0b100, host).unwrap(), 2);
        assert_eq!(find_memory_type(&props, 0b111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(), 0);
    }

    #[test]
    fn test_respects_type_filter() {
        let props = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, vk::MemoryPropertyFlags::HOST_VISIBLE]);
        assert!(matches!(
            find_memory_type(&props, 0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL),
            Err(VulkanError::NoSuitableMemoryType)
        ));
    }
}
