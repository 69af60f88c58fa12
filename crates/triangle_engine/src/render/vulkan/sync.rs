//! Vulkan synchronization primitives for GPU/CPU coordination
//!
//! Semaphores order GPU work (acquire before render, render before present).
//! Fences let the CPU wait for a frame's submission to finish, which is what
//! bounds the number of frames in flight.

use ash::{vk, Device};
use std::time::Duration;

use crate::render::vulkan::{VulkanError, VulkanResult};

/// Convert an optional bound into the nanosecond timeout Vulkan expects
pub fn timeout_nanos(timeout: Option<Duration>) -> u64 {
    timeout.map_or(u64::MAX, |timeout| u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX))
}

/// GPU-GPU synchronization primitive with automatic resource management
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a new binary semaphore
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();

        let semaphore = unsafe {
            device.create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, semaphore })
    }

    /// Get the semaphore handle
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// Fence wrapper with RAII cleanup
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a new fence
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe {
            device.create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, fence })
    }

    /// Wait for the fence, `Api(TIMEOUT)` if it stays unsignaled past `timeout` ns
    pub fn wait(&self, timeout: u64) -> VulkanResult<()> {
        unsafe {
            self.device.wait_for_fences(&[self.fence], true, timeout)
                .map_err(VulkanError::Api)
        }
    }

    /// Reset fence to unsignaled
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device.reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Get the fence handle
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Frame synchronization objects for one slot of the in-flight ring
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is ready to be rendered into
    pub image_available: Semaphore,
    /// Signaled when the frame's commands finished, waited on by presentation
    pub render_finished: Semaphore,
    /// Signaled when the slot's submission completed; created signaled
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create frame synchronization objects
    pub fn new(device: Device) -> VulkanResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        assert_eq!(timeout_nanos(None), u64::MAX);
        assert_eq!(timeout_nanos(Some(Duration::from_millis(3))), 3_000_000);
        assert_eq!(timeout_nanos(Some(Duration::MAX)), u64::MAX);
    }
}
