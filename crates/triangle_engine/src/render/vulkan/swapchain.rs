//! Swapchain creation and presentation
//!
//! The selection policy (format, present mode, extent, image count) lives in
//! free functions so it can be checked without a device.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::prelude::VkResult;
use ash::{vk, Device};

use crate::render::backend::Extent;
use crate::render::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Prefer 8-bit BGRA sRGB, otherwise take whatever the surface lists first
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|sf| sf.format == vk::Format::B8G8R8A8_SRGB && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| formats.first())
        .copied()
}

/// Prefer mailbox, otherwise FIFO which every implementation supports
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    present_modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Use the surface's extent, or the framebuffer size clamped to the surface limits
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, framebuffer: Extent) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: framebuffer
            .width
            .clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: framebuffer
            .height
            .clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// One more than the minimum, capped by the maximum (0 means no maximum)
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Swapchain with its images and image views
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a swapchain for the context's surface
    ///
    /// When `old` is given its handle is passed as `old_swapchain`; the caller
    /// drops it once the new one exists.
    pub fn new(context: &VulkanContext, framebuffer: Extent, old: Option<&Self>) -> VulkanResult<Self> {
        let device = context.raw_device();
        let swapchain_loader = context.device.swapchain_loader.clone();
        let physical_device = context.physical_device.device;

        let (capabilities, formats, present_modes) = context.surface.support(physical_device)?;

        let format = choose_surface_format(&formats).ok_or_else(|| VulkanError::InvalidOperation {
            reason: "Surface reports no formats".to_string(),
        })?;
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_extent(&capabilities, framebuffer);
        let image_count = choose_image_count(&capabilities);

        let families = context.queue_families();
        let family_indices = families.unique();
        let sharing_mode = if family_indices.len() > 1 {
            vk::SharingMode::CONCURRENT
        } else {
            vk::SharingMode::EXCLUSIVE
        };

        let mut create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(context.surface.handle())
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old.map_or(vk::SwapchainKHR::null(), Self::handle));
        if sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(&family_indices);
        }

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = match unsafe { swapchain_loader.get_swapchain_images(swapchain) } {
            Ok(images) => images,
            Err(error) => {
                unsafe { swapchain_loader.destroy_swapchain(swapchain, None) };
                return Err(VulkanError::Api(error));
            }
        };

        let mut image_views = Vec::with_capacity(images.len());
        for &image in &images {
            let view_info = vk::ImageViewCreateInfo::builder()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format.format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            match unsafe { device.create_image_view(&view_info, None) } {
                Ok(view) => image_views.push(view),
                Err(error) => {
                    unsafe {
                        for &view in &image_views {
                            device.destroy_image_view(view, None);
                        }
                        swapchain_loader.destroy_swapchain(swapchain, None);
                    }
                    return Err(VulkanError::Api(error));
                }
            }
        }

        log::debug!(
            "Created swapchain {}x{}, {} images, {:?}, {:?}",
            extent.width,
            extent.height,
            images.len(),
            format.format,
            present_mode
        );

        Ok(Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views,
            format,
            extent,
        })
    }

    /// Acquire the next image, signalling `semaphore` when it is ready
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    pub fn acquire_next_image(&self, semaphore: vk::Semaphore, timeout: u64) -> VkResult<(u32, bool)> {
        unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, timeout, semaphore, vk::Fence::null())
        }
    }

    /// Queue `image_index` for presentation after `wait_semaphore`
    ///
    /// Returns whether the swapchain is suboptimal.
    pub fn queue_present(&self, queue: vk::Queue, wait_semaphore: vk::Semaphore, image_index: u32) -> VkResult<bool> {
        let wait_semaphores = [wait_semaphore];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.swapchain_loader.queue_present(queue, &present_info) }
    }

    /// Image dimensions
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Image format and colour space
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// One view per swapchain image
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Raw swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Number of images actually created
    pub fn image_count(&self) -> u32 {
        u32::try_from(self.images.len()).unwrap_or(u32::MAX)
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capabilities(current: (u32, u32), min_images: u32, max_images: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min_images,
            max_image_count: max_images,
            current_extent: vk::Extent2D { width: current.0, height: current.1 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 2048 },
            ..Default::default()
        }
    }

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    #[test]
    fn test_prefers_srgb_bgra() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        assert_eq!(choose_surface_format(&formats).map(|f| f.format), Some(vk::Format::B8G8R8A8_SRGB));
    }

    #[test]
    fn test_falls_back_to_first_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
        ];
        assert_eq!(choose_surface_format(&formats).map(|f| f.format), Some(vk::Format::R8G8B8A8_UNORM));
        assert!(choose_surface_format(&[]).is_none());
    }

    #[test]
    fn test_present_mode_preference() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_follows_surface_when_defined() {
        let caps = capabilities((1280, 720), 2, 0);
        assert_eq!(choose_extent(&caps, Extent::new(800, 600)), vk::Extent2D { width: 1280, height: 720 });
    }

    #[test]
    fn test_extent_clamped_when_surface_undefined() {
        let caps = capabilities((u32::MAX, u32::MAX), 2, 0);
        assert_eq!(choose_extent(&caps, Extent::new(800, 600)), vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_extent(&caps, Extent::new(8000, 0)), vk::Extent2D { width: 4096, height: 1 });
    }

    #[test]
    fn test_image_count_bounds() {
        assert_eq!(choose_image_count(&capabilities((1, 1), 2, 0)), 3);
        assert_eq!(choose_image_count(&capabilities((1, 1), 2, 8)), 3);
        assert_eq!(choose_image_count(&capabilities((1, 1), 3, 3)), 3);
    }
}
