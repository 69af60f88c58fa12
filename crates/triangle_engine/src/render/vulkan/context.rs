//! Vulkan context management and initialization
//!
//! Owns the instance (with its optional debug messenger), the window surface,
//! the selected physical device and the logical device with its queues.
//! Each is an RAII wrapper, so a failure halfway through `VulkanContext::new`
//! releases whatever was already created.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use std::ffi::{CStr, CString};
use thiserror::Error;

use crate::core::config::RendererConfig;
use crate::render::backend::BackendError;
use crate::render::window::{Window, WindowError};

/// Vulkan-specific errors
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Invalid operation attempted
    #[error("Invalid operation: {reason}")]
    InvalidOperation {
        /// Description of why the operation is invalid
        reason: String,
    },

    /// Vulkan context initialization failed
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// No suitable memory type found for allocation
    #[error("No suitable memory type found")]
    NoSuitableMemoryType,
}

/// Result type for Vulkan operations
pub type VulkanResult<T> = Result<T, VulkanError>;

impl From<WindowError> for VulkanError {
    fn from(error: WindowError) -> Self {
        Self::InitializationFailed(error.to_string())
    }
}

impl From<VulkanError> for BackendError {
    fn from(error: VulkanError) -> Self {
        match error {
            VulkanError::Api(
                code @ (vk::Result::ERROR_OUT_OF_HOST_MEMORY
                | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
                | vk::Result::ERROR_OUT_OF_POOL_MEMORY),
            ) => Self::ResourceExhausted(format!("{code:?}")),
            VulkanError::NoSuitableMemoryType => Self::ResourceExhausted(error.to_string()),
            VulkanError::InitializationFailed(reason) => Self::InitializationFailed(reason),
            VulkanError::Api(_) | VulkanError::InvalidOperation { .. } => Self::Device(error.to_string()),
        }
    }
}

fn c_string(value: &str) -> VulkanResult<CString> {
    CString::new(value).map_err(|e| VulkanError::InitializationFailed(format!("Invalid name {value:?}: {e}")))
}

/// Vulkan instance wrapper with optional validation
pub struct VulkanInstance {
    /// Vulkan entry point
    pub entry: Entry,
    /// Vulkan instance handle
    pub instance: Instance,
    debug_utils: Option<(DebugUtils, vk::DebugUtilsMessengerEXT)>,
}

impl VulkanInstance {
    /// Create a Vulkan instance with the extensions GLFW needs
    ///
    /// With validation enabled every configured layer must be installed and
    /// validation messages are forwarded to the `log` crate.
    pub fn new(window: &Window, config: &RendererConfig) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|e| VulkanError::InitializationFailed(format!("Failed to load Vulkan: {e:?}")))?;

        let enable_validation = config.validation_enabled();
        if enable_validation {
            Self::check_validation_layers(&entry, &config.validation_layers)?;
        }

        let app_name = c_string(&config.application_name)?;
        let engine_name = c_string("Triangle Engine")?;
        let (major, minor, patch) = config.application_version;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, major, minor, patch))
            .engine_name(&engine_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_0);

        let extension_names = window
            .required_instance_extensions()?
            .iter()
            .map(|ext| c_string(ext))
            .collect::<VulkanResult<Vec<_>>>()?;
        let mut extensions: Vec<*const std::os::raw::c_char> =
            extension_names.iter().map(|ext| ext.as_ptr()).collect();
        if enable_validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layer_names = if enable_validation {
            config
                .validation_layers
                .iter()
                .map(|layer| c_string(layer))
                .collect::<VulkanResult<Vec<_>>>()?
        } else {
            Vec::new()
        };
        let layers: Vec<*const std::os::raw::c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe {
            entry.create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let debug_utils = if enable_validation {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => Some((debug_utils, messenger)),
                Err(error) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(error);
                }
            }
        } else {
            None
        };

        log::info!(
            "Created Vulkan instance for \"{}\" (validation {})",
            config.application_name,
            if enable_validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            debug_utils,
        })
    }

    fn check_validation_layers(entry: &Entry, requested: &[String]) -> VulkanResult<()> {
        let available = unsafe {
            entry.enumerate_instance_layer_properties()
                .map_err(VulkanError::Api)?
        };

        let available_names: Vec<String> = available
            .iter()
            .map(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) }.to_string_lossy().into_owned())
            .collect();

        match missing_layers(requested, &available_names).first() {
            Some(missing) => Err(VulkanError::InitializationFailed(format!(
                "Validation layer {missing} requested, but not available"
            ))),
            None => Ok(()),
        }
    }

    fn setup_debug_messenger(debug_utils: &DebugUtils) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils.create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some((debug_utils, messenger)) = &self.debug_utils {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Requested layers missing from `available`, in request order
fn missing_layers<'a>(requested: &'a [String], available: &[String]) -> Vec<&'a str> {
    requested
        .iter()
        .filter(|layer| !available.contains(layer))
        .map(String::as_str)
        .collect()
}

/// Debug callback routing validation output to the log
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let callback_data = *callback_data;
    let message = CStr::from_ptr(callback_data.p_message).to_string_lossy();

    if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::ERROR {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity >= vk::DebugUtilsMessageSeverityFlagsEXT::WARNING {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Graphics and present queue family indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    /// Family used for rendering
    pub graphics: u32,
    /// Family used for presentation
    pub present: u32,
}

impl QueueFamilies {
    /// Pick the first graphics family and the first family that can present
    pub fn find(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> VulkanResult<bool>,
    ) -> VulkanResult<Option<Self>> {
        let mut graphics = None;
        let mut present = None;

        for (index, family) in (0u32..).zip(families) {
            if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics = Some(index);
            }
            if present.is_none() && supports_present(index)? {
                present = Some(index);
            }
            if let (Some(graphics), Some(present)) = (graphics, present) {
                return Ok(Some(Self { graphics, present }));
            }
        }

        Ok(None)
    }

    /// Families the swapchain images are shared between
    pub fn unique(&self) -> Vec<u32> {
        if self.graphics == self.present {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Physical device information and capabilities
pub struct PhysicalDeviceInfo {
    /// Vulkan physical device handle
    pub device: vk::PhysicalDevice,
    /// Device properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Memory heaps and types
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    /// Queue families used for rendering and presentation
    pub queue_families: QueueFamilies,
}

impl PhysicalDeviceInfo {
    /// Select the first device that can render to `surface`
    pub fn select_suitable_device(
        instance: &Instance,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Self> {
        let devices = unsafe {
            instance.enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        for device in devices {
            if let Some(device_info) = Self::evaluate_device(instance, device, surface, surface_loader)? {
                log::info!("Selected GPU: {}", device_info.name());
                return Ok(device_info);
            }
        }

        Err(VulkanError::InitializationFailed("No suitable GPU found".to_string()))
    }

    fn evaluate_device(
        instance: &Instance,
        device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
    ) -> VulkanResult<Option<Self>> {
        let queue_family_properties = unsafe { instance.get_physical_device_queue_family_properties(device) };
        let Some(queue_families) = QueueFamilies::find(&queue_family_properties, |index| unsafe {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .map_err(VulkanError::Api)
        })?
        else {
            return Ok(None);
        };

        let extensions = unsafe {
            instance.enumerate_device_extension_properties(device)
                .map_err(VulkanError::Api)?
        };
        let has_swapchain = extensions.iter().any(|available| {
            (unsafe { CStr::from_ptr(available.extension_name.as_ptr()) }) == SwapchainLoader::name()
        });
        if !has_swapchain {
            return Ok(None);
        }

        let (formats, present_modes) = unsafe {
            (
                surface_loader
                    .get_physical_device_surface_formats(device, surface)
                    .map_err(VulkanError::Api)?,
                surface_loader
                    .get_physical_device_surface_present_modes(device, surface)
                    .map_err(VulkanError::Api)?,
            )
        };
        if formats.is_empty() || present_modes.is_empty() {
            return Ok(None);
        }

        let (properties, memory_properties) = unsafe {
            (
                instance.get_physical_device_properties(device),
                instance.get_physical_device_memory_properties(device),
            )
        };

        Ok(Some(Self {
            device,
            properties,
            memory_properties,
            queue_families,
        }))
    }

    /// Human-readable device name
    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }
}

/// Logical device wrapper with queue management
pub struct LogicalDevice {
    /// Vulkan logical device handle
    pub device: Device,
    /// Graphics operations queue
    pub graphics_queue: vk::Queue,
    /// Surface presentation queue
    pub present_queue: vk::Queue,
    /// Swapchain extension loader
    pub swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create a new logical device with required queues
    pub fn new(instance: &Instance, physical_device_info: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let families = physical_device_info.queue_families;
        let priorities = [1.0];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = families
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let required_extensions = [SwapchainLoader::name().as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe {
            instance.create_device(physical_device_info.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let (graphics_queue, present_queue) = unsafe {
            (
                device.get_device_queue(families.graphics, 0),
                device.get_device_queue(families.present, 0),
            )
        };

        let swapchain_loader = SwapchainLoader::new(instance, &device);

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            swapchain_loader,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(error) = self.device.device_wait_idle() {
                log::warn!("Device did not go idle before destruction: {error:?}");
            }
            self.device.destroy_device(None);
        }
    }
}

/// Window surface with its extension loader
pub struct WindowSurface {
    surface_loader: Surface,
    surface: vk::SurfaceKHR,
}

impl WindowSurface {
    /// Create the surface for `window` on `instance`
    pub fn new(instance: &VulkanInstance, window: &mut Window) -> VulkanResult<Self> {
        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window.create_vulkan_surface(instance.instance.handle())?;
        Ok(Self {
            surface_loader,
            surface,
        })
    }

    /// Get the underlying surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Get the surface loader
    pub fn loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// Current capabilities, formats and present modes for `physical_device`
    pub fn support(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> VulkanResult<(vk::SurfaceCapabilitiesKHR, Vec<vk::SurfaceFormatKHR>, Vec<vk::PresentModeKHR>)> {
        unsafe {
            Ok((
                self.surface_loader
                    .get_physical_device_surface_capabilities(physical_device, self.surface)
                    .map_err(VulkanError::Api)?,
                self.surface_loader
                    .get_physical_device_surface_formats(physical_device, self.surface)
                    .map_err(VulkanError::Api)?,
                self.surface_loader
                    .get_physical_device_surface_present_modes(physical_device, self.surface)
                    .map_err(VulkanError::Api)?,
            ))
        }
    }
}

impl Drop for WindowSurface {
    fn drop(&mut self) {
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

/// Main Vulkan context that owns all core Vulkan resources
///
/// Field order is teardown order: device, then surface, then instance.
pub struct VulkanContext {
    /// Selected physical device information
    pub physical_device: PhysicalDeviceInfo,
    /// Logical device for operations
    pub device: LogicalDevice,
    /// Vulkan surface for rendering
    pub surface: WindowSurface,
    /// Vulkan instance and debug utilities
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Create instance, surface and device for `window`
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, config)?;
        let surface = WindowSurface::new(&instance, window)?;

        let physical_device = PhysicalDeviceInfo::select_suitable_device(
            &instance.instance,
            surface.handle(),
            surface.loader(),
        )?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        Ok(Self {
            physical_device,
            device,
            surface,
            instance,
        })
    }

    /// Get the raw Device handle
    pub fn raw_device(&self) -> Device {
        self.device.device.clone()
    }

    /// Get the Vulkan instance
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// Queue families used by the device
    pub fn queue_families(&self) -> QueueFamilies {
        self.physical_device.queue_families
    }

    /// Get the graphics queue
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// Get the present queue
    pub fn present_queue(&self) -> vk::Queue {
        self.device.present_queue
    }

    /// Block until the device has finished all submitted work
    pub fn wait_idle(&self) -> VulkanResult<()> {
        unsafe {
            self.device.device.device_wait_idle()
                .map_err(VulkanError::Api)
        }
    }
}
