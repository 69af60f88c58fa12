//! GLFW window management for Vulkan rendering
//!
//! The window is created without a client API so Vulkan owns presentation.
//! It also creates the `VkSurfaceKHR` the backend renders into.

use ash::vk;
use thiserror::Error;

use crate::core::config::WindowConfig;
use crate::render::backend::Extent;
use crate::render::surface::PresentationSurface;

/// Window creation and surface errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialised
    #[error("GLFW initialization failed: {0}")]
    InitializationFailed(String),

    /// GLFW refused to create the window
    #[error("Window creation failed")]
    CreationFailed,

    /// Any other GLFW failure
    #[error("GLFW error: {0}")]
    GlfwError(String),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window with its event queue
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    resized: bool,
}

impl Window {
    /// Open a window as described by `config`
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(glfw::fail_on_errors)
            .map_err(|e| WindowError::InitializationFailed(format!("{e:?}")))?;

        if !glfw.vulkan_supported() {
            return Err(WindowError::InitializationFailed("Vulkan loader not found".to_string()));
        }

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);

        log::info!("Created {}x{} window \"{}\"", config.width, config.height, config.title);

        Ok(Self {
            glfw,
            window,
            events,
            resized: false,
        })
    }

    /// Instance extensions GLFW needs to create a surface
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::GlfwError("Failed to get required extensions".to_string()))
    }

    /// Create the Vulkan surface for this window
    pub fn create_vulkan_surface(&mut self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::GlfwError(format!("Failed to create Vulkan surface: {result:?}")))
        }
    }

    /// Ask the frame loop to stop
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    fn handle_events(&mut self) {
        for (_, event) in glfw::flush_messages(&self.events) {
            match event {
                glfw::WindowEvent::FramebufferSize(width, height) => {
                    log::debug!("Framebuffer resized to {width}x{height}");
                    self.resized = true;
                }
                glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _)
                | glfw::WindowEvent::Close => {
                    self.window.set_should_close(true);
                }
                _ => {}
            }
        }
    }
}

impl PresentationSurface for Window {
    fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn poll_events(&mut self) {
        self.glfw.poll_events();
        self.handle_events();
    }

    fn wait_events(&mut self) {
        self.glfw.wait_events();
        self.handle_events();
    }

    fn framebuffer_extent(&self) -> Extent {
        let (width, height) = self.window.get_framebuffer_size();
        Extent::new(u32::try_from(width).unwrap_or(0), u32::try_from(height).unwrap_or(0))
    }

    fn take_resize(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }
}
