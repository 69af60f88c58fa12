//! # Unified Configuration System
//!
//! Window size, validation layers, frames in flight and shader locations live
//! here and are handed to the window, backend and scheduler at construction.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging
//! - **Window Config**: title, size, resizability
//! - **Renderer Config**: Vulkan instance metadata, validation, frame pacing, geometry, shaders

use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::config::{Config, ConfigError};

/// Largest accepted frames-in-flight ring
pub const MAX_FRAMES_IN_FLIGHT_LIMIT: usize = 8;

/// # Shader Configuration
///
/// Paths to the precompiled SPIR-V modules used by the triangle pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Create a new shader configuration
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// Tries the usual shader directories so the binary can be started from
    /// the workspace root or from its own directory.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let shader_dirs = ["shaders/", "target/shaders/", "../shaders/", "./"];

        let find = |file: &str| {
            shader_dirs
                .iter()
                .map(|dir| format!("{dir}{file}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("shaders/{file}"))
        };

        Self {
            vertex_shader_path: find(base_vertex),
            fragment_shader_path: find(base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), String> {
        if !Path::new(&self.vertex_shader_path).exists() {
            return Err(format!("Vertex shader not found: {}", self.vertex_shader_path));
        }
        if !Path::new(&self.fragment_shader_path).exists() {
            return Err(format!("Fragment shader not found: {}", self.fragment_shader_path));
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("vert.spv", "frag.spv")
    }
}

/// Built-in geometry drawn every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshKind {
    /// Single RGB triangle
    #[default]
    Triangle,
    /// Indexed two-triangle quad
    Quad,
}

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl WindowConfig {
    /// Create a window configuration
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            resizable: true,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("Window size must be non-zero, got {}x{}", self.width, self.height));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Hello Triangle", 800, 600)
    }
}

/// # Renderer Configuration
///
/// Configuration for the Vulkan backend and the frame scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Number of frame slots in the in-flight ring
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers (`None` = debug builds only)
    pub enable_validation: Option<bool>,
    /// Instance layers requested when validation is enabled
    pub validation_layers: Vec<String>,
    /// Upper bound on fence waits and image acquisition (`None` = wait forever)
    pub frame_timeout_ms: Option<u64>,
    /// Background clear color [R, G, B, A] (0.0-1.0 range)
    pub clear_color: [f32; 4],
    /// Geometry to draw
    pub mesh: MeshKind,
    /// Shader configuration
    pub shaders: ShaderConfig,
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            max_frames_in_flight: 2,
            enable_validation: None,
            validation_layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            frame_timeout_ms: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            mesh: MeshKind::Triangle,
            shaders: ShaderConfig::default(),
        }
    }

    /// Set custom shader configuration
    #[must_use]
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set maximum frames in flight
    #[must_use]
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Bound every frame wait by `timeout_ms`
    #[must_use]
    pub fn with_frame_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.frame_timeout_ms = Some(timeout_ms);
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Frame timeout as a [`std::time::Duration`]
    pub fn frame_timeout(&self) -> Option<std::time::Duration> {
        self.frame_timeout_ms.map(std::time::Duration::from_millis)
    }

    /// Validate the configuration
    ///
    /// Shader files are checked by `VulkanBackend::new` through
    /// [`ShaderConfig::validate`], so a config can be validated on a machine
    /// without compiled shaders.
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if self.max_frames_in_flight == 0 {
            return Err("Max frames in flight must be at least 1".to_string());
        }

        if self.max_frames_in_flight > MAX_FRAMES_IN_FLIGHT_LIMIT {
            return Err(format!(
                "Max frames in flight should not exceed {MAX_FRAMES_IN_FLIGHT_LIMIT}, got {}",
                self.max_frames_in_flight
            ));
        }

        if self.frame_timeout_ms == Some(0) {
            return Err("Frame timeout must be positive when set".to_string());
        }

        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(format!("Clear color components must be in 0.0-1.0, got {:?}", self.clear_color));
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Hello Triangle")
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration loaded by the application binary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Window configuration
    pub window: WindowConfig,
    /// Rendering system configuration
    pub renderer: RendererConfig,
}

impl ApplicationConfig {
    /// Create a new application configuration with defaults
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            engine: EngineConfig::default(),
            window: WindowConfig::new(app_name.clone(), 800, 600),
            renderer: RendererConfig::new(app_name),
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window.validate().map_err(ConfigError::Invalid)?;
        self.renderer.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_default_configuration() {
        let config = ApplicationConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.renderer.max_frames_in_flight, 2);
        assert_eq!(config.renderer.validation_layers, vec!["VK_LAYER_KHRONOS_validation".to_string()]);
        assert_eq!(config.renderer.frame_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_frames_in_flight_rejected() {
        let config = RendererConfig::default().with_max_frames_in_flight(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_too_many_frames_in_flight_rejected() {
        let config = RendererConfig::default().with_max_frames_in_flight(MAX_FRAMES_IN_FLIGHT_LIMIT + 1);
        assert!(config.validate().is_err());
        let config = RendererConfig::default().with_max_frames_in_flight(MAX_FRAMES_IN_FLIGHT_LIMIT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = ApplicationConfig::default();
        config.window.height = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_explicit_validation_overrides_build_default() {
        assert!(RendererConfig::default().with_validation(true).validation_enabled());
        assert!(!RendererConfig::default().with_validation(false).validation_enabled());
    }

    #[test]
    fn test_frame_timeout_conversion() {
        let config = RendererConfig::default().with_frame_timeout_ms(250);
        assert_eq!(config.frame_timeout(), Some(std::time::Duration::from_millis(250)));
        assert!(RendererConfig::default().with_frame_timeout_ms(0).validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
            [window]
            title = "Resized"
            width = 1024
            height = 768
            resizable = false

            [renderer]
            max_frames_in_flight = 3
            mesh = "quad"
        "#;
        let config = ApplicationConfig::from_str_with_format(text, ConfigFormat::Toml).unwrap();
        assert_eq!(config.window.width, 1024);
        assert!(!config.window.resizable);
        assert_eq!(config.renderer.max_frames_in_flight, 3);
        assert_eq!(config.renderer.mesh, MeshKind::Quad);
        assert_eq!(config.renderer.application_name, "Hello Triangle");
        assert_eq!(config.engine.log_level, "info");
    }

    #[test]
    fn test_toml_file_round_trip() {
        let path = std::env::temp_dir().join(format!("triangle_engine_config_{}.toml", std::process::id()));
        let config = ApplicationConfig::new("Round Trip");
        config.save_to_file(&path).unwrap();
        let loaded = ApplicationConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let path = std::env::temp_dir().join("triangle_engine_definitely_missing.toml");
        let config = ApplicationConfig::load_or_default(&path).unwrap();
        assert_eq!(config, ApplicationConfig::default());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("triangle_engine_definitely_missing.toml");
        assert!(matches!(ApplicationConfig::load_from_file(&path), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_shader_validation_reports_missing_files() {
        let missing = ShaderConfig::new("no/such/vert.spv", "no/such/frag.spv");
        let error = missing.validate().unwrap_err();
        assert!(error.contains("no/such/vert.spv"), "{error}");

        let dir = std::env::temp_dir();
        let vertex = dir.join(format!("triangle_engine_vert_{}.spv", std::process::id()));
        std::fs::write(&vertex, [0u8; 4]).unwrap();
        let half = ShaderConfig::new(vertex.display().to_string(), "no/such/frag.spv");
        let error = half.validate().unwrap_err();
        std::fs::remove_file(&vertex).ok();
        assert!(error.contains("Fragment shader"), "{error}");
    }
}
