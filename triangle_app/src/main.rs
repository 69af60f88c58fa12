//! Hello Triangle
//!
//! Opens a window and draws a vertex-coloured triangle through the frame
//! scheduler until the window is closed or Escape is pressed.
//!
//! Usage: `hello_triangle [config.toml|config.ron]`
//!
//! Without an argument `hello_triangle.toml` is used when present, otherwise
//! the built-in defaults. A path given on the command line must exist.

use std::error::Error;
use std::path::PathBuf;

use triangle_engine::foundation::logging;
use triangle_engine::prelude::*;

const DEFAULT_CONFIG_PATH: &str = "hello_triangle.toml";

fn load_config(explicit_path: Option<PathBuf>) -> Result<ApplicationConfig, Box<dyn Error>> {
    // Only the implicit default file may be absent.
    let config = match explicit_path {
        Some(path) => ApplicationConfig::load_from_file(path)?,
        None => ApplicationConfig::load_or_default(DEFAULT_CONFIG_PATH)?,
    };
    config.validate()?;
    Ok(config)
}

fn run(config: &ApplicationConfig) -> Result<FrameStats, Box<dyn Error>> {
    // The window outlives the backend: its Vulkan surface is destroyed with the backend.
    let mut window = Window::new(&config.window)?;
    let backend = VulkanBackend::new(&mut window, &config.renderer)?;

    let mut scheduler = FrameScheduler::new(backend, &config.renderer)?;
    let stats = scheduler.run(&mut window)?;
    drop(scheduler.shutdown()?);

    Ok(stats)
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = match load_config(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(config) => config,
        Err(e) => {
            logging::init();
            log::error!("Configuration error: {e}");
            return Err(e);
        }
    };
    logging::init_with_level(&config.engine.log_level);

    log::info!("Starting {}", config.window.title);

    match run(&config) {
        Ok(stats) => {
            log::info!(
                "Hello Triangle finished: {} frames presented, {} swapchain rebuilds, {} out-of-date acquires",
                stats.frames_presented,
                stats.swapchain_rebuilds,
                stats.out_of_date_acquires
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Application error: {e}");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let path = std::env::temp_dir().join("hello_triangle_no_such_config.toml");
        let error = load_config(Some(path)).unwrap_err();
        assert!(matches!(error.downcast_ref::<ConfigError>(), Some(ConfigError::Io(_))), "{error}");
    }

    #[test]
    fn test_explicit_config_is_loaded_and_validated() {
        let path = std::env::temp_dir().join(format!("hello_triangle_frames_{}.toml", std::process::id()));
        std::fs::write(&path, "[renderer]\nmax_frames_in_flight = 0\n").unwrap();
        let result = load_config(Some(path.clone()));
        std::fs::remove_file(&path).ok();
        let error = result.unwrap_err();
        assert!(matches!(error.downcast_ref::<ConfigError>(), Some(ConfigError::Invalid(_))), "{error}");
    }
}
