//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system with the `info` default filter
pub fn init() {
    init_with_level("info");
}

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level`. Calling this twice is harmless;
/// the second logger is ignored.
pub fn init_with_level(level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .try_init();

    if result.is_err() {
        debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_with_level("debug");
        init();
    }
}
