//! Build mode resolution.
//!
//! The mode is read once from `NODE_ENV` at process start and then passed
//! explicitly to every task through the build context.

use std::fmt;

/// Environment variable selecting the build mode.
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Build-time switch between debuggable and optimized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Unminified CSS with inline source maps and live-reload notifications
    Development,
    /// Minified CSS, no source maps, no notifications
    #[default]
    Production,
}

impl Mode {
    /// Resolve the mode from a raw environment value.
    ///
    /// Only the exact literal `"development"` selects development mode.
    /// Absent or unrecognised values fall back to production.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some("development") => Mode::Development,
            _ => Mode::Production,
        }
    }

    /// Whether this is a development build.
    pub fn is_development(self) -> bool {
        self == Mode::Development
    }

    /// Whether this is a production build.
    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    /// Emit inline source maps alongside compiled styles.
    pub fn source_maps(self) -> bool {
        self.is_development()
    }

    /// Minify compiled styles.
    pub fn minify(self) -> bool {
        self.is_production()
    }

    /// Publish changed outputs to the live-reload sink.
    pub fn live_reload(self) -> bool {
        self.is_development()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => write!(f, "development"),
            Mode::Production => write!(f, "production"),
        }
    }
}

/// Read `NODE_ENV` and resolve the build mode. Never fails.
pub fn resolve_mode() -> Mode {
    let value = std::env::var(MODE_ENV_VAR).ok();
    Mode::from_env_value(value.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_from_env_value_development() {
        assert_eq!(Mode::from_env_value(Some("development")), Mode::Development);
    }

    #[test]
    fn test_from_env_value_defaults_to_production() {
        assert_eq!(Mode::from_env_value(None), Mode::Production);
        assert_eq!(Mode::from_env_value(Some("")), Mode::Production);
        assert_eq!(Mode::from_env_value(Some("production")), Mode::Production);
        assert_eq!(Mode::from_env_value(Some("Development")), Mode::Production);
        assert_eq!(Mode::from_env_value(Some("development ")), Mode::Production);
        assert_eq!(Mode::from_env_value(Some("dev")), Mode::Production);
    }

    #[test]
    fn test_mode_switches() {
        let dev = Mode::Development;
        assert!(dev.source_maps());
        assert!(!dev.minify());
        assert!(dev.live_reload());

        let prod = Mode::Production;
        assert!(!prod.source_maps());
        assert!(prod.minify());
        assert!(!prod.live_reload());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Development.to_string(), "development");
        assert_eq!(Mode::Production.to_string(), "production");
    }

    #[test]
    #[serial]
    fn test_resolve_mode_reads_environment() {
        let previous = std::env::var(MODE_ENV_VAR).ok();

        std::env::set_var(MODE_ENV_VAR, "development");
        assert_eq!(resolve_mode(), Mode::Development);

        std::env::set_var(MODE_ENV_VAR, "staging");
        assert_eq!(resolve_mode(), Mode::Production);

        std::env::remove_var(MODE_ENV_VAR);
        assert_eq!(resolve_mode(), Mode::Production);

        if let Some(value) = previous {
            std::env::set_var(MODE_ENV_VAR, value);
        }
    }
}
