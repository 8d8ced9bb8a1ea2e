/// Startup configuration for Lumora.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Log filter used when `RUST_LOG` is unset. `None` uses
    /// [`crate::logging::DEFAULT_FILTER`].
    pub log_filter: Option<String>,
    pub profiling: ProfilingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingMode {
    /// Profiling scopes are compiled in but not recorded.
    #[default]
    Off,
    /// Scopes are recorded for in-process inspection.
    On,
    /// Scopes are recorded and served to `puffin_viewer` over HTTP.
    WithWebServer,
}

impl Config {
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    pub fn with_profiling(mut self, mode: ProfilingMode) -> Self {
        self.profiling = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.log_filter.is_none());
        assert_eq!(config.profiling, ProfilingMode::Off);
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .with_log_filter("info")
            .with_profiling(ProfilingMode::On);
        assert_eq!(config.log_filter.as_deref(), Some("info"));
        assert_eq!(config.profiling, ProfilingMode::On);
    }
}
