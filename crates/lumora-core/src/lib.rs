//! Lumora Core
//!
//! Shared plumbing for the Lumora renderer crates: logging setup, puffin
//! profiling hooks, engine configuration and the service registry that owns
//! long-lived subsystems.

pub mod config;
pub mod logging;
pub mod math;
pub mod profiling;
pub mod registry;

pub use config::{Config, ProfilingMode};
pub use registry::{RegistryError, ServiceRegistry};

/// Initialize logging and profiling from a [`Config`].
///
/// Call once at startup, before any renderer is created.
pub fn init(config: &Config) {
    logging::init_with_filter(config.log_filter.as_deref());

    #[cfg(feature = "profiling")]
    if config.profiling == ProfilingMode::WithWebServer {
        profiling::init_profiling(profiling::ProfilingBackend::PuffinHttp);
    }
    #[cfg(feature = "profiling")]
    if config.profiling == ProfilingMode::On {
        profiling::enable_scopes();
    }
}
