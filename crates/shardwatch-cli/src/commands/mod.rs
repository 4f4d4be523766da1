pub mod probe;
pub mod replay;

use std::path::Path;

use shardwatch_health::HealthCheckConfig;
use tracing::debug;

/// Load the configuration file if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<HealthCheckConfig> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading health check config");
            Ok(HealthCheckConfig::from_file(path)?)
        }
        None => Ok(HealthCheckConfig::default()),
    }
}
