//! Health check configuration, loadable from TOML.
//!
//! ```toml
//! [probe]
//! endpoint = "/health"
//! timeout = "2s"
//! expected_response = "ok"
//! missing_health_port = "reject"
//! ```
//!
//! Every field is optional; omitted fields take the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HealthError, HealthResult};

/// What the HTTP checker does with a task that has no health port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPortPolicy {
    /// Fail the call with [`HealthError::MissingHealthPort`].
    #[default]
    Reject,
    /// Treat the HTTP check as not applicable and report alive for that call.
    SkipHttp,
}

/// HTTP probe parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// HTTP path to probe.
    pub endpoint: String,
    /// Timeout per probe (e.g., "2s", "500ms").
    pub timeout: String,
    /// Body the endpoint must answer with. `None` accepts any 2xx.
    pub expected_response: Option<String>,
    pub missing_health_port: MissingPortPolicy,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoint: "/health".to_string(),
            timeout: "2s".to_string(),
            expected_response: Some("ok".to_string()),
            missing_health_port: MissingPortPolicy::Reject,
        }
    }
}

impl ProbeConfig {
    /// Parsed probe timeout.
    pub fn timeout(&self) -> HealthResult<Duration> {
        parse_duration(&self.timeout).ok_or_else(|| {
            HealthError::Config(format!("invalid probe timeout: {:?}", self.timeout))
        })
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub probe: ProbeConfig,
}

impl HealthCheckConfig {
    pub fn from_file(path: &Path) -> HealthResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> HealthResult<Self> {
        let config: HealthCheckConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HealthResult<()> {
        self.probe.timeout()?;
        if !self.probe.endpoint.starts_with('/') {
            return Err(HealthError::Config(format!(
                "probe endpoint must start with '/': {:?}",
                self.probe.endpoint
            )));
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
