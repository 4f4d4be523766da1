//! Adaptive health check that upgrades itself to HTTP checking.
//!
//! Starts out status-only. The first snapshot that carries a health port,
//! from any shard, switches the whole checker to status followed by HTTP.
//! The switch is one-way.
//!
//! Assumes either every shard of the job exposes a health port or none do.
//! A shard without one after the switch is handled by the configured
//! [`MissingPortPolicy`].

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::check::{BoxFuture, ChainedHealthCheck, HealthCheck};
use crate::config::{HealthCheckConfig, MissingPortPolicy};
use crate::error::HealthResult;
use crate::http_check::HttpHealthCheck;
use crate::probe::{ProberFactory, http_prober_factory};
use crate::status::StatusHealthCheck;
use crate::types::{HealthVerdict, ScheduledTask};

/// Which checks the adaptive checker currently runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    StatusOnly,
    StatusAndHttp,
}

struct AdaptiveState {
    mode: CheckMode,
    delegate: Arc<dyn HealthCheck>,
}

pub struct AdaptiveHealthCheck {
    /// Shared by both modes so the identity table survives the upgrade.
    status: Arc<StatusHealthCheck>,
    prober_factory: ProberFactory,
    missing_port: MissingPortPolicy,
    state: Mutex<AdaptiveState>,
}

impl AdaptiveHealthCheck {
    pub fn new(prober_factory: ProberFactory) -> Self {
        let status = Arc::new(StatusHealthCheck::new());
        Self {
            status: status.clone(),
            prober_factory,
            missing_port: MissingPortPolicy::default(),
            state: Mutex::new(AdaptiveState {
                mode: CheckMode::StatusOnly,
                delegate: status,
            }),
        }
    }

    /// Build a checker whose HTTP stage uses [`crate::HttpProber`]s.
    pub fn from_config(config: &HealthCheckConfig) -> HealthResult<Self> {
        let factory = http_prober_factory(&config.probe)?;
        Ok(Self::new(factory).with_missing_port_policy(config.probe.missing_health_port))
    }

    pub fn with_missing_port_policy(mut self, policy: MissingPortPolicy) -> Self {
        self.missing_port = policy;
        self
    }

    pub fn mode(&self) -> CheckMode {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).mode
    }

    /// The underlying status checker.
    pub fn status(&self) -> &StatusHealthCheck {
        &self.status
    }

    /// Upgrade if `task` reveals a health port, then return the delegate
    /// to run. The delegate runs outside the lock.
    fn delegate_for(&self, task: &ScheduledTask) -> Arc<dyn HealthCheck> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.mode == CheckMode::StatusOnly && task.health_port().is_some() {
            debug!(shard_id = task.shard_id, "health port detected, enabling HTTP checks");
            let http: Arc<dyn HealthCheck> = Arc::new(
                HttpHealthCheck::new(self.prober_factory.clone())
                    .with_missing_port_policy(self.missing_port),
            );
            let status: Arc<dyn HealthCheck> = self.status.clone();
            state.delegate = Arc::new(ChainedHealthCheck::new(vec![status, http]));
            state.mode = CheckMode::StatusAndHttp;
        }
        state.delegate.clone()
    }
}

impl HealthCheck for AdaptiveHealthCheck {
    fn health<'a>(
        &'a self,
        task: &'a ScheduledTask,
    ) -> BoxFuture<'a, HealthResult<HealthVerdict>> {
        let delegate = self.delegate_for(task);
        Box::pin(async move { delegate.health(task).await })
    }
}
