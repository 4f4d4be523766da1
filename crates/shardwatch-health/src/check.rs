//! The health check capability and its sequential composition.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::HealthResult;
use crate::types::{HealthVerdict, ScheduledTask};

/// Boxed `Send` future returned by the object-safe async traits in this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Judges the health of one task snapshot.
///
/// Implementations keep per-shard state behind their own locks, so a single
/// checker can be shared across concurrent evaluations of different shards.
/// Calls for the same shard must be serialized by the caller.
pub trait HealthCheck: Send + Sync {
    /// Evaluate `task`. `Err` is reserved for contract violations; an
    /// unhealthy task is an `Ok` verdict.
    fn health<'a>(&'a self, task: &'a ScheduledTask)
        -> BoxFuture<'a, HealthResult<HealthVerdict>>;
}

/// Runs checkers in order and stops at the first unhealthy verdict.
///
/// Put cheap local checks first so a task that is not running never costs
/// a network probe.
pub struct ChainedHealthCheck {
    checkers: Vec<Arc<dyn HealthCheck>>,
}

impl ChainedHealthCheck {
    pub fn new(checkers: Vec<Arc<dyn HealthCheck>>) -> Self {
        Self { checkers }
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    async fn run(&self, task: &ScheduledTask) -> HealthResult<HealthVerdict> {
        for checker in &self.checkers {
            let verdict = checker.health(task).await?;
            if !verdict.healthy {
                return Ok(verdict);
            }
        }
        Ok(HealthVerdict::alive())
    }
}

impl HealthCheck for ChainedHealthCheck {
    fn health<'a>(
        &'a self,
        task: &'a ScheduledTask,
    ) -> BoxFuture<'a, HealthResult<HealthVerdict>> {
        Box::pin(self.run(task))
    }
}
