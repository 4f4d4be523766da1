//! Status-based health check.
//!
//! A task is healthy iff it is RUNNING and, if its shard has been seen
//! running before, it is still the same task. A different task on a known
//! shard is an identity change the scheduler should not have produced, so
//! it is reported as fatal.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use crate::check::{BoxFuture, HealthCheck};
use crate::error::HealthResult;
use crate::types::{HealthVerdict, ScheduledTask, ShardId, TaskId};

#[derive(Debug, Default)]
pub struct StatusHealthCheck {
    /// shard → task last observed RUNNING there. Never pruned.
    task_ids: Mutex<HashMap<ShardId, TaskId>>,
}

impl StatusHealthCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Judge `task` and update the identity table in one critical section.
    pub fn check(&self, task: &ScheduledTask) -> HealthVerdict {
        if !task.is_running() {
            return HealthVerdict::dead_retriable();
        }

        let mut task_ids = self.task_ids.lock().unwrap_or_else(PoisonError::into_inner);
        match task_ids.get(&task.shard_id) {
            Some(known) if *known == task.task_id => HealthVerdict::alive(),
            Some(known) => {
                warn!(
                    shard_id = task.shard_id,
                    known_task = %known,
                    task_id = %task.task_id,
                    "shard is running an unexpected task"
                );
                HealthVerdict::dead_fatal()
            }
            None => {
                info!(shard_id = task.shard_id, task_id = %task.task_id, "detected RUNNING shard");
                task_ids.insert(task.shard_id, task.task_id.clone());
                HealthVerdict::alive()
            }
        }
    }

    /// The task recorded for `shard_id`, if the shard has been seen running.
    pub fn known_task(&self, shard_id: ShardId) -> Option<TaskId> {
        self.task_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&shard_id)
            .cloned()
    }
}

impl HealthCheck for StatusHealthCheck {
    fn health<'a>(
        &'a self,
        task: &'a ScheduledTask,
    ) -> BoxFuture<'a, HealthResult<HealthVerdict>> {
        let result: HealthResult<HealthVerdict> = Ok(self.check(task));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScheduleStatus;

    fn running(task_id: &str, shard_id: ShardId) -> ScheduledTask {
        ScheduledTask::new(task_id, shard_id, ScheduleStatus::Running, "host-a")
    }

    #[test]
    fn not_running_is_dead_retriable() {
        let checker = StatusHealthCheck::new();
        let task = ScheduledTask::new("t-1", 0, ScheduleStatus::Pending, "host-a");
        assert_eq!(checker.check(&task), HealthVerdict::dead_retriable());
        assert_eq!(checker.known_task(0), None);
    }

    #[test]
    fn first_running_sighting_is_recorded() {
        let checker = StatusHealthCheck::new();
        assert_eq!(checker.check(&running("t-1", 4)), HealthVerdict::alive());
        assert_eq!(checker.known_task(4).as_deref(), Some("t-1"));
    }

    #[test]
    fn same_task_stays_alive() {
        let checker = StatusHealthCheck::new();
        for _ in 0..5 {
            assert_eq!(checker.check(&running("t-1", 0)), HealthVerdict::alive());
        }
    }

    #[test]
    fn replaced_task_is_fatal() {
        let checker = StatusHealthCheck::new();
        let verdicts: Vec<_> = [running("T1", 0), running("T1", 0), running("T2", 0)]
            .iter()
            .map(|t| checker.check(t))
            .collect();
        assert_eq!(
            verdicts,
            vec![
                HealthVerdict::alive(),
                HealthVerdict::alive(),
                HealthVerdict::dead_fatal()
            ]
        );
        // The first identity is kept; the newcomer is not adopted.
        assert_eq!(checker.known_task(0).as_deref(), Some("T1"));
    }

    #[test]
    fn not_running_does_not_clear_identity() {
        let checker = StatusHealthCheck::new();
        checker.check(&running("T1", 0));

        let restarting = ScheduledTask::new("T1", 0, ScheduleStatus::Restarting, "host-a");
        assert_eq!(checker.check(&restarting), HealthVerdict::dead_retriable());
        assert_eq!(checker.known_task(0).as_deref(), Some("T1"));

        assert_eq!(checker.check(&running("T2", 0)), HealthVerdict::dead_fatal());
    }

    #[test]
    fn shards_are_independent() {
        let checker = StatusHealthCheck::new();
        assert_eq!(checker.check(&running("a", 0)), HealthVerdict::alive());
        assert_eq!(checker.check(&running("b", 1)), HealthVerdict::alive());
        assert_eq!(checker.check(&running("a", 0)), HealthVerdict::alive());
        assert_eq!(checker.check(&running("b", 1)), HealthVerdict::alive());
    }

    #[tokio::test]
    async fn trait_call_matches_check() {
        let checker = StatusHealthCheck::new();
        let verdict = checker.health(&running("t-1", 0)).await.unwrap();
        assert_eq!(verdict, HealthVerdict::alive());
    }
}
