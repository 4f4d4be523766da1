//! Task snapshot and verdict types.
//!
//! A [`ScheduledTask`] is the read-only view of one task instance that the
//! polling loop hands to a checker. A [`HealthVerdict`] is what comes back.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of one concrete scheduled attempt.
pub type TaskId = String;

/// Stable logical slot of a job replica; survives restarts and reschedules.
pub type ShardId = u32;

/// Name of the assigned port that advertises an HTTP health endpoint.
pub const HEALTH_PORT: &str = "health";

// ── Snapshot ──────────────────────────────────────────────────────

/// Lifecycle state reported by the scheduler.
///
/// Only [`ScheduleStatus::Running`] is meaningful to the checkers; every
/// other state counts as not running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Init,
    Pending,
    Assigned,
    Starting,
    Running,
    Finished,
    Preempting,
    Restarting,
    Failed,
    Killed,
    Killing,
    Lost,
    Unknown,
    Rollback,
    Updating,
}

/// Point-in-time view of one task instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub shard_id: ShardId,
    pub status: ScheduleStatus,
    /// Host currently running the task.
    pub slave_host: String,
    /// Logical port name → concrete port number.
    #[serde(default)]
    pub assigned_ports: HashMap<String, u16>,
}

impl ScheduledTask {
    /// Create a snapshot with no assigned ports.
    pub fn new(
        task_id: impl Into<TaskId>,
        shard_id: ShardId,
        status: ScheduleStatus,
        slave_host: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            shard_id,
            status,
            slave_host: slave_host.into(),
            assigned_ports: HashMap::new(),
        }
    }

    /// Add a named port assignment.
    pub fn with_port(mut self, name: impl Into<String>, port: u16) -> Self {
        self.assigned_ports.insert(name.into(), port);
        self
    }

    pub fn is_running(&self) -> bool {
        self.status == ScheduleStatus::Running
    }

    /// The port advertised under [`HEALTH_PORT`], if any.
    pub fn health_port(&self) -> Option<u16> {
        self.assigned_ports.get(HEALTH_PORT).copied()
    }
}

// ── Verdict ───────────────────────────────────────────────────────

/// Result of a single health check.
///
/// Callers continue on `healthy`, re-poll on unhealthy + `retriable`, and
/// escalate immediately on unhealthy + not retriable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthVerdict {
    pub healthy: bool,
    pub retriable: bool,
}

impl HealthVerdict {
    /// Healthy; a later failure may still be retried.
    pub const fn alive() -> Self {
        Self {
            healthy: true,
            retriable: true,
        }
    }

    /// Unhealthy, worth polling again.
    pub const fn dead_retriable() -> Self {
        Self {
            healthy: false,
            retriable: true,
        }
    }

    /// Unhealthy and not recoverable by waiting.
    pub const fn dead_fatal() -> Self {
        Self {
            healthy: false,
            retriable: false,
        }
    }

    pub fn is_fatal(&self) -> bool {
        !self.healthy && !self.retriable
    }
}
