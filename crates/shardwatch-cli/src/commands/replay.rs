//! Replay a stream of task snapshots through an adaptive checker.
//!
//! Input is one JSON [`ScheduledTask`] per line. Blank lines and lines
//! starting with `#` are skipped.

use anyhow::Context;
use serde::Serialize;
use shardwatch_health::{
    AdaptiveHealthCheck, HealthCheck, HealthCheckConfig, HealthVerdict, ScheduledTask, ShardId,
    TaskId,
};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

/// Outcome of one replayed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayRecord {
    pub line: usize,
    pub shard_id: ShardId,
    pub task_id: TaskId,
    #[serde(flatten)]
    pub verdict: Option<HealthVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn replay(config: &HealthCheckConfig, input: &str, format: &str) -> anyhow::Result<()> {
    let content = if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("failed to read snapshots from stdin")?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("failed to read {input}"))?
    };

    let checker = AdaptiveHealthCheck::from_config(config)?;
    let records = evaluate(&checker, &content).await?;

    for record in &records {
        match format {
            "json" => println!("{}", serde_json::to_string(record)?),
            _ => println!("{}", format_record(record)),
        }
    }

    let violations = records.iter().filter(|r| r.error.is_some()).count();
    let fatal = records
        .iter()
        .filter(|r| r.verdict.is_some_and(|v| v.is_fatal()))
        .count();
    info!(snapshots = records.len(), fatal, violations, mode = ?checker.mode(), "replay finished");
    Ok(())
}

/// Run every snapshot in `content` through `checker`, in order.
///
/// Malformed lines abort the replay; contract violations are recorded and
/// the replay continues.
pub async fn evaluate(
    checker: &dyn HealthCheck,
    content: &str,
) -> anyhow::Result<Vec<ReplayRecord>> {
    let mut records = Vec::new();
    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            continue;
        }

        let task: ScheduledTask = serde_json::from_str(raw)
            .with_context(|| format!("line {line}: invalid task snapshot"))?;

        let (verdict, error) = match checker.health(&task).await {
            Ok(verdict) => (Some(verdict), None),
            Err(e) => {
                warn!(
                    line,
                    shard_id = task.shard_id,
                    error = %e,
                    "health check contract violation"
                );
                (None, Some(e.to_string()))
            }
        };

        records.push(ReplayRecord {
            line,
            shard_id: task.shard_id,
            task_id: task.task_id,
            verdict,
            error,
        });
    }
    Ok(records)
}

pub fn format_record(record: &ReplayRecord) -> String {
    let outcome = match (&record.verdict, &record.error) {
        (Some(v), _) if v.healthy => "alive".to_string(),
        (Some(v), _) if v.retriable => "dead (retriable)".to_string(),
        (Some(_), _) => "dead (fatal)".to_string(),
        (None, Some(e)) => format!("error: {e}"),
        (None, None) => "unknown".to_string(),
    };
    format!(
        "line {:>4}  shard {:>4}  task {}  {}",
        record.line, record.shard_id, record.task_id, outcome
    )
}
