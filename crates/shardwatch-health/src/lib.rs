//! shardwatch-health — task health evaluation for a cluster job client.
//!
//! A polling loop hands each [`ScheduledTask`] snapshot to a [`HealthCheck`]
//! and acts on the returned [`HealthVerdict`]. Retry counting and escalation
//! belong to the caller; checkers only remember what they need to judge the
//! next snapshot of the same shard.
//!
//! # Architecture
//!
//! ```text
//! AdaptiveHealthCheck
//!   ├── StatusOnly:    StatusHealthCheck
//!   └── StatusAndHttp: ChainedHealthCheck
//!                        ├── StatusHealthCheck (same instance)
//!                        └── HttpHealthCheck
//!                              └── per-shard Prober (HttpProber by default)
//! ```
//!
//! # Verdicts
//!
//! - alive: keep going.
//! - dead, retriable: not running yet or probe failed; poll again.
//! - dead, fatal: a different task took over a shard that was running;
//!   escalate without waiting.
//!
//! Contract violations (an HTTP check on a task with no health port) are
//! [`HealthError`]s, not verdicts.

pub mod adaptive;
pub mod check;
pub mod config;
pub mod error;
pub mod http_check;
pub mod probe;
pub mod status;
pub mod types;

pub use adaptive::{AdaptiveHealthCheck, CheckMode};
pub use check::{BoxFuture, ChainedHealthCheck, HealthCheck};
pub use config::{HealthCheckConfig, MissingPortPolicy, ProbeConfig};
pub use error::{HealthError, HealthResult};
pub use http_check::HttpHealthCheck;
pub use probe::{HttpProber, ProbeResult, Prober, ProberFactory, http_probe, http_prober_factory};
pub use status::StatusHealthCheck;
pub use types::*;
