//! HTTP-based health check.
//!
//! Each shard gets a prober for its current `(host, port)`. The prober is
//! reused while the destination is unchanged and replaced as soon as the
//! task moves; dropping the old slot releases the old prober.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::check::{BoxFuture, HealthCheck};
use crate::config::MissingPortPolicy;
use crate::error::{HealthError, HealthResult};
use crate::probe::{Prober, ProberFactory};
use crate::types::{HealthVerdict, ScheduledTask, ShardId};

/// Live prober for one shard.
struct ProberSlot {
    host: String,
    port: u16,
    prober: Arc<dyn Prober>,
}

pub struct HttpHealthCheck {
    factory: ProberFactory,
    missing_port: MissingPortPolicy,
    probers: Mutex<HashMap<ShardId, ProberSlot>>,
}

impl HttpHealthCheck {
    pub fn new(factory: ProberFactory) -> Self {
        Self {
            factory,
            missing_port: MissingPortPolicy::default(),
            probers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_missing_port_policy(mut self, policy: MissingPortPolicy) -> Self {
        self.missing_port = policy;
        self
    }

    /// Fetch the prober for `shard_id`, creating a new one if the shard is
    /// unknown or its destination changed. Lookup, compare and replace all
    /// happen under the table lock.
    fn prober_for(&self, shard_id: ShardId, host: &str, port: u16) -> Arc<dyn Prober> {
        let mut probers = self.probers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = probers.get(&shard_id) {
            if slot.host == host && slot.port == port {
                return slot.prober.clone();
            }
            debug!(
                shard_id,
                old_host = %slot.host,
                old_port = slot.port,
                %host,
                port,
                "shard moved, replacing prober"
            );
        } else {
            debug!(shard_id, %host, port, "creating prober");
        }

        let prober = (self.factory)(port, host);
        probers.insert(
            shard_id,
            ProberSlot {
                host: host.to_string(),
                port,
                prober: prober.clone(),
            },
        );
        prober
    }

    async fn run(&self, task: &ScheduledTask) -> HealthResult<HealthVerdict> {
        let Some(port) = task.health_port() else {
            return match self.missing_port {
                MissingPortPolicy::Reject => Err(HealthError::MissingHealthPort {
                    shard_id: task.shard_id,
                }),
                MissingPortPolicy::SkipHttp => {
                    debug!(shard_id = task.shard_id, "no health port, skipping HTTP check");
                    Ok(HealthVerdict::alive())
                }
            };
        };

        let prober = self.prober_for(task.shard_id, &task.slave_host, port);
        if prober.probe().await {
            Ok(HealthVerdict::alive())
        } else {
            debug!(
                shard_id = task.shard_id,
                host = %task.slave_host,
                port,
                "HTTP health probe failed"
            );
            Ok(HealthVerdict::dead_retriable())
        }
    }

    /// Number of shards with a live prober.
    pub fn tracked_shards(&self) -> usize {
        self.probers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl HealthCheck for HttpHealthCheck {
    fn health<'a>(
        &'a self,
        task: &'a ScheduledTask,
    ) -> BoxFuture<'a, HealthResult<HealthVerdict>> {
        Box::pin(self.run(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HEALTH_PORT, ScheduleStatus};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Prober that replays a script of results shared by every instance
    /// the factory hands out.
    struct Scripted {
        results: Arc<Mutex<VecDeque<bool>>>,
    }

    impl Prober for Scripted {
        fn probe(&self) -> BoxFuture<'_, bool> {
            let next = self.results.lock().unwrap().pop_front().unwrap_or(true);
            Box::pin(async move { next })
        }
    }

    struct FakeFactory {
        results: Arc<Mutex<VecDeque<bool>>>,
        created: Arc<Mutex<Vec<(String, u16)>>>,
    }

    impl FakeFactory {
        fn new(results: &[bool]) -> Self {
            Self {
                results: Arc::new(Mutex::new(results.iter().copied().collect())),
                created: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn factory(&self) -> ProberFactory {
            let results = self.results.clone();
            let created = self.created.clone();
            Arc::new(move |port: u16, host: &str| {
                created.lock().unwrap().push((host.to_string(), port));
                Arc::new(Scripted {
                    results: results.clone(),
                }) as Arc<dyn Prober>
            })
        }

        fn created(&self) -> Vec<(String, u16)> {
            self.created.lock().unwrap().clone()
        }
    }

    fn task(shard_id: ShardId, host: &str, port: u16) -> ScheduledTask {
        ScheduledTask::new("t-1", shard_id, ScheduleStatus::Running, host)
            .with_port(HEALTH_PORT, port)
    }

    #[tokio::test]
    async fn probe_results_map_to_verdicts_with_one_prober() {
        let fake = FakeFactory::new(&[true, false, true]);
        let checker = HttpHealthCheck::new(fake.factory());

        let mut verdicts = Vec::new();
        for _ in 0..3 {
            verdicts.push(checker.health(&task(0, "h", 8080)).await.unwrap());
        }

        assert_eq!(
            verdicts,
            vec![
                HealthVerdict::alive(),
                HealthVerdict::dead_retriable(),
                HealthVerdict::alive()
            ]
        );
        assert_eq!(fake.created(), vec![("h".to_string(), 8080)]);
    }

    #[tokio::test]
    async fn port_change_creates_new_prober() {
        let fake = FakeFactory::new(&[]);
        let checker = HttpHealthCheck::new(fake.factory());

        checker.health(&task(0, "h", 8080)).await.unwrap();
        checker.health(&task(0, "h", 8080)).await.unwrap();
        checker.health(&task(0, "h", 9090)).await.unwrap();
        checker.health(&task(0, "h", 9090)).await.unwrap();

        assert_eq!(fake.created(), vec![("h".to_string(), 8080), ("h".to_string(), 9090)]);
        assert_eq!(checker.tracked_shards(), 1);
    }

    #[tokio::test]
    async fn host_change_creates_new_prober() {
        let fake = FakeFactory::new(&[]);
        let checker = HttpHealthCheck::new(fake.factory());

        checker.health(&task(0, "h1", 8080)).await.unwrap();
        checker.health(&task(0, "h2", 8080)).await.unwrap();
        // Moving back is a new destination again, not a reuse.
        checker.health(&task(0, "h1", 8080)).await.unwrap();

        assert_eq!(fake.created().len(), 3);
    }

    #[tokio::test]
    async fn shards_get_their_own_probers() {
        let fake = FakeFactory::new(&[]);
        let checker = HttpHealthCheck::new(fake.factory());

        checker.health(&task(0, "h", 8080)).await.unwrap();
        checker.health(&task(1, "h", 8080)).await.unwrap();
        checker.health(&task(0, "h", 8080)).await.unwrap();

        assert_eq!(fake.created().len(), 2);
        assert_eq!(checker.tracked_shards(), 2);
    }

    #[tokio::test]
    async fn replaced_prober_is_released() {
        let drops = Arc::new(AtomicUsize::new(0));

        struct Tracked(Arc<AtomicUsize>);
        impl Prober for Tracked {
            fn probe(&self) -> BoxFuture<'_, bool> {
                Box::pin(async { true })
            }
        }
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = drops.clone();
        let factory: ProberFactory = Arc::new(move |_port: u16, _host: &str| {
            Arc::new(Tracked(counter.clone())) as Arc<dyn Prober>
        });
        let checker = HttpHealthCheck::new(factory);

        checker.health(&task(0, "h", 8080)).await.unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        checker.health(&task(0, "h", 8081)).await.unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_port_rejected_by_default() {
        let fake = FakeFactory::new(&[]);
        let checker = HttpHealthCheck::new(fake.factory());
        let bare = ScheduledTask::new("t-1", 7, ScheduleStatus::Running, "h");

        let err = checker.health(&bare).await.unwrap_err();
        assert!(matches!(err, HealthError::MissingHealthPort { shard_id: 7 }));
        assert!(fake.created().is_empty());
    }

    #[tokio::test]
    async fn missing_port_skipped_when_configured() {
        let fake = FakeFactory::new(&[]);
        let checker = HttpHealthCheck::new(fake.factory())
            .with_missing_port_policy(MissingPortPolicy::SkipHttp);
        let bare = ScheduledTask::new("t-1", 7, ScheduleStatus::Running, "h");

        assert_eq!(checker.health(&bare).await.unwrap(), HealthVerdict::alive());
        assert!(fake.created().is_empty());
    }
}
