use shardwatch_health::{HealthCheckConfig, http_prober_factory};

pub async fn probe(config: &HealthCheckConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let factory = http_prober_factory(&config.probe)?;
    let prober = factory(port, host);

    if prober.probe().await {
        println!("✓ {host}:{port}{} healthy", config.probe.endpoint);
        Ok(())
    } else {
        anyhow::bail!("{host}:{port}{} unhealthy", config.probe.endpoint)
    }
}
