//! HTTP health probes.
//!
//! A [`Prober`] is bound to one `host:port` destination and answers a single
//! question: is the endpoint healthy right now? Transport failures are folded
//! into `false`; nothing escapes as an error.

use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::BodyExt;
use tracing::debug;

use crate::check::BoxFuture;
use crate::config::ProbeConfig;
use crate::error::HealthResult;

/// Probe bound to a fixed destination.
pub trait Prober: Send + Sync {
    /// Perform one probe. `true` means healthy.
    fn probe(&self) -> BoxFuture<'_, bool>;
}

/// Builds a prober for `(port, host)`. Injected so tests can substitute fakes.
pub type ProberFactory = Arc<dyn Fn(u16, &str) -> Arc<dyn Prober> + Send + Sync>;

/// Outcome of a single HTTP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// 2xx with the expected body.
    Healthy,
    /// Non-2xx, or a 2xx whose body did not match.
    Unhealthy,
    /// Connection error, handshake error or timeout.
    Failed,
}

/// Prober that issues `GET http://{host}:{port}{endpoint}`.
#[derive(Debug, Clone)]
pub struct HttpProber {
    address: String,
    endpoint: String,
    timeout: Duration,
    expected_response: Option<String>,
}

impl HttpProber {
    pub fn new(
        host: &str,
        port: u16,
        endpoint: &str,
        timeout: Duration,
        expected_response: Option<String>,
    ) -> Self {
        // IPv6 literals need brackets in both the socket address and the URI.
        let address = if host.parse::<Ipv6Addr>().is_ok() {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        Self {
            address,
            endpoint: endpoint.to_string(),
            timeout,
            expected_response,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Prober for HttpProber {
    fn probe(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let result = http_probe(
                &self.address,
                &self.endpoint,
                self.timeout,
                self.expected_response.as_deref(),
            )
            .await;
            result == ProbeResult::Healthy
        })
    }
}

/// Factory producing [`HttpProber`]s configured from `config`.
pub fn http_prober_factory(config: &ProbeConfig) -> HealthResult<ProberFactory> {
    let timeout = config.timeout()?;
    let endpoint = config.endpoint.clone();
    let expected = config.expected_response.clone();
    Ok(Arc::new(move |port: u16, host: &str| {
        let prober = HttpProber::new(host, port, &endpoint, timeout, expected.clone());
        Arc::new(prober) as Arc<dyn Prober>
    }))
}

/// Perform an HTTP health probe against an endpoint.
///
/// Returns `Healthy` if the response is 2xx and, when `expected_body` is
/// set, the trimmed body equals it. `Unhealthy` covers other responses;
/// `Failed` covers connection errors and timeouts.
pub async fn http_probe(
    address: &str,
    path: &str,
    timeout: Duration,
    expected_body: Option<&str>,
) -> ProbeResult {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "health probe connection failed");
                return ProbeResult::Failed;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "health probe handshake failed");
                return ProbeResult::Failed;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("user-agent", "shardwatch-health/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %uri, "health probe request invalid");
                return ProbeResult::Failed;
            }
        };

        let resp = match sender.send_request(req).await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(error = %e, %uri, "health probe request failed");
                return ProbeResult::Failed;
            }
        };

        if !resp.status().is_success() {
            debug!(status = %resp.status(), %uri, "health probe non-2xx");
            return ProbeResult::Unhealthy;
        }

        let Some(expected) = expected_body else {
            return ProbeResult::Healthy;
        };

        match resp.into_body().collect().await {
            Ok(collected) => {
                let body = collected.to_bytes();
                if String::from_utf8_lossy(&body).trim() == expected {
                    ProbeResult::Healthy
                } else {
                    debug!(%uri, "health probe body mismatch");
                    ProbeResult::Unhealthy
                }
            }
            Err(e) => {
                debug!(error = %e, %uri, "health probe body read failed");
                ProbeResult::Failed
            }
        }
    })
    .await;

    match result {
        Ok(probe) => probe,
        Err(_) => {
            debug!(%uri, "health probe timed out");
            ProbeResult::Failed
        }
    }
}
