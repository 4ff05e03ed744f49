use crate::cache::ResponseCache;
use crate::circuit::{self, CircuitBreaker};
use crate::metrics::FetchMetrics;
use anyhow::anyhow;
use async_trait::async_trait;
use doctide_types::{DocError, DocResult, Response};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Exponential-backoff retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// The fetcher capability every strategy depends on. Strategies must not
/// depend on a concrete client type — see spec §9 "interface polymorphism".
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str) -> DocResult<Response>;

    /// The underlying transport, exposed so the crawler can reuse the same
    /// connection pool/user-agent when it needs raw `reqwest` access (e.g.
    /// HEAD requests for content-type gating).
    fn transport(&self) -> &Client;

    /// Per-host request metrics, surfaced as a one-line summary at the end
    /// of a run.
    fn metrics(&self) -> &FetchMetrics;
}

/// Production `Fetcher` built on `reqwest`, with retries, a per-instance
/// circuit breaker, and an in-memory response cache.
pub struct HttpFetcher {
    client: Client,
    retry_config: RetryConfig,
    circuit_breaker: std::sync::Arc<CircuitBreaker>,
    cache: ResponseCache,
    request_timeout: Duration,
    metrics: FetchMetrics,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(10))
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            retry_config: RetryConfig::default(),
            circuit_breaker: CircuitBreaker::new(circuit::Config::default(), std::sync::Arc::new(circuit::RealClock)),
            cache: ResponseCache::new(),
            request_timeout,
            metrics: FetchMetrics::new(),
        })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    /// Per-host request metrics accumulated since construction; surfaced by
    /// the dependency container as a one-line summary at the end of a run.
    pub fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.retry_config.initial_delay.as_millis() as f64
            * self.retry_config.backoff_multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(base as u64).min(self.retry_config.max_delay);
        if self.retry_config.jitter {
            let jitter_ms = rand::thread_rng().gen_range(0..=(delay.as_millis() as u64 / 5).max(1));
            delay + Duration::from_millis(jitter_ms)
        } else {
            delay
        }
    }

    async fn get_uncached(&self, url: &str) -> DocResult<Response> {
        let permit = self.circuit_breaker.try_acquire().map_err(|msg| {
            DocError::Transport {
                url: url.to_string(),
                source: anyhow!("circuit breaker rejected request: {msg}"),
            }
        })?;

        let mut last_err: Option<anyhow::Error> = None;
        let started = Instant::now();

        for attempt in 0..self.retry_config.max_attempts {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() || !status.is_server_error() {
                        self.circuit_breaker.on_success();
                        self.metrics.record(url, true, started.elapsed().as_millis() as u64);
                        let final_url = resp.url().to_string();
                        let content_type = resp
                            .headers()
                            .get(reqwest::header::CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let headers = resp
                            .headers()
                            .iter()
                            .filter_map(|(k, v)| {
                                v.to_str().ok().map(|v| (k.to_string(), v.to_string()))
                            })
                            .collect::<Vec<_>>();
                        let status_code = status.as_u16();
                        let body = resp.bytes().await.map_err(|e| DocError::Transport {
                            url: url.to_string(),
                            source: anyhow!(e),
                        })?;

                        let mut out = Response::new(status_code, final_url, body.to_vec())
                            .with_headers(headers);
                        if let Some(ct) = content_type {
                            out = out.with_content_type(ct);
                        }
                        drop(permit);
                        return Ok(out);
                    }

                    last_err = Some(anyhow!("server error: HTTP {status}"));
                    self.circuit_breaker.on_failure();
                }
                Err(e) => {
                    last_err = Some(anyhow!(e));
                    self.circuit_breaker.on_failure();
                }
            }

            if attempt + 1 < self.retry_config.max_attempts {
                let delay = self.calculate_delay(attempt);
                debug!(url, attempt, delay_ms = delay.as_millis(), "retrying fetch");
                tokio::time::sleep(delay).await;
            }
        }

        self.metrics.record(url, false, started.elapsed().as_millis() as u64);
        Err(DocError::Transport {
            url: url.to_string(),
            source: last_err.unwrap_or_else(|| anyhow!("all retry attempts failed")),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn get(&self, url: &str) -> DocResult<Response> {
        if let Some(cached) = self.cache.get(url) {
            debug!(url, "serving from response cache");
            return Ok(cached.with_from_cache(true));
        }

        let response = self.get_uncached(url).await?;
        self.cache.put(url.to_string(), response.clone());
        Ok(response)
    }

    fn transport(&self) -> &Client {
        &self.client
    }

    fn metrics(&self) -> &FetchMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("request_timeout", &self.request_timeout)
            .field("circuit_state", &self.circuit_breaker.state())
            .finish()
    }
}

/// Fire-and-log a best-effort HEAD/GET purely to sniff content-type before
/// committing to a full fetch; used by the crawler's content-type gate when
/// a cheap pre-check is worthwhile. Failures are swallowed — callers fall
/// back to a normal `get`.
pub async fn probe_content_type(client: &Client, url: &str) -> Option<String> {
    match client.head(url).send().await {
        Ok(resp) => resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        Err(e) => {
            warn!(url, error = %e, "HEAD probe failed, falling back to GET");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_backs_off_without_jitter() {
        let fetcher = HttpFetcher::new("doctide-test/1.0", Duration::from_secs(5))
            .unwrap()
            .with_retry_config(RetryConfig {
                max_attempts: 3,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(5),
                backoff_multiplier: 2.0,
                jitter: false,
            });

        assert_eq!(fetcher.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(fetcher.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(fetcher.calculate_delay(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn cache_hit_flag_set_on_second_fetch() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new("doctide-test/1.0", Duration::from_secs(5)).unwrap();
        let url = format!("{}/a", server.uri());

        let first = fetcher.get(&url).await.unwrap();
        assert!(!first.from_cache);

        let second = fetcher.get(&url).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.text(), "hello");
    }
}
