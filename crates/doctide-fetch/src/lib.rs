//! HTTP fetch contract shared by every extraction strategy: retries with
//! backoff, a circuit breaker per fetcher instance, and response caching so
//! discovery probes and resumed syncs don't refetch a body twice.

mod cache;
mod circuit;
mod fetch;
mod metrics;

pub use cache::ResponseCache;
pub use circuit::{CircuitBreaker, Clock, Config as CircuitConfig, RealClock, State as CircuitState};
pub use fetch::{probe_content_type, Fetcher, HttpFetcher, RetryConfig};
pub use metrics::{FetchMetrics, HostMetrics};
