//! HTTP retry client (C1): a single-endpoint GET with bounded retries and
//! 429 backoff, independent across calls.

use std::time::Duration;

use esa_common::error::EsaCciError;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

/// The ceiling the first 429 backoff starts from, before it is grown by
/// `backoff_base` on each subsequent 429 (§4.1 gives the cap, not the
/// starting point; a small initial ceiling keeps early retries snappy).
const INITIAL_BACKOFF_CEILING_MS: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct RetryClientConfig {
    pub num_retries: u32,
    pub backoff_ceiling_max_ms: f64,
    pub backoff_base: f64,
}

impl Default for RetryClientConfig {
    fn default() -> Self {
        Self {
            num_retries: esa_common::config::DEFAULT_NUM_RETRIES,
            backoff_ceiling_max_ms: esa_common::config::DEFAULT_RETRY_BACKOFF_MAX_MS as f64,
            backoff_base: esa_common::config::DEFAULT_RETRY_BACKOFF_BASE,
        }
    }
}

/// Performs GETs with exponential-ish 429 backoff and immediate 5xx retry.
///
/// Each call to [`RetryClient::get`] is independent: the backoff ceiling it
/// grows is local to that call's retry loop, never shared across requests.
pub struct RetryClient {
    http: Client,
    config: RetryClientConfig,
}

impl RetryClient {
    pub fn new(config: RetryClientConfig) -> Result<Self, EsaCciError> {
        let http = Client::builder().build().map_err(|e| EsaCciError::Transport {
            url: "<client-builder>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { http, config })
    }

    pub fn with_client(http: Client, config: RetryClientConfig) -> Self {
        Self { http, config }
    }

    /// Fetches `url`, retrying on 5xx (immediately) and 429 (after a
    /// backoff sleep), failing on any other non-200 status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<bytes::Bytes, EsaCciError> {
        let mut backoff_ceiling_ms = INITIAL_BACKOFF_CEILING_MS;
        let mut attempt = 0u32;

        loop {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| EsaCciError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            if status == StatusCode::OK {
                return response.bytes().await.map_err(|e| EsaCciError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }

            attempt += 1;
            if attempt > self.config.num_retries {
                return Err(EsaCciError::Transport {
                    url: url.to_string(),
                    reason: format!("exceeded {} retries, last status {status}", self.config.num_retries),
                });
            }

            if status.is_server_error() {
                warn!(attempt, %status, "server error, retrying immediately");
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_ms = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(|secs| secs as f64 * 1000.0);

                let jittered_ceiling_ms = rand::random::<f64>() * backoff_ceiling_ms;
                let sleep_ms = retry_after_ms
                    .unwrap_or(0.0)
                    .max(jittered_ceiling_ms)
                    .max(1.0);

                debug!(attempt, sleep_ms, "rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(sleep_ms as u64)).await;

                backoff_ceiling_ms =
                    (backoff_ceiling_ms * self.config.backoff_base).min(self.config.backoff_ceiling_max_ms);
                continue;
            }

            return Err(EsaCciError::Transport {
                url: url.to_string(),
                reason: format!("unexpected status {status}"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = RetryClientConfig::default();
        assert_eq!(cfg.num_retries, 200);
        assert!((cfg.backoff_ceiling_max_ms - 40.0).abs() < 1e-9);
        assert!((cfg.backoff_base - 1.001).abs() < 1e-9);
    }

    #[tokio::test]
    async fn get_returns_body_on_200() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/ok");
                then.status(200).body("hello");
            })
            .await;

        let client = RetryClient::new(RetryClientConfig::default()).unwrap();
        let body = client.get(&format!("{}/ok", server.base_url())).await.unwrap();

        mock.assert_async().await;
        assert_eq!(body.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn get_retries_server_errors_up_to_the_configured_bound() {
        let server = MockServer::start_async().await;
        let failing = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/flaky");
                then.status(503);
            })
            .await;

        let mut config = RetryClientConfig::default();
        config.num_retries = 2;
        let client = RetryClient::new(config).unwrap();
        let err = client
            .get(&format!("{}/flaky", server.base_url()))
            .await
            .unwrap_err();

        // One initial attempt plus two retries = three requests observed.
        failing.assert_hits_async(3).await;
        assert!(matches!(err, EsaCciError::Transport { .. }));
    }

    #[tokio::test]
    async fn get_fails_fast_on_other_status() {
        let server = MockServer::start_async().await;
        let _mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/missing");
                then.status(404);
            })
            .await;

        let client = RetryClient::new(RetryClientConfig::default()).unwrap();
        let err = client
            .get(&format!("{}/missing", server.base_url()))
            .await
            .unwrap_err();
        assert!(matches!(err, EsaCciError::Transport { .. }));
    }

    #[tokio::test]
    async fn get_honors_retry_after_on_429_then_succeeds() {
        let server = MockServer::start_async().await;
        let limited = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/limited");
                then.status(429).header("Retry-After", "0");
            })
            .await;

        let mut config = RetryClientConfig::default();
        config.num_retries = 0;
        let client = RetryClient::new(config).unwrap();
        let err = client
            .get(&format!("{}/limited", server.base_url()))
            .await
            .unwrap_err();

        limited.assert_async().await;
        assert!(matches!(err, EsaCciError::Transport { .. }));
    }
}
