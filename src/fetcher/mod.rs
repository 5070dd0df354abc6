//! HTTP fetch with robots.txt compliance, per-host politeness, conditional
//! requests, and cancellation.
//!
//! Grounded on `reqwest::Client` (teacher's HTTP stack) plus the
//! retry/backoff shape of `forge-providers`' `retry.rs`
//! (`should_retry`/`calculate_retry_delay`), simplified: no idempotency keys,
//! no SSE, since the Fetcher issues a single non-streaming GET per attempt.

pub mod error;
pub mod politeness;
pub mod robots;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::change_detector::ConditionalHeaders;
use crate::config::CrawlConfig;

pub use error::FetchError;
pub use politeness::PolitenessGate;
pub use robots::RobotsCache;

/// Backoff parameters for transient fetch failures.
#[derive(Debug, Clone)]
struct RetryConfig {
    max_retries: u8,
    initial_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

fn calculate_retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

/// Outcome of one successful fetch attempt (2xx or 304).
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: u16,
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub not_modified: bool,
}

pub struct Fetcher {
    client: Client,
    robots: RobotsCache,
    politeness: PolitenessGate,
    respect_robots: bool,
    user_agent: String,
    retry: RetryConfig,
}

fn origin_of(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or(""), port),
        None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or("")),
    }
}

impl Fetcher {
    /// Build a fetcher from crawl configuration: user agent, request
    /// timeout, robots/politeness settings all come from `config`.
    ///
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` can't be built.
    pub fn new(config: &CrawlConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent().to_string())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            robots: RobotsCache::new(),
            politeness: PolitenessGate::new(config.polite_delay()),
            respect_robots: config.respect_robots(),
            user_agent: config.user_agent().to_string(),
            retry: RetryConfig {
                max_retries: config.max_retries(),
                ..RetryConfig::default()
            },
        })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn robots(&self) -> &RobotsCache {
        &self.robots
    }

    /// Fetch `url`, honouring robots.txt, per-host politeness, conditional
    /// headers, and the retry policy for transient failures.
    ///
    /// # Errors
    /// Returns [`FetchError::RobotsDenied`] if robots.txt disallows the
    /// path, [`FetchError::Cancelled`] if `cancellation` fires mid-flight,
    /// and [`FetchError::Transport`]/[`FetchError::Timeout`]/
    /// [`FetchError::HttpStatus`] after retries are exhausted.
    pub async fn fetch(
        &self,
        url: &str,
        conditional: &ConditionalHeaders,
        cancellation: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::HttpStatus(0))?;
        let origin = origin_of(&parsed);

        if self.respect_robots {
            self.robots.ensure_loaded(&self.client, &origin, &self.user_agent).await;
            if !self.robots.is_allowed(&origin, parsed.path()) {
                return Err(FetchError::RobotsDenied);
            }
        }

        for attempt in 0..=self.retry.max_retries {
            self.politeness.wait_turn(&origin).await;

            let mut request = self.client.get(url);
            if let Some(etag) = &conditional.if_none_match {
                request = request.header("If-None-Match", etag);
            }
            if let Some(last_modified) = &conditional.if_modified_since {
                request = request.header("If-Modified-Since", last_modified);
            }

            let outcome = tokio::select! {
                () = cancellation.cancelled() => return Err(FetchError::Cancelled),
                result = request.send() => result,
            };

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::NOT_MODIFIED {
                        return Ok(FetchOutcome {
                            status: status.as_u16(),
                            body: Vec::new(),
                            etag: None,
                            last_modified: None,
                            not_modified: true,
                        });
                    }
                    if status.is_success() {
                        let etag = response
                            .headers()
                            .get("etag")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let last_modified = response
                            .headers()
                            .get("last-modified")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        let body = tokio::select! {
                            () = cancellation.cancelled() => return Err(FetchError::Cancelled),
                            result = response.bytes() => result?,
                        };
                        return Ok(FetchOutcome {
                            status: status.as_u16(),
                            body: body.to_vec(),
                            etag,
                            last_modified,
                            not_modified: false,
                        });
                    }
                    if status.is_server_error() && attempt < self.retry.max_retries {
                        tokio::time::sleep(calculate_retry_delay(u32::from(attempt), &self.retry)).await;
                        continue;
                    }
                    return Err(FetchError::HttpStatus(status.as_u16()));
                }
                Err(error) => {
                    if error.is_timeout() {
                        if attempt < self.retry.max_retries {
                            tokio::time::sleep(calculate_retry_delay(u32::from(attempt), &self.retry)).await;
                            continue;
                        }
                        return Err(FetchError::Timeout(url.to_string()));
                    }
                    if (error.is_connect() || error.is_request()) && attempt < self.retry.max_retries {
                        tokio::time::sleep(calculate_retry_delay(u32::from(attempt), &self.retry)).await;
                        continue;
                    }
                    return Err(FetchError::Transport(error));
                }
            }
        }
        unreachable!("retry loop always returns within max_retries + 1 attempts")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> CrawlConfig {
        CrawlConfig::builder()
            .storage_dir(std::env::temp_dir())
            .unwrap()
            .start_url("https://example.com")
            .respect_robots(false)
            .polite_delay(Duration::from_millis(1))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn fetches_a_page_and_captures_etag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"v1\"").set_body_string("hi"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let outcome = fetcher
            .fetch(&server.uri(), &ConditionalHeaders::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.etag.as_deref(), Some("\"v1\""));
        assert_eq!(outcome.body, b"hi");
    }

    #[tokio::test]
    async fn not_modified_short_circuits_with_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(304))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let conditional = ConditionalHeaders {
            if_none_match: Some("\"v1\"".to_string()),
            if_modified_since: None,
        };
        let outcome = fetcher
            .fetch(&server.uri(), &conditional, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.not_modified);
        assert!(outcome.body.is_empty());
    }

    #[tokio::test]
    async fn retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let outcome = fetcher
            .fetch(&server.uri(), &ConditionalHeaders::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, 200);
    }

    #[tokio::test]
    async fn permanent_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let result = fetcher
            .fetch(&server.uri(), &ConditionalHeaders::default(), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(FetchError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let fetcher = Fetcher::new(&test_config()).unwrap();
        let token = CancellationToken::new();
        let token_clone = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token_clone.cancel();
        });

        let result = fetcher
            .fetch(&server.uri(), &ConditionalHeaders::default(), &token)
            .await;

        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
