//! Catalog page fetching with retry, backoff and rate-limit accounting

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::rate_limit::RateLimitCounter;
use crate::retry::{BackoffPolicy, RetryError, retry_with_backoff};
use crate::types::FetchAttempt;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one [`Fetcher::fetch_report`] call
#[derive(Debug)]
pub struct FetchReport {
    /// Requested URL
    pub url: String,
    /// Page body, or why there is none
    pub result: Result<String>,
    /// Per-attempt log
    pub attempts: Vec<FetchAttempt>,
}

/// HTTP GET client for catalog detail pages
///
/// Each attempt gets a timeout that grows by half the base timeout per retry.
/// 429 and 5xx responses as well as transport failures are retried with the
/// backoff from [`BackoffPolicy`]; every 429 also bumps the shared
/// [`RateLimitCounter`]. Any other non-200 status fails immediately.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
    policy: BackoffPolicy,
    rate_limits: RateLimitCounter,
}

impl Fetcher {
    /// Create a fetcher with a browser-like header set
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a configured header is not a valid header
    /// value, or [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: FetchConfig, rate_limits: RateLimitCounter) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept)
                .map_err(|e| Error::config("fetch.accept", e.to_string()))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| Error::config("fetch.accept_language", e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        let policy = BackoffPolicy::from_fetch_config(&config);
        Ok(Self {
            client,
            config,
            policy,
            rate_limits,
        })
    }

    /// Shared rate-limit counter this fetcher reports to
    pub fn rate_limits(&self) -> &RateLimitCounter {
        &self.rate_limits
    }

    /// Timeout for the given 1-based attempt: `timeout * (1 + 0.5 * (attempt - 1))`
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        let growth = 1.0 + 0.5 * f64::from(attempt.saturating_sub(1));
        self.config.timeout.mul_f64(growth)
    }

    /// Detail page URL for a record id
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL cannot take path segments.
    pub fn detail_url(&self, id: &str) -> Result<String> {
        let mut url = url::Url::parse(&self.config.base_url)?;
        url.path_segments_mut()
            .map_err(|()| {
                Error::config(
                    "fetch.base_url",
                    format!("'{}' cannot be a base URL", self.config.base_url),
                )
            })?
            .pop_if_empty()
            .push(id);
        Ok(url.into())
    }

    /// Fetch a page body
    ///
    /// # Errors
    ///
    /// - [`Error::HttpStatus`] for a non-retryable status (e.g. 404)
    /// - [`Error::RetriesExhausted`] when every attempt failed transiently
    pub async fn fetch(&self, url: &str) -> Result<String> {
        self.fetch_report(url).await.result
    }

    /// Fetch a page body and keep the per-attempt log
    pub async fn fetch_report(&self, url: &str) -> FetchReport {
        let outcome =
            retry_with_backoff(&self.policy, move |attempt| self.attempt(url, attempt)).await;

        let result = outcome.result.map_err(|e| match e {
            RetryError::Permanent(e) => e,
            RetryError::Exhausted { attempts, .. } => Error::RetriesExhausted {
                url: url.to_string(),
                attempts,
            },
        });

        FetchReport {
            url: url.to_string(),
            result,
            attempts: outcome.attempts,
        }
    }

    async fn attempt(&self, url: &str, attempt: u32) -> Result<String> {
        let timeout = self.attempt_timeout(attempt);
        debug!(url, attempt, timeout_ms = timeout.as_millis() as u64, "GET");

        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();

        if status == StatusCode::OK {
            return Ok(response.text().await?);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let count = self.rate_limits.increment();
            warn!(url, attempt, rate_limit_count = count, "Rate limited (429)");
            return Err(Error::RateLimited {
                url: url.to_string(),
            });
        }

        if !status.is_server_error() {
            warn!(url, status = status.as_u16(), "Page fetch failed");
        }
        Err(Error::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
