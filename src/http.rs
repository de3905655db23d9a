//! Outbound HTTP client construction and retries.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::HttpConfig;
use crate::pipeline::check_cancelled;
use crate::{FeedbotError, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("feedbot/", env!("CARGO_PKG_VERSION"));

/// Build a client for `component` from the shared HTTP settings.
///
/// The proxy comes from the configuration, or from `HTTP_PROXY`.
pub fn build_client(config: &HttpConfig, component: &str) -> Result<Client> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(USER_AGENT);

    if let Some(proxy_url) = proxy_url(config) {
        let proxy = reqwest::Proxy::all(&proxy_url)
            .map_err(|e| FeedbotError::Config(format!("invalid proxy URL: {}", e)))?;
        info!("{}: will use proxy server {}", component, redact_proxy(&proxy_url));
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| FeedbotError::Http(format!("failed to create HTTP client: {}", e)))
}

fn proxy_url(config: &HttpConfig) -> Option<String> {
    config
        .proxy
        .clone()
        .or_else(|| std::env::var("HTTP_PROXY").ok())
        .filter(|url| !url.is_empty())
}

/// Scheme and host of a proxy URL, without credentials or path.
fn redact_proxy(proxy_url: &str) -> String {
    match url::Url::parse(proxy_url) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", url.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", url.scheme(), host),
            _ => url.scheme().to_string(),
        },
        Err(_) => "<invalid>".to_string(),
    }
}

/// Retry policy for one component.
///
/// Transport errors, `429` and `5xx` responses are retried with exponential
/// backoff. Any other response is returned to the caller as-is.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    component: &'static str,
    max_retries: u32,
    min_wait: Duration,
    max_wait: Duration,
}

impl RetryPolicy {
    pub fn new(component: &'static str, config: &HttpConfig) -> Self {
        Self {
            component,
            max_retries: config.max_retries,
            min_wait: Duration::from_millis(config.retry_min_wait_ms),
            max_wait: Duration::from_millis(config.retry_max_wait_ms),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.min_wait,
            initial_interval: self.min_wait,
            max_interval: self.max_wait,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Whether a response status is worth another attempt.
    pub fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    /// Send the request built by `request`, retrying per the policy.
    ///
    /// `request` is called once per attempt. Waiting between attempts stops
    /// with `Cancelled` as soon as `cancel` fires.
    pub async fn send<F>(&self, cancel: &CancellationToken, mut request: F) -> Result<Response>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0;

        loop {
            check_cancelled(cancel)?;

            let error = match request().send().await {
                Ok(response) if !Self::is_retryable(response.status()) => return Ok(response),
                Ok(response) => format!("HTTP {}", response.status()),
                Err(e) => e.to_string(),
            };

            attempt += 1;
            let delay = match backoff.next_backoff() {
                Some(delay) if attempt <= self.max_retries => delay,
                _ => {
                    return Err(FeedbotError::Http(format!(
                        "{}: giving up after {} attempt(s): {}",
                        self.component, attempt, error
                    )))
                }
            };

            warn!(
                "{}: request failed ({}), retry {}/{} in {:?}",
                self.component, error, attempt, self.max_retries, delay
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(FeedbotError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Fail with an HTTP error unless the response status is 2xx.
pub fn ensure_success(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(FeedbotError::Http(format!(
            "unable to download \"{}\": {}",
            url, status
        )));
    }
    Ok(response)
}
