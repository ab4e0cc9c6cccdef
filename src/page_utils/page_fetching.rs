//! retrying page fetcher (pool A)
//! every GET in the crate goes through `PageFetcher::get_page`, the only place where retry
//! and backoff happen.
use super::PageResponse;
use crate::error::FetchError;
use indicatif::ProgressBar;
use reqwest::{
    header::{HeaderMap, RETRY_AFTER},
    Client, StatusCode, Url,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// total number of requests, the first one included
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(120),
            status_forcelist: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    /// Delay before retry number `retry` (1-based): base, 2*base, 4*base ...
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }

    fn delay(&self, retry: u32, headers: Option<&HeaderMap>) -> Duration {
        let backoff = self.backoff(retry);
        match headers.and_then(retry_after) {
            Some(asked) => asked.max(backoff).min(self.backoff_max),
            None => backoff,
        }
    }
}

/// `Retry-After` in its delta-seconds form; http dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client, // not a deep clone!
    policy: Arc<RetryPolicy>,
}

impl PageFetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client, policy))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying forcelisted statuses and connect/timeout failures until the
    /// attempt budget runs out.
    pub async fn get_page(&self, url: &Url) -> Result<PageResponse, FetchError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if self.policy.is_retryable(status) {
                        if attempt >= max_attempts {
                            return Err(FetchError::RetriesExhausted {
                                url: url.to_string(),
                                attempts: attempt,
                                status: status.as_u16(),
                            });
                        }
                        let delay = self.policy.delay(attempt, Some(response.headers()));
                        warn!(%url, %status, attempt, ?delay, "retrying page");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    if !status.is_success() {
                        warn!(%url, %status, "page answered with a non-success status");
                    }
                    let final_url = response.url().clone();
                    let headers = response.headers().clone();
                    let body = response
                        .text()
                        .await
                        .map_err(|source| FetchError::Transport {
                            url: url.to_string(),
                            source,
                        })?;
                    debug!(%url, %status, attempt, "fetched page");
                    return Ok(PageResponse {
                        url: final_url,
                        status,
                        headers,
                        body,
                    });
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < max_attempts => {
                    let delay = self.policy.delay(attempt, None);
                    warn!(%url, error = %e, attempt, ?delay, "retrying page after transport error");
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    return Err(FetchError::Transport {
                        url: url.to_string(),
                        source,
                    })
                }
            }
        }
    }
}

/// Fetches every url with at most `concurrency` requests in flight.
///
/// The returned vector lines up with `urls`: entry i is the answer for `urls[i]`, whatever
/// order the requests finished in.
pub async fn fetch_pages(
    fetcher: &PageFetcher,
    urls: &[Url],
    concurrency: usize,
    progress: &ProgressBar,
) -> Result<Vec<PageResponse>, FetchError> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(urls.len());

    for url in urls {
        let permit = semaphore.clone().acquire_owned().await?;
        let fetcher = fetcher.clone();
        let url = url.clone();
        let progress = progress.clone();
        handles.push(tokio::spawn(async move {
            let page = fetcher.get_page(&url).await;
            progress.inc(1);
            drop(permit);
            page
        }));
    }

    let mut pages = Vec::with_capacity(handles.len());
    let mut handles = handles.into_iter();
    while let Some(handle) = handles.next() {
        let outcome = match handle.await {
            Ok(page) => page,
            Err(join) => Err(FetchError::Worker(join)),
        };
        match outcome {
            Ok(page) => pages.push(page),
            Err(e) => {
                handles.for_each(|h| h.abort());
                return Err(e);
            }
        }
    }
    Ok(pages)
}
