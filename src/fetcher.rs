use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::progress::Progress;

#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    base: Url,
    max_attempts: usize,
    max_wait: Duration,
    semaphore: Arc<Semaphore>,
    progress: Option<Arc<Progress>>,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl Fetcher {
    pub fn new(config: &ClientConfig, progress: Option<Arc<Progress>>) -> anyhow::Result<Self> {
        if config.base_url.cannot_be_a_base() {
            anyhow::bail!("{} cannot be used as a base url", config.base_url);
        }
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            client,
            base: config.base_url.clone(),
            max_attempts: config.max_attempts.max(1),
            max_wait: config.timeout.min(Duration::from_secs(10)),
            semaphore: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            progress,
        })
    }

    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let bytes = self.get_bytes(url.clone()).await?;
        decode(&url, &bytes)
    }

    pub async fn send_json<B, T>(&self, method: Method, url: Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let _permit = self.permit().await;
        self.track_start(&method, &url);

        let resp = self
            .client
            .request(method.clone(), url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| self.transport(&url, source))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| self.transport(&url, source))?;
        self.track_done(&url, bytes.len());

        if !status.is_success() {
            return Err(rejection(status, &bytes));
        }
        decode(&url, &bytes)
    }

    async fn get_bytes(&self, url: Url) -> Result<Bytes, ApiError> {
        let _permit = self.permit().await;
        self.track_start(&Method::GET, &url);

        let mut backoff = Duration::from_millis(250).min(self.max_wait);

        for attempt in 1..=self.max_attempts {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|source| self.transport(&url, source))?;

            let status = resp.status();
            let headers = resp.headers().clone();
            let bytes = resp
                .bytes()
                .await
                .map_err(|source| self.transport(&url, source))?;

            if status.is_success() {
                self.track_done(&url, bytes.len());
                return Ok(bytes);
            }

            let throttled =
                status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE;
            if throttled && attempt < self.max_attempts {
                let wait = match retry_after_duration(&headers) {
                    Some(asked) if asked > self.max_wait => {
                        tracing::warn!(
                            %status,
                            %url,
                            asked_secs = asked.as_secs(),
                            max_wait_ms = self.max_wait.as_millis(),
                            "retry-after exceeds the request timeout; giving up"
                        );
                        self.track_done(&url, bytes.len());
                        return Err(rejection(status, &bytes));
                    }
                    Some(asked) => asked,
                    None => backoff,
                };
                tracing::warn!(
                    %status,
                    %url,
                    attempt,
                    wait_ms = wait.as_millis(),
                    "throttled; backing off"
                );
                tokio::time::sleep(wait).await;
                backoff = (backoff * 2).min(self.max_wait);
                continue;
            }

            self.track_done(&url, bytes.len());
            return Err(rejection(status, &bytes));
        }

        Err(ApiError::Rejected {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: format!("GET {url} failed after retries"),
        })
    }

    async fn permit(&self) -> Option<tokio::sync::SemaphorePermit<'_>> {
        // The semaphore is never closed, so acquire only fails if that changes.
        self.semaphore.acquire().await.ok()
    }

    fn transport(&self, url: &Url, source: reqwest::Error) -> ApiError {
        if let Some(progress) = &self.progress {
            progress.http_err(url);
        }
        ApiError::Transport {
            url: url.clone(),
            source,
        }
    }

    fn track_start(&self, method: &Method, url: &Url) {
        tracing::debug!(%method, %url, "request");
        if let Some(progress) = &self.progress {
            progress.http_start(method, url);
        }
    }

    fn track_done(&self, url: &Url, bytes: usize) {
        if let Some(progress) = &self.progress {
            progress.http_ok(url, bytes);
        }
    }
}

fn decode<T: DeserializeOwned>(url: &Url, bytes: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::Malformed {
        url: url.clone(),
        detail: e.to_string(),
    })
}

fn rejection(status: StatusCode, bytes: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(bytes)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            format!(
                "The server could not complete the request ({}).",
                status.canonical_reason().unwrap_or("error")
            )
        });
    ApiError::Rejected { status, message }
}

fn retry_after_duration(headers: &HeaderMap) -> Option<Duration> {
    let v = headers.get(RETRY_AFTER)?;
    let s = v.to_str().ok()?.trim();
    let seconds: u64 = s.parse().ok()?;
    Some(Duration::from_secs(seconds))
}
