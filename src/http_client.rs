use crate::config::FetchConfig;
use crate::error::FetchFailure;
use crate::metrics::MetricsTracker;
use crate::throttle::Throttle;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, StatusCode};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Request identity a source presents on every request
#[derive(Debug, Clone)]
pub struct FetchProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Usually the source's base URL
    pub referer: Option<String>,
}

impl Default for FetchProfile {
    fn default() -> Self {
        let defaults = FetchConfig::default();
        Self {
            user_agent: defaults.user_agent,
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: defaults.accept_language,
            referer: None,
        }
    }
}

impl FetchProfile {
    pub fn from_config(config: &FetchConfig, referer: Option<&str>) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            accept_language: config.accept_language.clone(),
            referer: referer.map(|r| r.to_string()),
            ..Self::default()
        }
    }
}

/// Timing configuration for one fetcher
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub min_interval: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for HttpClientConfig {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            min_interval: cfg.min_interval(),
            max_retries: cfg.max_retries,
            initial_retry_delay_ms: cfg.initial_retry_delay_ms,
            max_retry_delay_ms: cfg.max_retry_delay_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// HTTP client owned by exactly one source adapter.
///
/// Every attempt (retries included) passes through the adapter's own
/// [`Throttle`] first.
pub struct ThrottledFetcher {
    source: String,
    client: Client,
    config: HttpClientConfig,
    throttle: Throttle,
    metrics: Option<MetricsTracker>,
}

impl ThrottledFetcher {
    pub fn new(
        source: &str,
        config: HttpClientConfig,
        profile: FetchProfile,
    ) -> Result<Self, FetchFailure> {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, header_value(&profile.accept)?);
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            header_value(&profile.accept_language)?,
        );
        if let Some(referer) = &profile.referer {
            headers.insert(reqwest::header::REFERER, header_value(referer)?);
        }
        headers.insert(
            HeaderName::from_static("upgrade-insecure-requests"),
            HeaderValue::from_static("1"),
        );
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=0"),
        );

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(profile.user_agent.clone())
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .default_headers(headers)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| FetchFailure::Client(e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            throttle: Throttle::new(config.min_interval),
            client,
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: MetricsTracker) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub async fn get_text(&self, url: &str) -> Result<String, FetchFailure> {
        self.fetch(url, Method::Get, None).await
    }

    /// Form-encoded POST as sent by the sites' own AJAX handlers
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> Result<String, FetchFailure> {
        self.fetch(url, Method::Post, Some(form)).await
    }

    /// Issue one request, retrying 429/5xx and connection errors with
    /// exponential backoff. Non-2xx responses become [`FetchFailure::Status`].
    pub async fn fetch(
        &self,
        url: &str,
        method: Method,
        body: Option<&[(String, String)]>,
    ) -> Result<String, FetchFailure> {
        reqwest::Url::parse(url).map_err(|_| FetchFailure::InvalidUrl(url.to_string()))?;

        let mut attempt = 0usize;
        loop {
            self.throttle.acquire().await;
            let started = Instant::now();

            let result = self.send_once(url, method, body).await;
            match result {
                Ok(text) => {
                    if let Some(m) = &self.metrics {
                        m.record_success(&self.source, started.elapsed());
                    }
                    return Ok(text);
                }
                Err(failure) => {
                    if failure.is_rate_limited() {
                        if let Some(m) = &self.metrics {
                            m.record_rate_limit(&self.source);
                        }
                    }
                    if Self::is_retryable(&failure) && attempt < self.config.max_retries {
                        let delay = self.calculate_retry_delay(attempt);
                        log::warn!(
                            "[{}] {} - retry {}/{} in {}ms",
                            self.source,
                            failure,
                            attempt + 1,
                            self.config.max_retries,
                            delay.as_millis()
                        );
                        if let Some(m) = &self.metrics {
                            m.record_retry(&self.source);
                        }
                        sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if let Some(m) = &self.metrics {
                        m.record_failure(&self.source, &failure);
                    } else {
                        log::warn!("[{}] {}", self.source, failure);
                    }
                    return Err(failure);
                }
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        method: Method,
        body: Option<&[(String, String)]>,
    ) -> Result<String, FetchFailure> {
        let request = match method {
            Method::Get => self.client.get(url),
            Method::Post => {
                let req = self
                    .client
                    .post(url)
                    .header("X-Requested-With", "XMLHttpRequest");
                match body {
                    Some(form) => req.form(form),
                    None => req,
                }
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchFailure::Body {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Exponential backoff with +-25% jitter
    fn calculate_retry_delay(&self, attempt: usize) -> Duration {
        let base_delay = self.config.initial_retry_delay_ms;
        let max_delay = self.config.max_retry_delay_ms;
        let delay_ms = base_delay
            .saturating_mul(2u64.saturating_pow(attempt as u32))
            .min(max_delay);

        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((delay_ms as f64 * jitter) as u64)
    }

    fn is_retryable(failure: &FetchFailure) -> bool {
        match failure {
            FetchFailure::Timeout { .. } | FetchFailure::Connect { .. } => true,
            FetchFailure::Status { status, .. } => StatusCode::from_u16(*status)
                .map(Self::is_retryable_status)
                .unwrap_or(false),
            _ => false,
        }
    }

    fn is_retryable_status(status: StatusCode) -> bool {
        matches!(
            status.as_u16(),
            429 | 500 | 502 | 503 | 504 | 520 | 521 | 522 | 523 | 524
        )
    }
}

fn header_value(value: &str) -> Result<HeaderValue, FetchFailure> {
    HeaderValue::from_str(value).map_err(|e| FetchFailure::Client(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> ThrottledFetcher {
        ThrottledFetcher::new("test", HttpClientConfig::default(), FetchProfile::default()).unwrap()
    }

    #[tokio::test]
    async fn test_client_creation_with_referer() {
        let profile = FetchProfile {
            referer: Some("https://example.com/".to_string()),
            ..FetchProfile::default()
        };
        assert!(ThrottledFetcher::new("test", HttpClientConfig::default(), profile).is_ok());
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let profile = FetchProfile {
            user_agent: "ok".to_string(),
            accept_language: "bad\nvalue".to_string(),
            ..FetchProfile::default()
        };
        assert!(ThrottledFetcher::new("test", HttpClientConfig::default(), profile).is_err());
    }

    #[tokio::test]
    async fn test_retry_delay_calculation() {
        let client = fetcher();
        let delay0 = client.calculate_retry_delay(0);
        let delay3 = client.calculate_retry_delay(3);
        assert!(delay0.as_millis() >= 375 && delay0.as_millis() <= 625);
        assert!(delay3.as_millis() >= 3000);
        assert!(client.calculate_retry_delay(10).as_millis() <= 10_000);
    }

    #[test]
    fn test_retryable_failures() {
        let status = |s| FetchFailure::Status {
            url: "u".to_string(),
            status: s,
        };
        assert!(ThrottledFetcher::is_retryable(&status(429)));
        assert!(ThrottledFetcher::is_retryable(&status(503)));
        assert!(!ThrottledFetcher::is_retryable(&status(404)));
        assert!(ThrottledFetcher::is_retryable(&FetchFailure::Timeout {
            url: "u".to_string()
        }));
        assert!(!ThrottledFetcher::is_retryable(&FetchFailure::InvalidUrl(
            "u".to_string()
        )));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_without_request() {
        let result = fetcher().get_text("not a url").await;
        assert!(matches!(result, Err(FetchFailure::InvalidUrl(_))));
    }
}
