//! Shared HTTP transport used by every promotion source.

use std::time::Duration;

use promosync_core::AppConfig;
pub use promosync_core::DEFAULT_USER_AGENT;
use reqwest::{Client, Url};

use crate::error::TransportError;
use crate::rate_limit::retry_with_backoff;

/// Timeouts, retry budget and throttle for a [`PromoClient`].
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    /// Sleep after every successful response.
    pub crawl_delay: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_attempts: 3,
            backoff_base_secs: 1,
            crawl_delay: Duration::from_secs(1),
        }
    }
}

impl TransportSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_attempts: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
            crawl_delay: Duration::from_millis(config.crawl_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    PostForm,
}

/// One outbound request. Query pairs are appended to `url`; form pairs are
/// sent as an urlencoded body for [`FetchMethod::PostForm`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl FetchRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.into(),
            query: Vec::new(),
            form: Vec::new(),
        }
    }

    #[must_use]
    pub fn post_form(url: impl Into<String>) -> Self {
        Self {
            method: FetchMethod::PostForm,
            ..Self::get(url)
        }
    }

    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    #[must_use]
    pub fn form_field(mut self, key: &str, value: impl ToString) -> Self {
        self.form.push((key.to_owned(), value.to_string()));
        self
    }

    /// Builds the final URL with the query pairs applied.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `url` does not parse.
    pub fn resolved_url(&self) -> Result<Url, TransportError> {
        let mut url = Url::parse(&self.url).map_err(|e| TransportError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

/// HTTP client shared by every source.
///
/// Each [`send`](Self::send) makes up to `max_attempts` attempts with
/// exponential backoff between failures, then sleeps `crawl_delay` once the
/// exchange has succeeded. Callers await requests one at a time so the throttle
/// bounds the load placed on each upstream site.
pub struct PromoClient {
    client: Client,
    max_attempts: u32,
    backoff_base_secs: u64,
    crawl_delay: Duration,
}

impl PromoClient {
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] if the underlying
    /// `reqwest::Client` cannot be constructed (e.g., invalid TLS config).
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(TransportError::ClientBuild)?;
        Ok(Self {
            client,
            max_attempts: settings.max_attempts,
            backoff_base_secs: settings.backoff_base_secs,
            crawl_delay: settings.crawl_delay,
        })
    }

    /// # Errors
    ///
    /// See [`PromoClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, TransportError> {
        Self::new(&TransportSettings::from_config(config))
    }

    /// Performs `request` with retries and returns the decoded body.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidUrl`] if the URL does not parse (not retried).
    /// - [`TransportError::Timeout`] if the last attempt timed out.
    /// - [`TransportError::HttpStatus`] if the last attempt returned non-2xx.
    /// - [`TransportError::ConnectionFailed`] for any other network failure.
    pub async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let url = request.resolved_url()?;

        let response = retry_with_backoff(self.max_attempts, self.backoff_base_secs, || {
            let url = url.clone();
            async move { self.attempt(request.method, url, &request.form).await }
        })
        .await?;

        tracing::debug!(
            url = %response.url,
            status = response.status,
            bytes = response.body.len(),
            "fetched"
        );
        if !self.crawl_delay.is_zero() {
            tokio::time::sleep(self.crawl_delay).await;
        }
        Ok(response)
    }

    async fn attempt(
        &self,
        method: FetchMethod,
        url: Url,
        form: &[(String, String)],
    ) -> Result<FetchResponse, TransportError> {
        let url_text = url.to_string();
        let builder = match method {
            FetchMethod::Get => self.client.get(url),
            FetchMethod::PostForm => self.client.post(url).form(form),
        };

        let response = builder
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "ko-KR,ko;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| classify(&url_text, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                url: url_text,
            });
        }

        let body = response.text().await.map_err(|e| classify(&url_text, e))?;
        Ok(FetchResponse {
            status: status.as_u16(),
            url: url_text,
            body,
        })
    }
}

fn classify(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            url: url.to_owned(),
        }
    } else {
        TransportError::ConnectionFailed {
            url: url.to_owned(),
            source: err,
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
