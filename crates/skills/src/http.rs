//! Injected HTTP capability.
//!
//! Fetch code only talks to [`HttpClient`]; the per-call timeout and
//! cancellation live in [`HttpFetcher`] so they hold for every implementation,
//! including test doubles.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    reqwest::header::USER_AGENT,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{
    config::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_USER_AGENT, SkillsConfig},
    error::{Error, Result},
};

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request. Transport failures are errors; any HTTP status
    /// is a successful response.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// [`HttpClient`] backed by `reqwest`, sending a fixed User-Agent.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestHttpClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &SkillsConfig) -> Self {
        Self::new(config.user_agent.clone())
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::transport(url, e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| Error::transport(url, e))?;
        Ok(HttpResponse { status, body })
    }
}

/// An [`HttpClient`] with the per-call timeout and cancellation applied.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(client: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn with_default_timeout(client: Arc<dyn HttpClient>) -> Self {
        Self::new(client, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// GET `url`, returning whatever status the server sent.
    pub async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse> {
        debug!(%url, "GET");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout(self.timeout, self.client.get(url)) => match res {
                Ok(resp) => resp,
                Err(_) => Err(Error::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }),
            },
        }
    }

    /// GET `url` and return the body; anything but HTTP 200 is an error.
    pub async fn get_text(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let resp = self.get(url, cancel).await?;
        if !resp.is_ok() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: resp.status,
            });
        }
        Ok(resp.body)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl HttpClient for Stalled {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn sends_user_agent_and_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc")
            .match_header("user-agent", "test-agent/1.0")
            .with_status(200)
            .with_body("hello")
            .create_async()
            .await;

        let fetcher = HttpFetcher::with_default_timeout(Arc::new(ReqwestHttpClient::new(
            "test-agent/1.0",
        )));
        let body = fetcher
            .get_text(&format!("{}/doc", server.url()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(body, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_200_is_an_error_with_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::with_default_timeout(Arc::new(ReqwestHttpClient::default()));
        let url = format!("{}/missing", server.url());
        let err = fetcher
            .get_text(&url, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
        assert!(err.to_string().contains(&url));
    }

    #[tokio::test]
    async fn stalled_request_times_out() {
        let fetcher = HttpFetcher::new(Arc::new(Stalled), Duration::from_millis(20));
        let err = fetcher
            .get("https://example.com/x", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_request() {
        let fetcher = HttpFetcher::with_default_timeout(Arc::new(Stalled));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let err = fetcher
            .get("https://example.com/x", &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
