//! Shared HTTP client for the commons services and Elasticsearch
//!
//! Every production collaborator talks HTTP through [`HttpClient`]: one reqwest
//! client with the configured timeout and TLS policy, an optional bearer token and
//! retry with exponential backoff.

use crate::config::{CommonsConfig, ElasticConfig, RetryConfig, SecretString};
use crate::domain::{EtlError, Result, StoreError, StoreKind};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use std::time::Duration;

/// HTTP client bound to one base URL
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    client: Client,
    token: Option<SecretString>,
    retry: RetryConfig,
}

impl HttpClient {
    /// Builds a client
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::Configuration`] if the underlying client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout_seconds: u64,
        tls_verify: bool,
        token: Option<SecretString>,
        retry: RetryConfig,
    ) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !tls_verify {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| EtlError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            token,
            retry,
        })
    }

    /// Client for the commons services, authenticated with the access token
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn for_commons(config: &CommonsConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.timeout_seconds,
            config.tls_verify,
            config.access_token.clone(),
            config.retry.clone(),
        )
    }

    /// Client for Elasticsearch (no token)
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn for_elastic(config: &ElasticConfig) -> Result<Self> {
        Self::new(
            &config.url,
            config.request_timeout_seconds,
            true,
            None,
            config.retry.clone(),
        )
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of `path` under the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request against the base URL, with the bearer token if one is configured
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => request.header("Authorization", token.expose_secret().bearer()),
            None => request,
        }
    }

    /// Request against an absolute URL (signed URLs), without credentials
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Retry a request with exponential backoff
    ///
    /// Only connection failures and server-side statuses are retried; any other
    /// error is returned immediately.
    pub async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries || !is_retryable(&e) {
                        return Err(e);
                    }

                    let delay_ms = (self.retry.initial_delay_ms as f64
                        * self.retry.backoff_multiplier.powf((attempt - 1) as f64))
                        as u64;
                    let delay_ms = delay_ms.min(self.retry.max_delay_ms);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying request after error"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

/// Whether a failed request is worth another attempt
pub fn is_retryable(err: &EtlError) -> bool {
    matches!(
        err,
        EtlError::Store(StoreError::Connection { .. })
            | EtlError::Store(StoreError::UnexpectedStatus { status: 500..=599, .. })
    )
}

/// Maps a transport failure to a store connection error
pub fn connection_error(store: StoreKind, err: reqwest::Error) -> EtlError {
    EtlError::Store(StoreError::Connection {
        store,
        message: err.to_string(),
    })
}

/// Passes successful responses through; anything else becomes
/// [`StoreError::UnexpectedStatus`] carrying the response body
///
/// # Errors
///
/// Returns an error for any non-2xx status.
pub async fn check_status(store: StoreKind, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EtlError::Store(StoreError::UnexpectedStatus {
        store,
        status: status.as_u16(),
        message: body,
    }))
}

/// Decodes a JSON response body
///
/// # Errors
///
/// Returns [`StoreError::ReadFailed`] if the body is not the expected JSON.
pub async fn read_json<T: serde::de::DeserializeOwned>(
    store: StoreKind,
    response: Response,
) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::read(store, format!("invalid response body: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://localhost:9200/", 5, true, None, fast_retry()).unwrap();
        assert_eq!(client.url("/_bulk"), "http://localhost:9200/_bulk");
        assert_eq!(client.url("fhir/_count"), "http://localhost:9200/fhir/_count");
    }

    #[test]
    fn test_retryable_classification() {
        let conn = EtlError::Store(StoreError::Connection {
            store: StoreKind::Search,
            message: "refused".into(),
        });
        let server = EtlError::Store(StoreError::UnexpectedStatus {
            store: StoreKind::Graph,
            status: 503,
            message: String::new(),
        });
        let client = EtlError::Store(StoreError::UnexpectedStatus {
            store: StoreKind::Graph,
            status: 404,
            message: String::new(),
        });
        assert!(is_retryable(&conn));
        assert!(is_retryable(&server));
        assert!(!is_retryable(&client));
        assert!(!is_retryable(&EtlError::Download("x".into())));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let client = HttpClient::new("http://localhost", 5, true, None, fast_retry()).unwrap();
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = client
            .retry_request(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(EtlError::Store(StoreError::Connection {
                    store: StoreKind::Search,
                    message: "refused".into(),
                }))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_client_error() {
        let client = HttpClient::new("http://localhost", 5, true, None, fast_retry()).unwrap();
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = client
            .retry_request(|| async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(EtlError::Store(StoreError::write(StoreKind::Graph, "rejected")))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
