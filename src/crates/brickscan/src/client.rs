//! Shared HTTP client for the recognition and price-guide endpoints.
//!
//! Requests are sent once. The only retry in the system is the recognition
//! fallback, which lives in [`crate::recognition`].

use crate::error::{BrickscanError, Result};
use reqwest::multipart::Form;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Request timeout. `None` leaves the transport default in place.
    pub timeout: Option<Duration>,

    /// User agent string.
    pub user_agent: Option<String>,

    /// Headers added to every request.
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Add a default header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((key.into(), value.into()));
        self
    }
}

/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: ClientConfig,
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }

        let client = builder
            .build()
            .map_err(|e| BrickscanError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Send a GET request with query parameters.
    pub async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let req = self.client.get(url).query(query);
        self.send(req).await
    }

    /// Send a multipart POST request.
    pub async fn post_multipart(&self, url: &str, form: Form) -> Result<Response> {
        let req = self.client.post(url).multipart(form);
        self.send(req).await
    }

    async fn send(&self, mut req: RequestBuilder) -> Result<Response> {
        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        Ok(req.send().await?)
    }
}

/// Read a response body, failing on non-2xx status with the body attached.
pub async fn success_body(response: Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(BrickscanError::Decode(format!("status {}: {}", status, body)));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(15))
            .with_user_agent("brickscan-test/1.0")
            .with_header("X-Client", "cli");

        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
        assert_eq!(config.user_agent.as_deref(), Some("brickscan-test/1.0"));
        assert_eq!(config.default_headers.len(), 1);
    }

    #[test]
    fn test_client_config_default_has_no_timeout() {
        let config = ClientConfig::default();
        assert!(config.timeout.is_none());
        assert!(config.user_agent.is_none());
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(ClientConfig::new().with_user_agent("brickscan-test"));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_error() {
        let client = HttpClient::new(ClientConfig::new()).unwrap();
        let result = client.get("not-a-valid-url", &[]).await;
        assert!(result.is_err());
    }
}
