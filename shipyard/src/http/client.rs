//! HTTP client for the Shipyard API

use reqwest::{header, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use shipyard_api::{HistoryResponse, SubmitJobRequest, TAIL_FROM_LATEST};
use tracing::{debug, error};
use url::Url;

use crate::errors::ShipyardError;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for a Shipyard server
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    ///
    /// No overall request timeout is set because tail responses never end.
    pub fn new(base_url: &str, api_key: Option<SecretString>) -> Result<Self, ShipyardError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ShipyardError::ConfigError(format!("Invalid base URL {}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ShipyardError::ConfigError(format!(
                "Unsupported scheme in base URL: {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.expose_secret()),
            None => request,
        }
    }

    async fn check(method: &str, response: Response) -> Result<Response, ShipyardError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!("HTTP {} failed: {} - {}", method, status, body);
        Err(ShipyardError::ApiError {
            status: status.as_u16(),
            body,
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ShipyardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let body = Self::check("GET", response).await?.json().await?;
        Ok(body)
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ShipyardError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(&url).json(body))
            .send()
            .await?;
        let body = Self::check("POST", response).await?.json().await?;
        Ok(body)
    }

    /// Submit a filesystem job
    pub async fn submit_job(
        &self,
        request: &SubmitJobRequest,
    ) -> Result<serde_json::Value, ShipyardError> {
        self.post("/api/jobs", request).await
    }

    /// Bounded log history of a job
    pub async fn history(&self, job_id: &str) -> Result<HistoryResponse, ShipyardError> {
        self.get(&format!("/api/jobs/{}/logs", job_id)).await
    }

    /// Open a tail response; the body is an event stream
    pub async fn open_tail(
        &self,
        job_id: &str,
        from: Option<&str>,
    ) -> Result<Response, ShipyardError> {
        let url = format!("{}/api/jobs/{}/logs/tail", self.base_url, job_id);
        let from = from.unwrap_or(TAIL_FROM_LATEST);
        debug!("GET {} from {}", url, from);

        let request = self
            .client
            .get(&url)
            .query(&[("from", from)])
            .header(header::ACCEPT, "text/event-stream");
        let response = self.authorize(request).send().await?;
        Self::check("GET", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_base_url() {
        let client = HttpClient::new("http://localhost:3000/", None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");

        assert!(HttpClient::new("localhost:3000", None).is_err());
        assert!(HttpClient::new("ftp://builds.example.com", None).is_err());
    }
}
