//! Platform API client

use super::url::ServerUrl;
use crate::error::{ApiError, CliError, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-ni-api-key";

/// What to do with a non-2xx response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorHandling {
    /// Turn it into `CliError::Api`
    Raise,
    /// Hand the response back for the caller to interpret
    Passthrough,
}

/// Platform API client with the API key attached to every request
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    server: ServerUrl,
}

impl ApiClient {
    /// Create a new client for the given server and API key
    pub fn new(server_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let server = ServerUrl::parse(server_url)?;

        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| CliError::invalid("API key contains invalid characters"))?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("slcli/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { client, server })
    }

    /// Perform a request and return the raw response
    ///
    /// With `ErrorHandling::Raise`, non-2xx responses become `CliError::Api`
    /// carrying the status, platform error code and body.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        handling: ErrorHandling,
    ) -> Result<Response> {
        let url = self.server.endpoint(path)?;
        tracing::debug!(%method, %url, "sending request");

        let mut request = self.client.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        tracing::debug!(%method, path, status = %response.status(), "received response");
        Self::check(response, handling).await
    }

    async fn check(response: Response, handling: ErrorHandling) -> Result<Response> {
        if response.status().is_success() || handling == ErrorHandling::Passthrough {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_body(status, body).into())
    }

    /// Perform a request and decode the JSON body (`null` for an empty body)
    pub async fn json(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let response = self
            .execute(method, path, query, body, ErrorHandling::Raise)
            .await?;
        read_json(response).await
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.json(Method::GET, path, query, None).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.json(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.json(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Value> {
        self.json(Method::PATCH, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, &[], None, ErrorHandling::Raise)
            .await?;
        Ok(())
    }

    /// Upload a multipart form and decode the JSON reply
    pub async fn post_multipart(
        &self,
        path: &str,
        query: &[(&str, String)],
        form: Form,
    ) -> Result<Value> {
        let url = self.server.endpoint(path)?;
        tracing::debug!(%url, "uploading multipart form");

        let response = self
            .client
            .post(url)
            .query(query)
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response, ErrorHandling::Raise).await?;
        read_json(response).await
    }

    /// Fetch a binary payload
    pub async fn download(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .execute(Method::GET, path, &[], None, ErrorHandling::Raise)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Decode a response body as JSON, treating an empty body as `null`
pub async fn read_json(response: Response) -> Result<Value> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
