//! HTTP transport: URL construction, bearer signing and status handling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::envelope;
use super::ApiError;
use crate::auth::TokenRefresher;
use crate::config::Settings;
use crate::models::{AuthTokens, RefreshRequest};

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while bounding hangs against an unresponsive server.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Signed HTTP access to one API base URL.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl Transport {
    /// Create an unsigned transport for `base_url`.
    ///
    /// `allow_insecure` disables TLS certificate verification and is meant
    /// for local development instances only.
    pub fn new(base_url: &str, allow_insecure: bool) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url).map_err(|e| {
            ApiError::InvalidRequest(format!("invalid API base URL '{}': {}", base_url, e))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "API base URL '{}' cannot carry a path",
                base_url
            )));
        }

        if allow_insecure {
            warn!(base_url, "TLS certificate verification is disabled");
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(allow_insecure)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
            token: None,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        Self::new(&settings.base_url, settings.allow_insecure)
    }

    /// Create a signed copy of this transport, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join `path` onto the base URL.
    ///
    /// Only the part before `?` goes through path joining; the query string
    /// is appended afterwards exactly as given, so pre-encoded values are
    /// not encoded a second time.
    pub fn build_url(&self, path: &str) -> String {
        let (path, query) = match path.find('?') {
            Some(idx) => path.split_at(idx),
            None => (path, ""),
        };

        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }

        let mut full: String = url.into();
        full.push_str(query);
        full
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("bearer token contains invalid characters".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.as_u16() < 400 {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(
            status = status.as_u16(),
            body = %ApiError::truncate_body(&body),
            "Request failed"
        );
        Err(ApiError::from_status(status, &body))
    }

    /// Perform one request and return the raw response body.
    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.build_url(path);
        debug!(method = %method, url = %url, signed = self.has_token(), "Sending request");

        let mut request = self.client.request(method, &url).headers(self.auth_headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Perform one request and decode the body through the envelope decoder.
    pub async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let raw = self.execute(method, path, body).await?;
        Ok(envelope::decode(&raw)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }
}

#[async_trait]
impl TokenRefresher for Transport {
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, ApiError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        self.post("/auth/refresh", &body).await
    }
}
