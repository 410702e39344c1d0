// GitHub GraphQL HTTP client.
// Handles authentication, rate limiting, and request/response processing.

use async_trait::async_trait;
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Result, StatError};

use super::transport::{Query, Transport};
use super::types::{GraphQlResponse, RateLimit};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// GitHub GraphQL client with authentication and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    endpoint: String,
    rate_limit: RateLimit,
}

impl GitHubClient {
    /// Create a new GitHub client with the given token.
    pub fn new(token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| StatError::Other(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("ghtally"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(StatError::Api)?;

        Ok(Self {
            client,
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
            rate_limit: RateLimit::default(),
        })
    }

    /// Create a client from ACCESS_TOKEN, falling back to GITHUB_TOKEN.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("ACCESS_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .map_err(|_| StatError::MissingToken)?;
        Self::new(&token)
    }

    /// Point the client at a different GraphQL endpoint (GitHub Enterprise).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Get the current rate limit information.
    pub fn rate_limit(&self) -> &RateLimit {
        &self.rate_limit
    }

    /// Update rate limit from response headers.
    ///
    /// `remaining` and `retry_after` describe only the latest response.
    fn update_rate_limit(&mut self, headers: &HeaderMap) {
        let header = |name: &str| -> Option<u64> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        if let Some(limit) = header("x-ratelimit-limit") {
            self.rate_limit.limit = limit;
        }
        self.rate_limit.remaining = header("x-ratelimit-remaining");
        if let Some(reset) = header("x-ratelimit-reset") {
            self.rate_limit.reset = reset;
        }
        self.rate_limit.retry_after = header("retry-after");
    }

    fn rate_limited(&self) -> StatError {
        StatError::RateLimited {
            reset_at: self.rate_limit.reset_display(),
        }
    }

    /// Check response status and convert errors.
    async fn check_response(&self, query: &Query, response: Response) -> Result<Response> {
        match response.status() {
            StatusCode::OK => Ok(response),
            StatusCode::UNAUTHORIZED => Err(StatError::Unauthorized),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                // Secondary (anti-abuse) limits send retry-after instead of draining the quota
                if self.rate_limit.is_exhausted() {
                    Err(self.rate_limited())
                } else {
                    Err(StatError::GraphQl {
                        query: query.name(),
                        message: format!(
                            "Forbidden: {}",
                            response.text().await.unwrap_or_default()
                        ),
                    })
                }
            }
            status => Err(StatError::GraphQl {
                query: query.name(),
                message: format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                ),
            }),
        }
    }

    /// Unwrap the GraphQL envelope, classifying reported errors.
    fn into_data(&self, query: &Query, envelope: GraphQlResponse) -> Result<Value> {
        if envelope.errors.iter().any(|e| e.is_rate_limited()) {
            return Err(self.rate_limited());
        }

        let message = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        match envelope.data {
            Some(data) if !data.is_null() => {
                if !message.is_empty() {
                    warn!(query = query.name(), "GraphQL returned partial data: {}", message);
                }
                Ok(data)
            }
            _ => Err(StatError::GraphQl {
                query: query.name(),
                message: if message.is_empty() {
                    "response carried no data".to_string()
                } else {
                    message
                },
            }),
        }
    }
}

#[async_trait(?Send)]
impl Transport for GitHubClient {
    async fn execute(&mut self, query: &Query, variables: Value) -> Result<Value> {
        debug!(query = query.name(), %variables, "POST {}", self.endpoint);
        let body = json!({ "query": query.text, "variables": variables });
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(StatError::Api)?;

        self.update_rate_limit(response.headers());
        let response = self.check_response(query, response).await?;
        let envelope: GraphQlResponse = response.json().await?;
        self.into_data(query, envelope)
    }
}
