//! REST client

use crate::error::{RestError, RestResult};
use crate::route::Route;
use cord_common::RestConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use std::fmt;

/// How requests are authorized
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Bot token, sent as `Bot <token>`
    Bot(String),
    /// OAuth2 access token, sent as `Bearer <token>`
    Bearer(String),
}

impl Credentials {
    /// Value of the `Authorization` header
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Bot(token) => format!("Bot {token}"),
            Self::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bot(_) => f.write_str("Credentials::Bot(***)"),
            Self::Bearer(_) => f.write_str("Credentials::Bearer(***)"),
        }
    }
}

/// Client for the REST API
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_base: String,
    user_agent: String,
    credentials: Option<Credentials>,
}

impl RestClient {
    /// Unauthenticated client
    pub fn new(config: &RestConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.clone(),
            user_agent: config.user_agent.clone(),
            credentials: None,
        }
    }

    /// Client authorized as a bot
    pub fn bot(config: &RestConfig, token: impl Into<String>) -> Self {
        Self::new(config).with_credentials(Credentials::Bot(token.into()))
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Headers sent with every request
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        if let Some(credentials) = &self.credentials {
            match HeaderValue::from_str(&credentials.header_value()) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Token is not a valid header value, sending without it"),
            }
        }
        headers
    }

    /// Send `route` with an optional JSON body.
    ///
    /// Returns the decoded body on success, or `None` when it is empty
    /// (e.g. 204 No Content).
    ///
    /// # Errors
    /// - `Api` with the raw response text on a non-success status
    /// - `Http` when the request fails to complete
    /// - `Decode` when a success body is not JSON
    pub async fn request(&self, route: Route, body: Option<&Value>) -> RestResult<Option<Value>> {
        let url = route.url(&self.api_base);
        tracing::debug!(route = %route, "REST request");

        let mut request = self
            .http
            .request(route.method.clone(), &url)
            .headers(self.headers());
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(route = %route, status = status.as_u16(), "REST request failed");
            return Err(RestError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Like [`request`](Self::request), but an empty body is an error
    pub(crate) async fn request_value(&self, route: Route, body: Option<&Value>) -> RestResult<Value> {
        self.request(route, body).await?.ok_or(RestError::EmptyBody)
    }

    /// Like [`request`](Self::request), discarding any body
    pub(crate) async fn request_empty(&self, route: Route) -> RestResult<()> {
        self.request(route, None).await.map(|_| ())
    }
}
