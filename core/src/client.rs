//! Blocking client for the sendwithus REST API.
//!
//! # Design
//! `SwuClient` holds the base URL, the API key and a `Transport`; none of it
//! changes after construction, so a client can be shared across threads when
//! its transport can. Every public operation funnels through one pipeline:
//!
//! 1. `build_request` attaches basic auth (API key as username, empty
//!    password), the client identifier header and an optional JSON body.
//! 2. The transport executes the exchange and drains the body.
//! 3. `check_status` turns any status of 300 or above into `ApiError::Http`
//!    carrying the raw body.
//! 4. `parse_json` decodes the body into the caller's result type, or the
//!    body is discarded for fire-and-forget endpoints.
//!
//! Failures are returned once, immediately; nothing is retried.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::types::{
    DripCampaign, Email, Log, LogEvent, LogQuery, LogResend, Template, Version,
};

/// Production endpoint of the API.
pub const DEFAULT_BASE_URL: &str = "https://api.sendwithus.com/api/v1";

/// Header identifying this library to the API.
pub const CLIENT_HEADER: &str = "X-SWU-API-CLIENT";

/// Value sent in `CLIENT_HEADER`.
pub const CLIENT_ID: &str = concat!("rust-", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the API key for `SwuClient::from_env`.
pub const API_KEY_ENV: &str = "SWU_API_KEY";

/// Environment variable overriding the base URL for `SwuClient::from_env`.
pub const API_URL_ENV: &str = "SWU_API_URL";

/// Client for the sendwithus API.
#[derive(Clone)]
pub struct SwuClient<T = UreqTransport> {
    base_url: String,
    api_key: String,
    transport: T,
}

impl<T> std::fmt::Debug for SwuClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwuClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Configures a `SwuClient` before construction.
#[derive(Debug, Clone)]
pub struct SwuClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Option<Duration>,
}

impl SwuClientBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Deadline for a whole exchange; only used by the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> SwuClient<UreqTransport> {
        let transport = UreqTransport::with_timeout(self.timeout);
        self.build_with_transport(transport)
    }

    pub fn build_with_transport<T: Transport>(self, transport: T) -> SwuClient<T> {
        SwuClient {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
            transport,
        }
    }
}

impl SwuClient<UreqTransport> {
    /// Client for the production endpoint using the default transport.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::builder(api_key).build()
    }

    pub fn builder(api_key: impl Into<String>) -> SwuClientBuilder {
        SwuClientBuilder {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    /// Reads `SWU_API_KEY` and, if set, `SWU_API_URL`.
    pub fn from_env() -> Result<Self, ApiError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::Config(format!("{API_KEY_ENV} is not set")))?;
        let mut builder = Self::builder(api_key);
        if let Ok(url) = std::env::var(API_URL_ENV) {
            builder = builder.base_url(url);
        }
        Ok(builder.build())
    }
}

impl<T: Transport> SwuClient<T> {
    /// Client against `base_url` over a caller-supplied transport.
    pub fn with_transport(api_key: impl Into<String>, base_url: &str, transport: T) -> Self {
        SwuClient::<UreqTransport>::builder(api_key)
            .base_url(base_url)
            .build_with_transport(transport)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Lists all templates.
    pub fn list_templates(&self) -> Result<Vec<Template>, ApiError> {
        self.list_emails()
    }

    /// Lists all emails; the API serves these from the templates collection.
    pub fn list_emails(&self) -> Result<Vec<Template>, ApiError> {
        self.request_json(HttpMethod::Get, "/templates", None)
    }

    pub fn get_template(&self, id: &str) -> Result<Template, ApiError> {
        self.request_json(HttpMethod::Get, &format!("/templates/{id}"), None)
    }

    pub fn get_template_version(&self, id: &str, version: &str) -> Result<Version, ApiError> {
        self.request_json(
            HttpMethod::Get,
            &format!("/templates/{id}/versions/{version}"),
            None,
        )
    }

    pub fn update_template_version(
        &self,
        id: &str,
        version: &str,
        template: &Version,
    ) -> Result<Version, ApiError> {
        let body = encode(template)?;
        self.request_json(
            HttpMethod::Put,
            &format!("/templates/{id}/versions/{version}"),
            Some(body),
        )
    }

    /// Creates a template whose first version is `template`.
    pub fn create_template(&self, template: &Version) -> Result<Template, ApiError> {
        let body = encode(template)?;
        self.request_json(HttpMethod::Post, "/templates", Some(body))
    }

    pub fn create_template_version(
        &self,
        id: &str,
        template: &Version,
    ) -> Result<Template, ApiError> {
        let body = encode(template)?;
        self.request_json(
            HttpMethod::Post,
            &format!("/templates/{id}/versions"),
            Some(body),
        )
    }

    pub fn send(&self, email: &Email) -> Result<(), ApiError> {
        let body = encode(email)?;
        self.request(HttpMethod::Post, "/send", Some(body))?;
        Ok(())
    }

    pub fn activate_drip_campaign(
        &self,
        id: &str,
        campaign: &DripCampaign,
    ) -> Result<(), ApiError> {
        let body = encode(campaign)?;
        self.request(
            HttpMethod::Post,
            &format!("/drip_campaigns/{id}/activate"),
            Some(body),
        )?;
        Ok(())
    }

    pub fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, ApiError> {
        let endpoint = format!("/logs?{}", query.to_query_string());
        self.request_json(HttpMethod::Get, &endpoint, None)
    }

    pub fn get_log(&self, id: &str) -> Result<Log, ApiError> {
        self.request_json(HttpMethod::Get, &format!("/logs/{id}"), None)
    }

    pub fn get_log_events(&self, id: &str) -> Result<LogEvent, ApiError> {
        self.request_json(HttpMethod::Get, &format!("/logs/{id}/events"), None)
    }

    /// Resends a logged email. The returned `id` is `id` unless the server
    /// names a different log.
    pub fn resend_log(&self, id: &str) -> Result<LogResend, ApiError> {
        let request = LogResend {
            id: id.to_string(),
            ..Default::default()
        };
        let body = encode(&request)?;
        let mut resend: LogResend = self.request_json(HttpMethod::Post, "/resend", Some(body))?;
        if resend.id.is_empty() {
            resend.id = request.id;
        }
        Ok(resend)
    }

    /// Builds the request for `endpoint` with auth and client headers.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> HttpRequest {
        let credentials = B64.encode(format!("{}:", self.api_key));
        let mut headers = vec![
            ("authorization".to_string(), format!("Basic {credentials}")),
            (CLIENT_HEADER.to_string(), CLIENT_ID.to_string()),
        ];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}{endpoint}", self.base_url),
            headers,
            body,
        }
    }

    /// Performs one exchange and applies the status policy.
    fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(method, endpoint, body);
        debug!(method = method.as_str(), url = %request.url, "sending request");

        let response = self.transport.execute(&request).map_err(|e| {
            warn!(method = method.as_str(), url = %request.url, error = %e, "transport failure");
            e
        })?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        check_status(response).map_err(|e| {
            warn!(method = method.as_str(), url = %request.url, status = e.status(), "request failed");
            e
        })
    }

    fn request_json<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<String>,
    ) -> Result<R, ApiError> {
        let response = self.request(method, endpoint, body)?;
        parse_json(&response)
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Any status of 300 or above fails, redirects included.
fn check_status(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.status >= 300 {
        return Err(ApiError::Http {
            status: response.status,
            body: response.body,
        });
    }
    Ok(response)
}

fn parse_json<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization {
        status: response.status,
        message: e.to_string(),
    })
}
