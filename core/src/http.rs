//! HTTP plain-data types and the transport seam.
//!
//! # Design
//! The client builds `HttpRequest` values and interprets `HttpResponse`
//! values; moving bytes over the network is the job of a `Transport`. The
//! default `UreqTransport` wraps a blocking `ureq` agent, and callers can
//! inject their own implementation for pooling, proxies, or tests.
//!
//! A transport hands back every status code as data. Only failures that
//! produce no response at all become `ApiError::Transport`. The response body
//! is read to the end before `execute` returns, so the underlying connection
//! is released exactly once on every path. Bodies that are not valid UTF-8
//! are decoded lossily so the status code still reaches the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;

/// Upper bound on a response body read by `UreqTransport`.
pub const MAX_BODY_BYTES: u64 = 1 << 30;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data, body already drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes one request/response exchange.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a pooled `ureq` agent.
///
/// Redirects are not followed and 4xx/5xx statuses are returned as data, so
/// the client alone decides what counts as failure.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Applies `timeout` to the whole exchange, connect through body read.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Wraps an agent configured by the caller. The agent should have
    /// `http_status_as_error(false)`, otherwise error statuses surface as
    /// transport failures with status 0.
    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => {
                with_headers(self.agent.post(url), &request.headers).send_empty()
            }
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_are_uppercase() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::Put.as_str(), "PUT");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/templates".to_string(),
            headers: vec![("X-SWU-API-CLIENT".to_string(), "rust".to_string())],
            body: None,
        };
        assert_eq!(req.header("x-swu-api-client"), Some("rust"));
        assert_eq!(req.header("authorization"), None);
    }

    /// Serves one canned raw HTTP response on a random port.
    fn serve_once(status_line: &str, body: Vec<u8>) -> String {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let head = format!(
            "{status_line}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{addr}")
    }

    fn get(base: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{base}/templates"),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn non_utf8_error_body_keeps_status() {
        let url = serve_once("HTTP/1.1 500 Internal Server Error", b"ab\xff\xfe".to_vec());
        let response = UreqTransport::new().execute(&get(url)).unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, "ab\u{fffd}\u{fffd}");
    }

    #[test]
    fn client_reports_status_of_non_utf8_error_body() {
        let base = serve_once("HTTP/1.1 500 Internal Server Error", b"ab\xff\xfe".to_vec());
        let client = crate::SwuClient::with_transport("test_key", &base, UreqTransport::new());
        let err = client.list_templates().unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn body_larger_than_ten_mib_is_read_fully() {
        let size = 11 * 1024 * 1024;
        let url = serve_once("HTTP/1.1 200 OK", vec![b'a'; size]);
        let response = UreqTransport::new().execute(&get(url)).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.len(), size);
    }

    #[test]
    fn unreachable_host_maps_to_transport_error() {
        // Bind then drop so the port is known to be closed.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let transport = UreqTransport::with_timeout(Some(Duration::from_secs(2)));
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: format!("http://{addr}/templates"),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(&req).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.status(), 0);
        assert!(!err.message().is_empty());
    }
}
