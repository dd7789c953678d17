//! HTTP client adapter for the platform API.
//!
//! Every call goes through [`ApiTransport::request`], which never fails at
//! the type level: HTTP and network failures come back as an [`ApiError`]
//! inside the [`ApiResponse`], together with whatever rate-limit headers
//! the response carried.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bidscope_core::RateLimitSnapshot;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{ApiError, ApiErrorCode, FetchError};

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default credential header name.
pub const DEFAULT_CREDENTIAL_HEADER: &str = "freelancer-oauth-v1";

/// User agent string for Bidscope.
const USER_AGENT: &str = concat!("bidscope/", env!("CARGO_PKG_VERSION"));

const RATE_LIMIT_LIMIT: &str = "ratelimit-limit";
const RATE_LIMIT_REMAINING: &str = "ratelimit-remaining";

// ============================================================================
// Request / Response
// ============================================================================

/// HTTP method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    /// GET.
    #[default]
    Get,
    /// POST with a form-encoded body.
    Post,
}

/// A request against the API, relative to the configured base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    /// Method.
    pub method: Method,
    /// Path below the base URL, e.g. `/projects/0.1/projects/`.
    pub path: String,
    /// Query parameters, repeated keys allowed.
    pub query: Vec<(String, String)>,
    /// Form body for POST.
    pub form: Vec<(String, String)>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            ..Self::default()
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Adds a form field.
    #[must_use]
    pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.form.push((key.into(), value.to_string()));
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Uniform response from the adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    /// Parsed body on success.
    pub data: Option<Value>,
    /// Rate-limit headers.
    pub rate_limits: RateLimitSnapshot,
    /// Failure, if any.
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Successful response.
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Failed response.
    pub fn failed(error: ApiError) -> Self {
        let rate_limits = if error.is_rate_limited() {
            RateLimitSnapshot::limited(None)
        } else {
            RateLimitSnapshot::default()
        };
        Self {
            data: None,
            rate_limits,
            error: Some(error),
        }
    }

    /// Returns the body or the error.
    pub fn into_result(self) -> Result<Value, ApiError> {
        match (self.error, self.data) {
            (Some(err), _) => Err(err),
            (None, Some(data)) => Ok(data),
            (None, None) => Ok(Value::Null),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Something that can execute API requests.
///
/// [`HttpClient`] is the production implementation; tests substitute an
/// in-memory double.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Executes a request. Failures are reported in [`ApiResponse::error`].
    async fn request(&self, request: &ApiRequest) -> ApiResponse;
}

/// Opaque API token. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// reqwest-backed transport that injects the credential header.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    base_url: Url,
    credential_header: HeaderName,
    credential: HeaderValue,
}

impl HttpClient {
    /// Creates a client with the default header name and timeout.
    pub fn new(base_url: &str, credential: &Credential) -> Result<Self, FetchError> {
        Self::builder(base_url, credential).build()
    }

    /// Creates a builder.
    pub fn builder<'a>(base_url: &'a str, credential: &'a Credential) -> HttpClientBuilder<'a> {
        HttpClientBuilder {
            base_url,
            credential,
            credential_header: DEFAULT_CREDENTIAL_HEADER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| ApiError::new(ApiErrorCode::InvalidResponse, format!("bad URL: {e}")))
    }

    fn headers_for(&self, request: &ApiRequest) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "Skipping invalid header"),
            }
        }
        // Inserted last so callers cannot replace it.
        headers.insert(self.credential_header.clone(), self.credential.clone());
        headers
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("credential_header", &self.credential_header)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ApiTransport for HttpClient {
    #[instrument(skip(self, request), fields(method = ?request.method, path = %request.path))]
    async fn request(&self, request: &ApiRequest) -> ApiResponse {
        let url = match self.url_for(&request.path) {
            Ok(url) => url,
            Err(e) => return ApiResponse::failed(e),
        };

        let mut builder = match request.method {
            Method::Get => self.inner.get(url),
            Method::Post => self.inner.post(url).form(&request.form),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = builder.headers(self.headers_for(request));

        debug!("Sending request");
        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Request failed");
                return ApiResponse::failed(ApiError::network(e.to_string()));
            }
        };

        let status = response.status();
        let mut rate_limits = rate_limits_from_headers(response.headers());
        debug!(status = %status, remaining = %rate_limits.remaining, "Response received");

        if status == StatusCode::TOO_MANY_REQUESTS {
            rate_limits.is_rate_limited = true;
            rate_limits.remaining = "0".to_string();
            return ApiResponse {
                data: None,
                rate_limits,
                error: Some(ApiError::rate_limited()),
            };
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return ApiResponse {
                    data: None,
                    rate_limits,
                    error: Some(ApiError::network(e.to_string())),
                };
            }
        };

        if !status.is_success() {
            return ApiResponse {
                data: None,
                rate_limits,
                error: Some(error_from_body(status.as_u16(), content_type.as_deref(), &body)),
            };
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(data) => ApiResponse {
                data: Some(data),
                rate_limits,
                error: None,
            },
            Err(e) => ApiResponse {
                data: None,
                rate_limits,
                error: Some(ApiError {
                    status: Some(status.as_u16()),
                    ..ApiError::new(ApiErrorCode::InvalidResponse, e.to_string())
                }),
            },
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder<'a> {
    base_url: &'a str,
    credential: &'a Credential,
    credential_header: String,
    timeout: Duration,
}

impl HttpClientBuilder<'_> {
    /// Sets the credential header name.
    #[must_use]
    pub fn credential_header(mut self, name: impl Into<String>) -> Self {
        self.credential_header = name.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<HttpClient, FetchError> {
        let base_url = Url::parse(self.base_url)
            .map_err(|e| FetchError::InvalidConfig(format!("api_base_url: {e}")))?;
        let credential_header = HeaderName::from_bytes(self.credential_header.as_bytes())
            .map_err(|e| FetchError::InvalidConfig(format!("credential_header: {e}")))?;
        let mut credential = HeaderValue::from_str(self.credential.expose())
            .map_err(|_| FetchError::InvalidConfig("token contains invalid characters".into()))?;
        credential.set_sensitive(true);

        let inner = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(HttpClient {
            inner,
            base_url,
            credential_header,
            credential,
        })
    }
}

// ============================================================================
// Response Decoding
// ============================================================================

/// Reads `RateLimit-Limit` and `RateLimit-Remaining`, defaulting to `N/A`.
pub fn rate_limits_from_headers(headers: &HeaderMap) -> RateLimitSnapshot {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let mut snapshot = RateLimitSnapshot::default();
    if let Some(limit) = read(RATE_LIMIT_LIMIT) {
        snapshot.limit = limit;
    }
    if let Some(remaining) = read(RATE_LIMIT_REMAINING) {
        snapshot.remaining = remaining;
    }
    snapshot
}

/// Builds an [`ApiError`] from a non-2xx response body.
///
/// JSON bodies contribute `message`, `error_code` and `request_id`; text
/// bodies are used as the message. Without either the message is
/// `HTTP_<status>`.
pub fn error_from_body(status: u16, content_type: Option<&str>, body: &str) -> ApiError {
    let is_json = content_type.is_some_and(|ct| ct.contains("json"));
    let json = if is_json {
        serde_json::from_str::<Value>(body).ok()
    } else {
        None
    };

    let field = |key: &str| {
        json.as_ref()
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let fallback = format!("HTTP_{status}");
    let message = field("message")
        .or_else(|| field("error"))
        .or_else(|| {
            let text = body.trim();
            (json.is_none() && !text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or(fallback);

    let code = field("error_code").map_or(ApiErrorCode::Http(status), ApiErrorCode::Upstream);

    ApiError {
        message,
        status: Some(status),
        code,
        request_id: field("request_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("ratelimit-limit", HeaderValue::from_static("100"));
        headers.insert("ratelimit-remaining", HeaderValue::from_static("42"));

        let snapshot = rate_limits_from_headers(&headers);
        assert_eq!(snapshot.limit, "100");
        assert_eq!(snapshot.remaining, "42");
        assert!(!snapshot.is_rate_limited);

        let empty = rate_limits_from_headers(&HeaderMap::new());
        assert_eq!(empty.limit, "N/A");
    }

    #[test]
    fn test_error_from_json_body() {
        let body = r#"{"status":"error","message":"Project is closed","error_code":"ProjectExceptionCodes.CLOSED","request_id":"abc"}"#;
        let err = error_from_body(400, Some("application/json"), body);

        assert_eq!(err.message, "Project is closed");
        assert_eq!(err.status, Some(400));
        assert_eq!(err.code, ApiErrorCode::Upstream("ProjectExceptionCodes.CLOSED".into()));
        assert_eq!(err.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_error_from_text_and_empty_body() {
        let err = error_from_body(502, Some("text/html"), "Bad Gateway");
        assert_eq!(err.message, "Bad Gateway");
        assert_eq!(err.code, ApiErrorCode::Http(502));

        let err = error_from_body(500, None, "  ");
        assert_eq!(err.message, "HTTP_500");

        let err = error_from_body(404, Some("application/json"), "{}");
        assert_eq!(err.message, "HTTP_404");
    }

    #[test]
    fn test_credential_header_cannot_be_overridden() {
        let credential = Credential::new("secret");
        let client = HttpClient::new("https://example.test/api", &credential).unwrap();
        let request = ApiRequest::get("/x")
            .header(DEFAULT_CREDENTIAL_HEADER, "spoofed")
            .header("Content-Type", "text/plain");

        let headers = client.headers_for(&request);
        assert_eq!(headers.get(DEFAULT_CREDENTIAL_HEADER).unwrap(), "secret");
        assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    }

    // ------------------------------------------------------------------------
    // Request-level tests against a one-shot local server
    // ------------------------------------------------------------------------

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers a single request with `response`, then keeps the socket open
    /// for `hold` before closing it.
    async fn serve_once(response: String, hold: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                if n == 0 {
                    break;
                }
                read += n;
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            tokio::time::sleep(hold).await;
        });
        format!("http://{addr}")
    }

    fn json_response(status: &str, headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn test_request_reads_rate_limit_headers() {
        let response = json_response(
            "200 OK",
            "RateLimit-Limit: 100\r\nRateLimit-Remaining: 99\r\n",
            r#"{"status":"success","result":{"id":7}}"#,
        );
        let base = serve_once(response, Duration::ZERO).await;
        let client = HttpClient::new(&base, &Credential::new("t")).unwrap();

        let response = client.request(&ApiRequest::get("/users/0.1/self/")).await;
        assert!(response.error.is_none());
        assert_eq!(response.data.unwrap()["result"]["id"], 7);
        assert_eq!(response.rate_limits.limit, "100");
        assert_eq!(response.rate_limits.remaining, "99");
        assert!(!response.rate_limits.is_rate_limited);
    }

    #[tokio::test]
    async fn test_request_rate_limited_without_reading_body() {
        // The body never arrives; reading it would run into the timeout.
        let response = "HTTP/1.1 429 Too Many Requests\r\nRateLimit-Limit: 100\r\nContent-Length: 1000\r\n\r\n".to_string();
        let base = serve_once(response, Duration::from_secs(30)).await;
        let client = HttpClient::builder(&base, &Credential::new("t"))
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        let response = client.request(&ApiRequest::get("/projects/0.1/projects/")).await;
        let err = response.error.unwrap();
        assert_eq!(err.code, ApiErrorCode::RateLimited);
        assert_eq!(err.status, Some(429));
        assert!(response.data.is_none());
        assert!(response.rate_limits.is_rate_limited);
        assert_eq!(response.rate_limits.limit, "100");
        assert_eq!(response.rate_limits.remaining, "0");
    }

    #[tokio::test]
    async fn test_request_server_error_uses_json_message() {
        let response = json_response(
            "500 Internal Server Error",
            "",
            r#"{"status":"error","message":"Internal failure","request_id":"r-1"}"#,
        );
        let base = serve_once(response, Duration::ZERO).await;
        let client = HttpClient::new(&base, &Credential::new("t")).unwrap();

        let response = client.request(&ApiRequest::get("/messages/0.1/threads/")).await;
        let err = response.error.unwrap();
        assert_eq!(err.message, "Internal failure");
        assert_eq!(err.status, Some(500));
        assert_eq!(err.code, ApiErrorCode::Http(500));
        assert_eq!(err.request_id.as_deref(), Some("r-1"));
        assert!(response.data.is_none());
        assert_eq!(response.rate_limits.limit, "N/A");
    }

    #[tokio::test]
    async fn test_request_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HttpClient::new(&format!("http://{addr}"), &Credential::new("t")).unwrap();

        let response = client.request(&ApiRequest::get("/users/0.1/self/")).await;
        let err = response.error.unwrap();
        assert_eq!(err.code, ApiErrorCode::NetworkError);
        assert_eq!(err.status, None);
        assert!(response.data.is_none());
        assert!(!response.rate_limits.is_rate_limited);
    }

    #[test]
    fn test_url_join() {
        let credential = Credential::new("t");
        let client = HttpClient::new("https://example.test/api/", &credential).unwrap();
        let url = client.url_for("/users/0.1/self/").unwrap();
        assert_eq!(url.as_str(), "https://example.test/api/users/0.1/self/");
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("secret");
        assert!(!format!("{credential:?}").contains("secret"));
    }

    #[test]
    fn test_failed_rate_limited_response() {
        let response = ApiResponse::failed(ApiError::rate_limited());
        assert!(response.rate_limits.is_rate_limited);
        assert_eq!(response.rate_limits.remaining, "0");
        assert!(response.into_result().is_err());
    }
}
