//! JSON POST client used by the model backends.
//!
//! Each request runs as a series of attempts. An attempt either finishes
//! (decoded body or terminal error) or asks to be retried: network
//! failures, 429 and 5xx are retried within the budget, honouring
//! `Retry-After`. Credentials travel in headers marked sensitive, and
//! every log line goes through [`redact_headers`]. Set `PARLEY_HTTP_RAW=1`
//! to log a curl reproduction of each request plus the raw response.
//!
//! ```no_run
//! # async fn demo() -> Result<(), parley_http::HttpError> {
//! let client = parley_http::HttpClient::new("https://api.example.com/v1")?;
//! let body = serde_json::json!({ "q": "hello" });
//! let got: serde_json::Value = client
//!     .post_json_opts("items", &body, parley_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

const RAW_ENV: &str = "PARLEY_HTTP_RAW";
const RAW_LIMIT: usize = 64 * 1024;
const SNIPPET_LIMIT: usize = 500;
const REDACTED: &str = "<redacted>";

/// Header names whose values must never reach a log line.
const SECRET_HEADERS: &[&str] = &["authorization", "x-goog-api-key", "x-api-key"];

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

/// How a request authenticates.
///
/// ```
/// use parley_http::Auth;
///
/// let auth = Auth::api_key_header("x-goog-api-key", "k-123").unwrap();
/// match auth {
///     Auth::Header { name, value } => {
///         assert_eq!(name.as_str(), "x-goog-api-key");
///         assert!(value.is_sensitive());
///     }
///     Auth::None => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth {
    Header { name: HeaderName, value: HeaderValue },
    None,
}

impl Auth {
    /// Header credential from a pasted key. Quotes and whitespace are
    /// stripped; the value is marked sensitive.
    pub fn api_key_header(name: &'static str, raw_key: &str) -> Result<Self, HttpError> {
        let key = sanitize_api_key(raw_key)?;
        let mut value =
            HeaderValue::from_str(&key).map_err(|e| HttpError::Build(e.to_string()))?;
        value.set_sensitive(true);
        Ok(Auth::Header {
            name: HeaderName::from_static(name),
            value,
        })
    }

    fn apply(&self, headers: &mut HeaderMap) -> &'static str {
        match self {
            Auth::Header { name, value } => {
                headers.insert(name.clone(), value.clone());
                "header"
            }
            Auth::None => "none",
        }
    }
}

/// Per-request overrides. Unset fields use the client defaults.
///
/// ```
/// use parley_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(1),
///     ..Default::default()
/// };
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth>,
    pub headers: Option<HeaderMap>,
}

/// Exponential backoff starting at `base`, capped at 2^10 steps. No single
/// wait, `Retry-After` included, exceeds `max_delay`.
#[derive(Clone, Copy, Debug)]
struct RetryPolicy {
    max_retries: usize,
    base: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    fn delay(&self, retry: usize, hint: Option<Duration>, rate_limited: bool) -> Duration {
        let wait = match hint {
            Some(hint) => hint,
            None => {
                let exp = retry.saturating_sub(1).min(10) as u32;
                let computed = self.base.saturating_mul(1 << exp);
                if rate_limited {
                    computed.max(Duration::from_millis(1100))
                } else {
                    computed
                }
            }
        };
        wait.min(self.max_delay)
    }
}

/// Result of a single attempt.
enum Attempt<T> {
    Done(Result<T, HttpError>),
    Retry {
        error: HttpError,
        hint: Option<Duration>,
        rate_limited: bool,
    },
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Client rooted at `base`, which is treated as a directory:
    /// `https://host/v1beta` and `https://host/v1beta/` behave the same.
    ///
    /// ```
    /// use parley_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1beta")?
    ///     .with_timeout(Duration::from_secs(2))
    ///     .with_retries(5);
    /// assert_eq!(client.base_url().as_str(), "https://api.example.com/v1beta/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// assert_eq!(client.max_retries, 5);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base: normalize_base(base)?,
            inner,
            default_timeout: Duration::from_secs(60),
            max_retries: 1,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// POST `body` as JSON to `path` (relative to the base) and decode the
    /// JSON response.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))?;
        let payload = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;

        let mut headers = opts.headers.unwrap_or_default();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth_kind = opts.auth.as_ref().map_or("none", |a| a.apply(&mut headers));

        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let policy = RetryPolicy {
            max_retries: opts.retries.unwrap_or(self.max_retries),
            base: Duration::from_millis(200),
            max_delay: timeout,
        };
        let req_id = format!("r{}", NEXT_REQUEST.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            %req_id,
            host_path = %format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms = timeout.as_millis() as u64,
            max_retries = policy.max_retries,
            auth_kind,
            body_len = payload.len(),
            "http.request.start"
        );
        if raw_enabled() {
            tracing::debug!(target: "http.raw", %req_id, curl = %make_curl(&url, &headers, &payload), "request");
        }

        let mut retry = 0usize;
        loop {
            match self.attempt(&req_id, &url, &headers, &payload, timeout).await {
                Attempt::Done(result) => return result,
                Attempt::Retry { error, hint, rate_limited } => {
                    if retry >= policy.max_retries {
                        tracing::warn!(%req_id, attempts = retry + 1, error = %error, "http.giving_up");
                        return Err(error);
                    }
                    retry += 1;
                    let delay = policy.delay(retry, hint, rate_limited);
                    tracing::warn!(
                        %req_id,
                        retry,
                        max_retries = policy.max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        error = %error,
                        "http.retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        req_id: &str,
        url: &Url,
        headers: &HeaderMap,
        payload: &[u8],
        timeout: Duration,
    ) -> Attempt<T> {
        let started = Instant::now();
        let sent = self
            .inner
            .post(url.clone())
            .timeout(timeout)
            .headers(headers.clone())
            .body(payload.to_vec())
            .send()
            .await;
        let resp = match sent {
            Ok(resp) => resp,
            Err(e) => return network_retry(e),
        };

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return network_retry(e),
        };
        let request_id = upstream_request_id(&resp_headers);

        tracing::debug!(
            %req_id,
            %status,
            duration_ms = started.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            x_request_id = %request_id,
            "http.response"
        );
        if raw_enabled() {
            let cut = bytes.len().min(RAW_LIMIT);
            tracing::debug!(
                target: "http.raw",
                %req_id,
                %status,
                headers = ?redact_headers(&resp_headers),
                body = %String::from_utf8_lossy(&bytes[..cut]),
                truncated = bytes.len() > RAW_LIMIT,
                "response"
            );
        }

        if status.is_success() {
            return Attempt::Done(serde_json::from_slice::<T>(&bytes).map_err(|e| {
                let body = snippet(&bytes);
                tracing::warn!(%req_id, error = %e, body_snippet = %body, "http.decode_error");
                HttpError::Decode(e.to_string(), body)
            }));
        }

        let error = HttpError::Api {
            status,
            message: error_message(&bytes),
            request_id,
        };
        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS;
        if rate_limited || status.is_server_error() {
            Attempt::Retry {
                error,
                hint: retry_after(&resp_headers),
                rate_limited,
            }
        } else {
            tracing::warn!(%req_id, %status, error = %error, "http.error");
            Attempt::Done(Err(error))
        }
    }
}

fn network_retry<T>(e: reqwest::Error) -> Attempt<T> {
    Attempt::Retry {
        error: HttpError::Network(e.to_string()),
        hint: None,
        rate_limited: false,
    }
}

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn normalize_base(base: &str) -> Result<Url, HttpError> {
    let mut url = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
    if !url.path().ends_with('/') {
        let dir = format!("{}/", url.path());
        url.set_path(&dir);
    }
    Ok(url)
}

fn upstream_request_id(h: &HeaderMap) -> String {
    ["x-request-id", "x-goog-request-id"]
        .iter()
        .find_map(|name| h.get(*name).and_then(|v| v.to_str().ok()))
        .unwrap_or("-")
        .to_string()
}

fn retry_after(h: &HeaderMap) -> Option<Duration> {
    let secs: u64 = h.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}

/// Header list safe to log: secret names and sensitive values are masked.
pub fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(name, value)| {
            let secret = value.is_sensitive()
                || SECRET_HEADERS
                    .iter()
                    .any(|s| name.as_str().eq_ignore_ascii_case(s));
            let shown = if secret {
                REDACTED
            } else {
                value.to_str().unwrap_or("")
            };
            (name.as_str().to_string(), shown.to_string())
        })
        .collect()
}

fn make_curl(url: &Url, headers: &HeaderMap, body: &[u8]) -> String {
    let mut cmd = String::from("curl -XPOST");
    for (name, value) in redact_headers(headers) {
        cmd.push_str(&format!(" -H '{}: {}'", name, shell_quote(&value)));
    }
    match std::str::from_utf8(body) {
        Ok(text) => cmd.push_str(&format!(" -d '{}'", shell_quote(&truncate(text, RAW_LIMIT, "…")))),
        Err(_) => cmd.push_str(&format!(" --data-binary @- # ({} bytes)", body.len())),
    }
    cmd.push_str(&format!(" '{}'", url));
    cmd
}

fn shell_quote(s: &str) -> String {
    s.replace('\'', r"'\''")
}

/// Best human-readable message from an error body.
fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        // {"error":{"message":"..."}} as Google returns it
        Nested { error: Nested },
        Flat {
            #[serde(default)]
            message: String,
            #[serde(default)]
            detail: String,
            #[serde(default)]
            error: String,
        },
    }
    #[derive(Deserialize)]
    struct Nested {
        message: String,
    }

    match serde_json::from_slice::<Shape>(body) {
        Ok(Shape::Nested { error }) => error.message,
        Ok(Shape::Flat { message, detail, error }) => [message, detail, error]
            .into_iter()
            .find(|m| !m.is_empty())
            .unwrap_or_else(|| snippet(body)),
        Err(_) => snippet(body),
    }
}

fn snippet(body: &[u8]) -> String {
    truncate(&String::from_utf8_lossy(body), SNIPPET_LIMIT, "...").into_owned()
}

fn truncate<'a>(s: &'a str, limit: usize, marker: &str) -> std::borrow::Cow<'a, str> {
    if s.len() <= limit {
        return std::borrow::Cow::Borrowed(s);
    }
    let mut cut = limit;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    std::borrow::Cow::Owned(format!("{}{marker}", &s[..cut]))
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let key: String = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    if key.is_empty() {
        return Err(HttpError::Build("API key is empty".into()));
    }
    if !key.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if key.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build("API key contains control characters".into()));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_gets_trailing_slash() {
        let url = normalize_base("https://example.com/v1beta").unwrap();
        assert_eq!(url.as_str(), "https://example.com/v1beta/");
        let joined = url.join("models/m:generateContent").unwrap();
        assert_eq!(joined.path(), "/v1beta/models/m:generateContent");
    }

    #[test]
    fn sanitize_strips_quotes_and_whitespace() {
        assert_eq!(sanitize_api_key("  'abc def'\n").unwrap(), "abcdef");
        assert!(sanitize_api_key("   ").is_err());
        assert!(sanitize_api_key("ключ").is_err());
    }

    #[test]
    fn secret_headers_are_redacted() {
        let mut h = HeaderMap::new();
        h.insert("x-goog-api-key", HeaderValue::from_static("super-secret"));
        h.insert("accept", HeaderValue::from_static("application/json"));
        let redacted = redact_headers(&h);
        assert!(redacted.iter().all(|(_, v)| v != "super-secret"));
        assert!(
            redacted
                .iter()
                .any(|(k, v)| k == "accept" && v == "application/json")
        );
    }

    #[test]
    fn curl_never_contains_the_key() {
        let mut h = HeaderMap::new();
        if let Auth::Header { name, value } = Auth::api_key_header("x-goog-api-key", "k-9").unwrap()
        {
            h.insert(name, value);
        }
        let url = Url::parse("https://example.com/v1beta/models/m:generateContent").unwrap();
        let curl = make_curl(&url, &h, br#"{"a":"it's"}"#);
        assert!(!curl.contains("k-9"));
        assert!(curl.contains("x-goog-api-key: <redacted>"));
        assert!(!curl.contains("key="));
    }

    #[test]
    fn error_message_prefers_google_envelope() {
        let body = br#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "API key not valid");
        assert_eq!(error_message(br#"{"detail":"nope"}"#), "nope");
        assert_eq!(error_message(b"plain text"), "plain text");
    }

    #[test]
    fn retry_after_parses_seconds() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, HeaderValue::from_static(" 3 "));
        assert_eq!(retry_after(&h), Some(Duration::from_secs(3)));
        h.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&h), None);
    }

    #[test]
    fn backoff_doubles_and_respects_hints() {
        let policy = RetryPolicy {
            max_retries: 3,
            base: Duration::from_millis(200),
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(policy.delay(1, None, false), Duration::from_millis(200));
        assert_eq!(policy.delay(3, None, false), Duration::from_millis(800));
        assert_eq!(policy.delay(1, None, true), Duration::from_millis(1100));
        assert_eq!(
            policy.delay(2, Some(Duration::from_secs(4)), true),
            Duration::from_secs(4)
        );
        assert_eq!(
            policy.delay(1, Some(Duration::from_secs(86_400)), true),
            Duration::from_secs(60)
        );
        assert_eq!(policy.delay(11, None, false), Duration::from_secs(60));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2, "~"), "h~");
        assert_eq!(truncate("short", 10, "~"), "short");
    }

    #[tokio::test]
    async fn posts_json_with_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/echo"))
            .and(header("x-goog-api-key", "k-1"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&format!("{}/v1", server.uri())).unwrap();
        let opts = RequestOpts {
            auth: Some(Auth::api_key_header("x-goog-api-key", "k-1").unwrap()),
            ..Default::default()
        };
        let got: serde_json::Value = client
            .post_json_opts("echo", &serde_json::json!({"q": 1}), opts)
            .await
            .unwrap();
        assert_eq!(got["ok"], true);
    }

    #[tokio::test]
    async fn retries_server_errors_then_reports_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fail"))
            .respond_with(
                ResponseTemplate::new(503)
                    .insert_header("retry-after", "0")
                    .set_body_json(serde_json::json!({"error": {"message": "overloaded"}})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap().with_retries(1);
        let err = client
            .post_json_opts::<_, serde_json::Value>("fail", &serde_json::json!({}), RequestOpts::default())
            .await
            .unwrap_err();
        match err {
            HttpError::Api { status, message, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn huge_retry_after_is_capped_by_the_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "86400")
                    .set_body_json(serde_json::json!({"error": {"message": "slow down"}})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri())
            .unwrap()
            .with_timeout(Duration::from_millis(300))
            .with_retries(1);
        let started = Instant::now();
        let err = tokio::time::timeout(
            Duration::from_secs(10),
            client.post_json_opts::<_, serde_json::Value>("x", &serde_json::json!({}), RequestOpts::default()),
        )
        .await
        .expect("retry wait must stay bounded")
        .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(err, HttpError::Api { status, .. } if status == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"message":"bad"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap().with_retries(3);
        let err = client
            .post_json_opts::<_, serde_json::Value>("x", &serde_json::json!({}), RequestOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Api { status, .. } if status == StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn undecodable_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = HttpClient::new(&server.uri()).unwrap();
        let err = client
            .post_json_opts::<_, serde_json::Value>("x", &serde_json::json!({}), RequestOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Decode(_, _)));
    }
}
