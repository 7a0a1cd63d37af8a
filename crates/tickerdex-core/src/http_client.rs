use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Minimal HTTP method set needed by source adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP request envelope used by adapter transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
    /// Charset label used to decode the body when the server mislabels it.
    pub charset: Option<&'static str>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: 10_000,
            charset: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post_form(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
            .with_header("content-type", "application/x-www-form-urlencoded; charset=UTF-8")
            .with_body(body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds the browser-like headers scraped portals expect.
    pub fn with_browser_headers(self, referer: &str) -> Self {
        self.with_header("user-agent", BROWSER_USER_AGENT)
            .with_header("referer", referer)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_charset(mut self, label: &'static str) -> Self {
        self.charset = Some(label);
        self
    }
}

/// HTTP response envelope returned by an adapter transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// True when an HTML document came back, typically an error or block page.
    pub fn looks_like_html(&self) -> bool {
        let head = self.body.trim_start();
        let prefix: String = head.chars().take(64).collect::<String>().to_ascii_lowercase();
        prefix.starts_with("<!doctype") || prefix.starts_with("<html")
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Adapter transport contract.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(concat!("tickerdex/", env!("CARGO_PKG_VERSION")))
                    .cookie_store(true)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            builder = builder.timeout(Duration::from_millis(request.timeout_ms));

            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            // Drop the URL from errors: query strings may carry API keys.
            let response = builder.send().await.map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    HttpError::new(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::new(format!("connection failed: {e}"))
                } else {
                    HttpError::new(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let header_charset = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .and_then(charset_from_content_type)
                .map(str::to_owned);
            let bytes = response
                .bytes()
                .await
                .map_err(|e| {
                    HttpError::new(format!("failed to read response body: {}", e.without_url()))
                })?;

            let label = request.charset.map(str::to_owned).or(header_charset);
            Ok(HttpResponse {
                status,
                body: decode_body(&bytes, label.as_deref()),
            })
        })
    }
}

fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("charset="))
        .map(|value| value.trim_matches('"'))
}

/// Decodes a response body with the given charset label, UTF-8 otherwise.
pub fn decode_body(bytes: &[u8], label: Option<&str>) -> String {
    let encoding = label
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Deterministic offline transport: answers requests from scripted routes and
/// records every request it sees.
///
/// A route matches when the request URL contains its pattern; the first
/// matching route wins. Each route replays its queued responses in order and
/// repeats the last one once the queue is drained.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<ScriptedRoute>>,
    requests: Mutex<Vec<HttpRequest>>,
}

#[derive(Debug)]
struct ScriptedRoute {
    pattern: String,
    responses: VecDeque<Result<HttpResponse, HttpError>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, pattern: impl Into<String>, response: HttpResponse) -> Self {
        self.route_sequence(pattern, vec![Ok(response)])
    }

    pub fn route_error(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.route_sequence(pattern, vec![Err(HttpError::new(message))])
    }

    pub fn route_sequence(
        self,
        pattern: impl Into<String>,
        responses: Vec<Result<HttpResponse, HttpError>>,
    ) -> Self {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(ScriptedRoute {
                pattern: pattern.into(),
                responses: responses.into(),
            });
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.contains(pattern))
            .count()
    }

    fn respond(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut routes = self
            .routes
            .lock()
            .map_err(|_| HttpError::new("scripted routes poisoned"))?;
        let Some(route) = routes.iter_mut().find(|route| url.contains(&route.pattern)) else {
            return Ok(HttpResponse::with_status(404, "not found"));
        };

        if route.responses.len() > 1 {
            route
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::new("scripted route exhausted")))
        } else {
            route
                .responses
                .front()
                .cloned()
                .unwrap_or_else(|| Err(HttpError::new("scripted route exhausted")))
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self.respond(&request.url);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Box::pin(async move { response })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_headers_set_referer_and_agent() {
        let request = HttpRequest::get("https://finance.example/sise")
            .with_browser_headers("https://finance.example/");

        assert_eq!(
            request.headers.get("referer").map(String::as_str),
            Some("https://finance.example/")
        );
        assert!(request.headers.contains_key("user-agent"));
    }

    #[test]
    fn decodes_euc_kr_bodies() {
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("삼성전자");
        assert_eq!(decode_body(&bytes, Some("euc-kr")), "삼성전자");
        assert_eq!(decode_body("plain".as_bytes(), None), "plain");
    }

    #[test]
    fn extracts_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/html;charset=EUC-KR"),
            Some("EUC-KR")
        );
        assert_eq!(charset_from_content_type("application/json"), None);
    }

    #[test]
    fn detects_html_error_pages() {
        assert!(HttpResponse::ok("  <!DOCTYPE html><html></html>").looks_like_html());
        assert!(HttpResponse::ok("<HTML><body>blocked</body>").looks_like_html());
        assert!(!HttpResponse::ok("{\"OutBlock_1\":[]}").looks_like_html());
    }

    #[tokio::test]
    async fn scripted_client_replays_sequence_then_repeats_last() {
        let client = ScriptedHttpClient::new().route_sequence(
            "/page",
            vec![
                Err(HttpError::new("reset")),
                Ok(HttpResponse::ok("first")),
                Ok(HttpResponse::ok("last")),
            ],
        );

        assert!(client.execute(HttpRequest::get("https://h/page")).await.is_err());
        let first = client.execute(HttpRequest::get("https://h/page")).await;
        assert_eq!(first.map(|r| r.body), Ok(String::from("first")));
        for _ in 0..2 {
            let again = client.execute(HttpRequest::get("https://h/page")).await;
            assert_eq!(again.map(|r| r.body), Ok(String::from("last")));
        }
        assert_eq!(client.request_count("/page"), 4);

        let unknown = client
            .execute(HttpRequest::get("https://h/other"))
            .await
            .expect("unknown routes answer 404");
        assert_eq!(unknown.status, 404);
    }
}
