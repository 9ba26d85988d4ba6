//! # Transport
//!
//! The HTTP dependency every provider is built on. The engine never opens a
//! socket itself: adapters hand an [`HttpRequest`] to an injected
//! [`Transport`] and only inspect the status code and body that come back.
//! Timeouts travel with the request and are enforced by the transport.

use crate::error::{PaymentError, PaymentResult};
use crate::webhook::event::{first_string, FieldPath};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Request/response headers
pub type Headers = BTreeMap<String, String>;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound body encoding
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// An outbound HTTP request
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    /// Query parameters
    pub params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
            params: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Inbound body: JSON when it decodes, text otherwise
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Decode raw bytes, preferring JSON
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// An HTTP response as seen by adapters
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body,
        }
    }

    /// JSON response shorthand
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, ResponseBody::Json(body))
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as a JSON object, if it is one
    pub fn json_object(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            ResponseBody::Json(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Body as an owned JSON object, empty when it is anything else
    pub fn into_object(self) -> Map<String, Value> {
        match self.body {
            ResponseBody::Json(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Pass 2xx responses through; turn anything else into a `UserError`.
    ///
    /// The message and code are looked up in the body at the given paths,
    /// falling back to the HTTP status.
    pub fn error_for_status(
        self,
        message_paths: &[FieldPath],
        code_paths: &[FieldPath],
    ) -> PaymentResult<Self> {
        if self.is_success() {
            return Ok(self);
        }

        let (message, code) = match self.json_object() {
            Some(body) => (
                first_string(body, message_paths),
                first_string(body, code_paths),
            ),
            None => (None, None),
        };

        Err(PaymentError::UserError {
            message: message.unwrap_or_else(|| format!("HTTP {}", self.status)),
            code: code.or_else(|| Some(self.status.to_string())),
        })
    }
}

/// Sends HTTP requests on behalf of providers.
///
/// Implementations must be reusable across requests and map network
/// failures to [`PaymentError::TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> PaymentResult<HttpResponse>;
}

/// Type alias for a shared transport (dynamic dispatch)
pub type SharedTransport = Arc<dyn Transport>;

/// In-memory transport that replays queued responses and records requests.
///
/// Useful for testing adapters without a network.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<PaymentResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `send`
    pub fn push_response(&self, response: HttpResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queue a JSON response
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_response(HttpResponse::json(status, body));
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: PaymentError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> PaymentResult<HttpResponse> {
        self.requests.lock().push(request);
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(PaymentError::TransportError(
                "no response queued".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://api.example.com/v1/sessions")
            .with_header("Authorization", "Bearer sk")
            .with_json(json!({"amount": "1.00"}))
            .with_param("expand", "payment_intent")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.headers["Authorization"], "Bearer sk");
        assert_eq!(request.params, vec![("expand".into(), "payment_intent".into())]);
        assert_eq!(request.timeout, Duration::from_secs(5));
        assert!(matches!(request.body, Some(RequestBody::Json(_))));
    }

    #[test]
    fn test_response_body_decoding() {
        assert_eq!(
            ResponseBody::from_bytes(br#"{"id":1}"#),
            ResponseBody::Json(json!({"id": 1}))
        );
        assert_eq!(
            ResponseBody::from_bytes(b"Bad Gateway"),
            ResponseBody::Text("Bad Gateway".into())
        );
    }

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse::json(201, json!({"id": "x"}));
        assert!(ok.error_for_status(&[], &[]).is_ok());

        let rejected = HttpResponse::json(
            402,
            json!({"error": {"message": "Your card was declined.", "code": "card_declined"}}),
        );
        let err = rejected
            .error_for_status(&[&["error", "message"]], &[&["error", "code"]])
            .unwrap_err();
        match err {
            PaymentError::UserError { message, code } => {
                assert_eq!(message, "Your card was declined.");
                assert_eq!(code.as_deref(), Some("card_declined"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let text = HttpResponse::new(500, ResponseBody::Text("oops".into()));
        let err = text.error_for_status(&[&["message"]], &[]).unwrap_err();
        assert_eq!(err.code(), Some("500"));
        assert_eq!(err.to_string(), "Provider rejected request: HTTP 500");
    }

    #[tokio::test]
    async fn test_mock_transport() {
        let transport = MockTransport::new();
        transport.push_json(200, json!({"ok": true}));

        let response = transport
            .send(HttpRequest::get("https://example.com/a"))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(transport.requests().len(), 1);

        let err = transport
            .send(HttpRequest::get("https://example.com/b"))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://example.com/b"
        );
    }
}
