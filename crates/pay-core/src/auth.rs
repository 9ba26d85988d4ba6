//! # Auth Strategies
//!
//! Pure header transformations applied by the [`Client`](crate::Client)
//! before a request reaches the transport.

use crate::transport::Headers;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;
use std::sync::Arc;

/// Adds credentials to outbound headers
pub trait AuthStrategy: Send + Sync {
    fn apply(&self, headers: Headers) -> Headers;
}

impl<F> AuthStrategy for F
where
    F: Fn(Headers) -> Headers + Send + Sync,
{
    fn apply(&self, headers: Headers) -> Headers {
        self(headers)
    }
}

/// Type alias for a shared auth strategy
pub type SharedAuth = Arc<dyn AuthStrategy>;

/// Static API key in a header (default `X-Api-Key`)
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: String,
    header: String,
}

impl ApiKeyAuth {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            header: "X-Api-Key".to_string(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}

impl AuthStrategy for ApiKeyAuth {
    fn apply(&self, mut headers: Headers) -> Headers {
        headers.insert(self.header.clone(), self.api_key.clone());
        headers
    }
}

impl fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("api_key", &"<redacted>")
            .field("header", &self.header)
            .finish()
    }
}

/// Token with a scheme (default `Authorization: Bearer <token>`)
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
    header: String,
    scheme: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            header: "Authorization".to_string(),
            scheme: "Bearer".to_string(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Empty scheme sends the bare token
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }
}

impl AuthStrategy for TokenAuth {
    fn apply(&self, mut headers: Headers) -> Headers {
        let value = if self.scheme.is_empty() {
            self.token.clone()
        } else {
            format!("{} {}", self.scheme, self.token)
        };
        headers.insert(self.header.clone(), value);
        headers
    }
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth")
            .field("token", &"<redacted>")
            .field("header", &self.header)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// HTTP Basic credentials
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic <base64(username:password)>`
    pub fn header_value(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl AuthStrategy for BasicAuth {
    fn apply(&self, mut headers: Headers) -> Headers {
        headers.insert("Authorization".to_string(), self.header_value());
        headers
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
