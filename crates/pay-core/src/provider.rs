//! # Provider Contract
//!
//! One implementation per gateway, swappable at runtime behind
//! [`SharedProvider`].
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              Provider (trait)                │
//! │  ├── info()                                  │
//! │  ├── create_checkout()                       │
//! │  ├── get_payment()                           │
//! │  └── parse_webhook()                         │
//! └──────────────────────────────────────────────┘
//!                       ▲
//!      ┌────────┬───────┼───────┬────────┐
//!   Stripe   PayPal   Khipu   Flow   Generic/Dummy
//! ```

use crate::error::PaymentResult;
use crate::models::{CheckoutRequest, CheckoutSession, PaymentStatus, WebhookEvent};
use crate::transport::Headers;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Static description of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Registry key (e.g., "stripe")
    pub key: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Gateway homepage or docs
    #[serde(default)]
    pub url: String,
}

impl ProviderInfo {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            author: String::new(),
            version: String::new(),
            description: String::new(),
            url: String::new(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// A payment gateway adapter.
///
/// Network calls go through an injected transport; non-2xx gateway responses
/// surface as `UserError`. Nothing is retried here.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Static metadata
    fn info(&self) -> ProviderInfo;

    /// Registry key, `info().key` by default
    fn key(&self) -> String {
        self.info().key
    }

    /// Open a hosted checkout and return the redirect target.
    ///
    /// The returned session echoes the requested amount and currency, not
    /// the gateway's wire representation.
    async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession>;

    /// Fetch and normalise the state of a payment
    async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus>;

    /// Best-effort parse of a webhook body. Must not fail.
    ///
    /// Verify the signature before calling this.
    fn parse_webhook(&self, payload: &[u8], headers: &Headers) -> WebhookEvent;
}

/// Type alias for a shared provider (dynamic dispatch)
pub type SharedProvider = Arc<dyn Provider>;

/// A registry key or an already resolved provider
#[derive(Clone)]
pub enum ProviderSelector {
    Key(String),
    Instance(SharedProvider),
}

impl fmt::Debug for ProviderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSelector::Key(key) => f.debug_tuple("Key").field(key).finish(),
            ProviderSelector::Instance(provider) => {
                f.debug_tuple("Instance").field(&provider.key()).finish()
            }
        }
    }
}

impl From<&str> for ProviderSelector {
    fn from(key: &str) -> Self {
        ProviderSelector::Key(key.to_string())
    }
}

impl From<String> for ProviderSelector {
    fn from(key: String) -> Self {
        ProviderSelector::Key(key)
    }
}

impl From<&String> for ProviderSelector {
    fn from(key: &String) -> Self {
        ProviderSelector::Key(key.clone())
    }
}

impl From<SharedProvider> for ProviderSelector {
    fn from(provider: SharedProvider) -> Self {
        ProviderSelector::Instance(provider)
    }
}

impl From<&SharedProvider> for ProviderSelector {
    fn from(provider: &SharedProvider) -> Self {
        ProviderSelector::Instance(Arc::clone(provider))
    }
}
