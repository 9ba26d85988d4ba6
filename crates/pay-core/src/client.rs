//! # Client
//!
//! Single entry point over one resolved provider, plus a low-level
//! [`Client::request`] escape hatch for gateway calls the provider contract
//! does not cover.

use crate::amount::Money;
use crate::auth::{AuthStrategy, SharedAuth};
use crate::error::{PaymentError, PaymentResult};
use crate::models::{CheckoutRequest, CheckoutSession, Metadata, PaymentStatus};
use crate::provider::{ProviderSelector, SharedProvider};
use crate::registry::ProviderRegistry;
use crate::transport::{
    Headers, HttpRequest, HttpResponse, Method, RequestBody, SharedTransport, Transport,
    DEFAULT_TIMEOUT,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Extra inputs for [`Client::request`]
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub params: Vec<(String, String)>,
    /// Overrides the client timeout
    pub timeout: Option<Duration>,
}

/// Facade composing a provider, an auth strategy and a transport
#[derive(Clone)]
pub struct Client {
    provider: SharedProvider,
    auth: Option<SharedAuth>,
    transport: Option<SharedTransport>,
    base_url: String,
    timeout: Duration,
}

impl Client {
    pub fn new(provider: SharedProvider) -> Self {
        Self {
            provider,
            auth: None,
            transport: None,
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Resolve `selector` through `registry`
    pub fn from_registry(
        registry: &ProviderRegistry,
        selector: impl Into<ProviderSelector>,
    ) -> PaymentResult<Self> {
        Ok(Self::new(registry.get(selector)?))
    }

    pub fn with_auth(mut self, auth: impl AuthStrategy + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub fn with_shared_auth(mut self, auth: SharedAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn with_shared_transport(mut self, transport: SharedTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Base URL prepended to relative paths in [`request`](Self::request)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    /// Delegates to the provider
    pub async fn create_checkout(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutSession> {
        self.provider.create_checkout(request).await
    }

    /// Parse `amount` and open a checkout in one step
    pub async fn checkout(
        &self,
        amount: &str,
        currency: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: Option<Metadata>,
    ) -> PaymentResult<CheckoutSession> {
        let money = Money::parse(amount, currency)?;
        let request = CheckoutRequest::new(money, success_url, cancel_url)
            .with_metadata_map(metadata.unwrap_or_default());
        self.create_checkout(&request).await
    }

    /// Delegates to the provider
    pub async fn get_payment(&self, payment_id: &str) -> PaymentResult<PaymentStatus> {
        self.provider.get_payment(payment_id).await
    }

    /// Send a raw request with auth applied.
    ///
    /// Absolute URLs are used as given. Non-2xx responses are returned, not
    /// turned into errors.
    #[instrument(skip(self, options), fields(provider = %self.provider.key()))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> PaymentResult<HttpResponse> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            PaymentError::Configuration("client has no transport configured".to_string())
        })?;

        let headers = match &self.auth {
            Some(auth) => auth.apply(options.headers),
            None => options.headers,
        };

        let request = HttpRequest {
            method,
            url: self.url_for(path),
            headers,
            body: options.body,
            params: options.params,
            timeout: options.timeout.unwrap_or(self.timeout),
        };

        transport.send(request).await
    }

    fn url_for(&self, path: &str) -> String {
        if self.base_url.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.provider.key())
            .field("has_auth", &self.auth.is_some())
            .field("has_transport", &self.transport.is_some())
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
