//! # Provider Configuration
//!
//! Credentials are loaded from environment variables. A gateway is only
//! configured when its primary credential is present; partial or malformed
//! credentials are a configuration error.

use pay_core::{Headers, PaymentError, PaymentResult, ProviderRegistry, SharedTransport};
use std::env;
use std::sync::Arc;
use tracing::info;

use crate::dummy::DummyProvider;
use crate::flow::FlowProvider;
use crate::generic::GenericProvider;
use crate::khipu::KhipuProvider;
use crate::paypal::PayPalProvider;
use crate::stripe::StripeProvider;

/// Looks up one variable; empty values count as unset
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Process environment
pub fn process_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn var(lookup: EnvLookup<'_>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(lookup: EnvLookup<'_>, name: &str, because: &str) -> PaymentResult<String> {
    var(lookup, name).ok_or_else(|| {
        PaymentError::Configuration(format!("{name} not set (required with {because})"))
    })
}

/// Stripe API configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    pub secret_key: String,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version header
    pub api_version: String,
}

impl StripeConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.stripe.com";
    pub const DEFAULT_API_VERSION: &'static str = "2024-12-18.acacia";

    /// Config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base_url: Self::DEFAULT_BASE_URL.to_string(),
            api_version: Self::DEFAULT_API_VERSION.to_string(),
        }
    }

    /// `STRIPE_SECRET_KEY`, optional `STRIPE_API_BASE_URL`
    pub fn from_lookup(lookup: EnvLookup<'_>) -> PaymentResult<Option<Self>> {
        let Some(secret_key) = var(lookup, "STRIPE_SECRET_KEY") else {
            return Ok(None);
        };

        // Validate key format
        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(PaymentError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        let mut config = Self::new(secret_key);
        if let Some(url) = var(lookup, "STRIPE_API_BASE_URL") {
            config = config.with_api_base_url(url);
        }
        Ok(Some(config))
    }

    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("test_mode", &self.is_test_mode())
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// PayPal REST credentials
#[derive(Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base_url: String,
}

impl PayPalConfig {
    pub const SANDBOX_URL: &'static str = "https://api-m.sandbox.paypal.com";
    pub const LIVE_URL: &'static str = "https://api-m.paypal.com";

    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>, sandbox: bool) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: if sandbox { Self::SANDBOX_URL } else { Self::LIVE_URL }.to_string(),
        }
    }

    /// `PAYPAL_CLIENT_ID`, `PAYPAL_CLIENT_SECRET`, `PAYPAL_SANDBOX` (default true)
    pub fn from_lookup(lookup: EnvLookup<'_>) -> PaymentResult<Option<Self>> {
        let Some(client_id) = var(lookup, "PAYPAL_CLIENT_ID") else {
            return Ok(None);
        };
        let client_secret = require(lookup, "PAYPAL_CLIENT_SECRET", "PAYPAL_CLIENT_ID")?;
        let sandbox = var(lookup, "PAYPAL_SANDBOX")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        Ok(Some(Self::new(client_id, client_secret, sandbox)))
    }

    pub fn is_sandbox(&self) -> bool {
        self.api_base_url == Self::SANDBOX_URL
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Khipu v3 credentials
#[derive(Clone)]
pub struct KhipuConfig {
    pub api_key: String,
    pub notify_url: Option<String>,
    /// Payment subject shown to the payer
    pub subject: String,
    pub api_base_url: String,
}

impl KhipuConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://payment-api.khipu.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            notify_url: None,
            subject: "Order".to_string(),
            api_base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// `KHIPU_API_KEY`, optional `KHIPU_NOTIFY_URL`
    pub fn from_lookup(lookup: EnvLookup<'_>) -> PaymentResult<Option<Self>> {
        Ok(var(lookup, "KHIPU_API_KEY").map(|key| {
            let mut config = Self::new(key);
            config.notify_url = var(lookup, "KHIPU_NOTIFY_URL");
            config
        }))
    }

    pub fn with_notify_url(mut self, url: impl Into<String>) -> Self {
        self.notify_url = Some(url.into());
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for KhipuConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KhipuConfig")
            .field("api_key", &"<redacted>")
            .field("notify_url", &self.notify_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Flow.cl credentials
#[derive(Clone)]
pub struct FlowConfig {
    pub api_key: String,
    /// Request signing secret
    pub api_secret: String,
    pub api_url: String,
    pub subject: String,
    /// Server-to-server confirmation URL; falls back to the success URL
    pub confirmation_url: Option<String>,
}

impl FlowConfig {
    pub const DEFAULT_API_URL: &'static str = "https://www.flow.cl/api";

    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            subject: "Order".to_string(),
            confirmation_url: None,
        }
    }

    /// `FLOW_API_KEY`, `FLOW_API_SECRET`, optional `FLOW_API_URL`
    pub fn from_lookup(lookup: EnvLookup<'_>) -> PaymentResult<Option<Self>> {
        let Some(api_key) = var(lookup, "FLOW_API_KEY") else {
            return Ok(None);
        };
        let api_secret = require(lookup, "FLOW_API_SECRET", "FLOW_API_KEY")?;

        let mut config = Self::new(api_key, api_secret);
        if let Some(url) = var(lookup, "FLOW_API_URL") {
            config = config.with_api_url(url);
        }
        Ok(Some(config))
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_confirmation_url(mut self, url: impl Into<String>) -> Self {
        self.confirmation_url = Some(url.into());
        self
    }
}

impl std::fmt::Debug for FlowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Endpoints of an in-house REST gateway
#[derive(Debug, Clone)]
pub struct GenericConfig {
    pub checkout_url: String,
    /// Contains a `{payment_id}` placeholder
    pub payment_url_template: String,
    pub extra_headers: Headers,
}

impl GenericConfig {
    pub fn new(checkout_url: impl Into<String>, payment_url_template: impl Into<String>) -> Self {
        Self {
            checkout_url: checkout_url.into(),
            payment_url_template: payment_url_template.into(),
            extra_headers: Headers::new(),
        }
    }

    /// `GENERIC_CHECKOUT_URL`, `GENERIC_PAYMENT_URL_TEMPLATE`
    pub fn from_lookup(lookup: EnvLookup<'_>) -> PaymentResult<Option<Self>> {
        let Some(checkout_url) = var(lookup, "GENERIC_CHECKOUT_URL") else {
            return Ok(None);
        };
        let template = require(lookup, "GENERIC_PAYMENT_URL_TEMPLATE", "GENERIC_CHECKOUT_URL")?;
        if !template.contains("{payment_id}") {
            return Err(PaymentError::Configuration(
                "GENERIC_PAYMENT_URL_TEMPLATE must contain {payment_id}".to_string(),
            ));
        }
        Ok(Some(Self::new(checkout_url, template)))
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }
}

/// Every gateway that has credentials in the environment
#[derive(Debug, Clone, Default)]
pub struct ProvidersConfig {
    pub stripe: Option<StripeConfig>,
    pub paypal: Option<PayPalConfig>,
    pub khipu: Option<KhipuConfig>,
    pub flow: Option<FlowConfig>,
    pub generic: Option<GenericConfig>,
    /// Register the no-I/O dummy provider
    pub dummy: bool,
}

impl ProvidersConfig {
    /// Load from the process environment (and `.env` if present)
    pub fn from_env() -> PaymentResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(&process_env)
    }

    /// Dummy is enabled unless `ENVIRONMENT` is `production`
    pub fn from_lookup(lookup: EnvLookup<'_>) -> PaymentResult<Self> {
        let production = var(lookup, "ENVIRONMENT")
            .map(|env| env.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        Ok(Self {
            stripe: StripeConfig::from_lookup(lookup)?,
            paypal: PayPalConfig::from_lookup(lookup)?,
            khipu: KhipuConfig::from_lookup(lookup)?,
            flow: FlowConfig::from_lookup(lookup)?,
            generic: GenericConfig::from_lookup(lookup)?,
            dummy: !production,
        })
    }

    /// Register a provider for every configured gateway; returns the keys.
    pub fn register_all(&self, registry: &ProviderRegistry, transport: &SharedTransport) -> Vec<String> {
        let mut keys = Vec::new();
        let mut add = |key: &str, provider: pay_core::SharedProvider| {
            registry.register(key, provider);
            keys.push(key.to_string());
        };

        if let Some(config) = &self.stripe {
            add(
                StripeProvider::KEY,
                Arc::new(StripeProvider::new(config.clone(), Arc::clone(transport))),
            );
        }
        if let Some(config) = &self.paypal {
            add(
                PayPalProvider::KEY,
                Arc::new(PayPalProvider::new(config.clone(), Arc::clone(transport))),
            );
        }
        if let Some(config) = &self.khipu {
            add(
                KhipuProvider::KEY,
                Arc::new(KhipuProvider::new(config.clone(), Arc::clone(transport))),
            );
        }
        if let Some(config) = &self.flow {
            add(
                FlowProvider::KEY,
                Arc::new(FlowProvider::new(config.clone(), Arc::clone(transport))),
            );
        }
        if let Some(config) = &self.generic {
            add(
                GenericProvider::KEY,
                Arc::new(GenericProvider::new(config.clone(), Arc::clone(transport))),
            );
        }
        if self.dummy {
            add(DummyProvider::KEY, Arc::new(DummyProvider::new()));
        }

        info!(providers = ?keys, "Registered payment providers");
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pay_core::MockTransport;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_environment() {
        let lookup = env_of(&[]);
        let config = ProvidersConfig::from_lookup(&lookup).unwrap();

        assert!(config.stripe.is_none());
        assert!(config.paypal.is_none());
        assert!(config.dummy);
    }

    #[test]
    fn test_stripe_key_validation() {
        let lookup = env_of(&[("STRIPE_SECRET_KEY", "pk_test_wrong")]);
        assert!(StripeConfig::from_lookup(&lookup).is_err());

        let lookup = env_of(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("STRIPE_API_BASE_URL", "http://localhost:12111/"),
        ]);
        let config = StripeConfig::from_lookup(&lookup).unwrap().unwrap();
        assert!(config.is_test_mode());
        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert_eq!(config.auth_header(), "Bearer sk_test_abc");
    }

    #[test]
    fn test_partial_credentials_are_errors() {
        let lookup = env_of(&[("PAYPAL_CLIENT_ID", "id")]);
        assert!(matches!(
            PayPalConfig::from_lookup(&lookup),
            Err(PaymentError::Configuration(_))
        ));

        let lookup = env_of(&[("FLOW_API_KEY", "key"), ("FLOW_API_SECRET", "  ")]);
        assert!(FlowConfig::from_lookup(&lookup).is_err());

        let lookup = env_of(&[
            ("GENERIC_CHECKOUT_URL", "https://gw/checkout"),
            ("GENERIC_PAYMENT_URL_TEMPLATE", "https://gw/payments"),
        ]);
        assert!(GenericConfig::from_lookup(&lookup).is_err());
    }

    #[test]
    fn test_paypal_sandbox_flag() {
        let lookup = env_of(&[
            ("PAYPAL_CLIENT_ID", "id"),
            ("PAYPAL_CLIENT_SECRET", "secret"),
            ("PAYPAL_SANDBOX", "false"),
        ]);
        let config = PayPalConfig::from_lookup(&lookup).unwrap().unwrap();
        assert!(!config.is_sandbox());
        assert_eq!(config.api_base_url, PayPalConfig::LIVE_URL);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = PayPalConfig::new("id", "very-secret", true);
        assert!(!format!("{config:?}").contains("very-secret"));
        let config = StripeConfig::new("sk_test_hidden");
        assert!(!format!("{config:?}").contains("sk_test_hidden"));
    }

    #[test]
    fn test_register_all() {
        let lookup = env_of(&[
            ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ("KHIPU_API_KEY", "kh"),
            ("ENVIRONMENT", "production"),
        ]);
        let config = ProvidersConfig::from_lookup(&lookup).unwrap();
        let registry = ProviderRegistry::new();
        let transport: SharedTransport = Arc::new(MockTransport::new());

        let keys = config.register_all(&registry, &transport);
        assert_eq!(keys, vec!["stripe", "khipu"]);
        assert_eq!(registry.list_keys(), vec!["khipu", "stripe"]);
        assert!(!registry.contains("dummy"));
    }
}
