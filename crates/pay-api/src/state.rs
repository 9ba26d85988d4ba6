//! # Application State
//!
//! Shared state for the Axum application: the provider registry, the
//! per-provider webhook verifiers and the service configuration.

use anyhow::Context;
use pay_core::{DigestAlgorithm, PaymentError, PaymentResult, ProviderRegistry, WebhookVerifier};
use pay_providers::config::{process_env, EnvLookup};
use pay_providers::stripe::{StripeSignatureVerifier, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
use pay_providers::{ProvidersConfig, ReqwestTransport};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Header carrying the signature for the plain HMAC scheme
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Signature";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Used when a checkout request omits `success_url`
    pub default_success_url: String,
    /// Used when a checkout request omits `cancel_url`
    pub default_cancel_url: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: EnvLookup<'_>) -> Self {
        let get = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        Self {
            host: get("HOST", "127.0.0.1"),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            environment: get("ENVIRONMENT", "development"),
            default_success_url: get("DEFAULT_SUCCESS_URL", "http://localhost:8080/checkout/success"),
            default_cancel_url: get("DEFAULT_CANCEL_URL", "http://localhost:8080/checkout/cancel"),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(&|_: &str| None)
    }
}

// =============================================================================
// Webhook verification settings
// =============================================================================

/// Signature scheme used by a provider's webhooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookScheme {
    /// HMAC of the raw body in a single header
    #[default]
    Hmac,
    /// Stripe's `t=...,v1=...` header
    Stripe,
}

/// One `[provider]` table of `webhooks.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub scheme: WebhookScheme,
    /// Header carrying the signature
    pub header: Option<String>,
    /// Prefix stripped from the header value (`sha256=`)
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub algorithm: DigestAlgorithm,
    /// Environment variable holding the shared secret
    pub secret_env: String,
    /// Maximum timestamp age (stripe scheme)
    pub tolerance_secs: Option<i64>,
}

impl WebhookSettings {
    /// Resolve the secret and build the verifier
    pub fn guard(&self, lookup: EnvLookup<'_>) -> PaymentResult<WebhookGuard> {
        let secret = lookup(&self.secret_env)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PaymentError::Configuration(format!("{} not set", self.secret_env)))?;

        Ok(match self.scheme {
            WebhookScheme::Hmac => WebhookGuard::Hmac {
                header: self
                    .header
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SIGNATURE_HEADER.to_string()),
                verifier: WebhookVerifier::new(secret)
                    .with_prefix(self.prefix.as_str())
                    .with_algorithm(self.algorithm),
            },
            WebhookScheme::Stripe => WebhookGuard::Stripe {
                header: self
                    .header
                    .clone()
                    .unwrap_or_else(|| SIGNATURE_HEADER.to_string()),
                verifier: StripeSignatureVerifier::new(secret)
                    .with_tolerance(self.tolerance_secs.unwrap_or(DEFAULT_TOLERANCE_SECS)),
            },
        })
    }
}

/// Parse `webhooks.toml`: one table per provider key
pub fn parse_webhook_settings(content: &str) -> anyhow::Result<BTreeMap<String, WebhookSettings>> {
    toml::from_str(content).context("Failed to parse webhook settings")
}

/// Verifier bound to the header it reads
#[derive(Debug, Clone)]
pub enum WebhookGuard {
    Hmac {
        header: String,
        verifier: WebhookVerifier,
    },
    Stripe {
        header: String,
        verifier: StripeSignatureVerifier,
    },
}

impl WebhookGuard {
    pub fn header(&self) -> &str {
        match self {
            WebhookGuard::Hmac { header, .. } | WebhookGuard::Stripe { header, .. } => header,
        }
    }

    /// Check the raw body against the header value
    pub fn verify(&self, payload: &[u8], signature: &str) -> PaymentResult<()> {
        match self {
            WebhookGuard::Hmac { verifier, .. } => verifier.verify(payload, signature),
            WebhookGuard::Stripe { verifier, .. } => verifier.verify(payload, signature),
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Registered gateways
    pub registry: ProviderRegistry,
    /// Webhook verifiers by provider key
    pub webhooks: Arc<BTreeMap<String, WebhookGuard>>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build from the environment and `config/webhooks.toml`
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let providers = ProvidersConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load provider configuration: {}", e))?;
        let transport = ReqwestTransport::shared()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP transport: {}", e))?;

        let registry = ProviderRegistry::new();
        providers.register_all(&registry, &transport);

        let mut state = Self::with_registry(registry, config);
        for (key, settings) in load_webhook_settings()? {
            match settings.guard(&process_env) {
                Ok(guard) => state = state.with_webhook(key, guard),
                Err(e) => warn!(provider = %key, "Webhook verification disabled: {}", e),
            }
        }

        Ok(state)
    }

    /// State around an existing registry with no webhook verifiers
    pub fn with_registry(registry: ProviderRegistry, config: AppConfig) -> Self {
        Self {
            registry,
            webhooks: Arc::new(BTreeMap::new()),
            config,
        }
    }

    pub fn with_webhook(mut self, provider: impl Into<String>, guard: WebhookGuard) -> Self {
        Arc::make_mut(&mut self.webhooks).insert(provider.into(), guard);
        self
    }

    /// Verifier for a provider, if its webhooks are configured
    pub fn webhook_guard(&self, provider: &str) -> Option<&WebhookGuard> {
        self.webhooks.get(provider)
    }
}

/// Load webhook settings from config file
fn load_webhook_settings() -> anyhow::Result<BTreeMap<String, WebhookSettings>> {
    let config_paths = [
        "config/webhooks.toml",
        "../config/webhooks.toml",
        "../../config/webhooks.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let settings = parse_webhook_settings(&content).with_context(|| path.to_string())?;
            info!("Loaded webhook settings for {} providers from {}", settings.len(), path);
            return Ok(settings);
        }
    }

    warn!("No webhook settings found, all webhooks will be rejected");
    Ok(BTreeMap::new())
}
