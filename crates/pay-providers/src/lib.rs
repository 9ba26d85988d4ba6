//! # pay-providers
//!
//! Gateway adapters for paybridge.
//!
//! | Key       | Gateway                | Notes                               |
//! |-----------|------------------------|-------------------------------------|
//! | `stripe`  | Stripe Checkout        | form bodies, minor units            |
//! | `paypal`  | PayPal Orders v2       | OAuth2 client credentials, cached   |
//! | `khipu`   | Khipu v3               | JSON or form notifications          |
//! | `flow`    | Flow.cl                | HMAC-signed form parameters         |
//! | `generic` | Any JSON REST gateway  | URLs from configuration             |
//! | `dummy`   | Simulated              | no I/O, development only            |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pay_core::{Client, ProviderRegistry};
//! use pay_providers::{ProvidersConfig, ReqwestTransport};
//!
//! let registry = ProviderRegistry::new();
//! let transport = ReqwestTransport::shared()?;
//! ProvidersConfig::from_env()?.register_all(&registry, &transport);
//!
//! let client = Client::from_registry(&registry, "stripe")?;
//! let session = client
//!     .checkout("29.99", "EUR", "https://shop.example/ok", "https://shop.example/cancel", None)
//!     .await?;
//! // Redirect user to session.redirect_url
//! ```

pub mod config;
pub mod dummy;
pub mod flow;
pub mod generic;
pub mod http;
pub mod khipu;
pub mod paypal;
pub mod stripe;

mod support;

// Re-exports
pub use config::{
    FlowConfig, GenericConfig, KhipuConfig, PayPalConfig, ProvidersConfig, StripeConfig,
};
pub use dummy::DummyProvider;
pub use flow::{sign_params, FlowProvider};
pub use generic::GenericProvider;
pub use http::ReqwestTransport;
pub use khipu::KhipuProvider;
pub use paypal::PayPalProvider;
pub use stripe::{StripeProvider, StripeSignatureVerifier};
