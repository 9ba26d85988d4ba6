//! # pay-core
//!
//! Gateway-independent normalization and verification engine.
//!
//! This crate provides:
//! - Exact decimal amount codec and currency exponents (`amount`, `currency`)
//! - Canonical `PaymentState` and the raw-status normaliser (`state`)
//! - Webhook signature verification and lenient event parsing (`webhook`)
//! - The `Provider` contract and a thread-safe `ProviderRegistry`
//! - Transport and auth contracts, and the `Client` facade
//! - `PaymentError` for typed error handling
//!
//! No network I/O happens here: providers receive a [`Transport`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use pay_core::{Client, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new();
//! registry.register("stripe", stripe_provider);
//!
//! let client = Client::from_registry(&registry, "stripe")?;
//! let session = client
//!     .checkout("29.99", "EUR", "https://shop.example/ok", "https://shop.example/cancel", None)
//!     .await?;
//!
//! // Redirect the customer to session.redirect_url
//! ```

pub mod amount;
pub mod auth;
pub mod client;
pub mod currency;
pub mod error;
pub mod models;
pub mod provider;
pub mod registry;
pub mod state;
pub mod transport;
pub mod webhook;

// Re-exports for convenience
pub use amount::{
    from_minor_units, parse_amount, quantize, to_decimal_string, to_decimal_string_with,
    to_minor_units, Money,
};
pub use auth::{ApiKeyAuth, AuthStrategy, BasicAuth, SharedAuth, TokenAuth};
pub use client::{Client, RequestOptions};
pub use error::{PaymentError, PaymentResult};
pub use models::{CheckoutRequest, CheckoutSession, Metadata, PaymentStatus, WebhookEvent};
pub use provider::{Provider, ProviderInfo, ProviderSelector, SharedProvider};
pub use registry::ProviderRegistry;
pub use state::{normalise_state, PaymentState, StateOverrides};
pub use transport::{
    Headers, HttpRequest, HttpResponse, Method, MockTransport, RequestBody, ResponseBody,
    SharedTransport, Transport,
};
pub use webhook::{
    compute_signature, parse_event, verify_signature, DigestAlgorithm, EventParser,
    WebhookVerifier,
};

/// Re-exported so adapters and callers share one decimal type
pub use rust_decimal::Decimal;
