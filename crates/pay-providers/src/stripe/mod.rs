//! # Stripe
//!
//! Hosted Checkout Sessions plus Stripe's own `t=...,v1=...` webhook
//! signature scheme.
//!
//! ```rust,ignore
//! use pay_providers::{ReqwestTransport, StripeConfig, StripeProvider};
//!
//! let provider = StripeProvider::new(StripeConfig::new("sk_test_..."), ReqwestTransport::shared()?);
//! let session = provider.create_checkout(&request).await?;
//! // Redirect user to session.redirect_url
//! ```

pub mod checkout;
pub mod webhook;

pub use checkout::{StripeProvider, STRIPE_STATES};
pub use webhook::{StripeSignatureVerifier, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER};
