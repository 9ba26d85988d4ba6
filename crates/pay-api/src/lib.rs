//! # pay-api
//!
//! HTTP service exposing the paybridge facade.
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/providers` | Registered providers |
//! | POST | `/api/v1/{provider}/checkout` | Create checkout session |
//! | GET | `/api/v1/{provider}/payments/{payment_id}` | Payment status |
//! | POST | `/webhook/{provider}` | Verified webhook intake |
//!
//! Webhooks are only accepted for providers listed in `config/webhooks.toml`;
//! the signature is checked against the raw body before anything is parsed.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
