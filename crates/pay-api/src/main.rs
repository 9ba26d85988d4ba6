//! # paybridge
//!
//! Provider-agnostic payment service.
//!
//! ## Usage
//!
//! ```bash
//! # Credentials for the gateways you use
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...   # referenced from config/webhooks.toml
//!
//! # Run the server
//! paybridge
//! ```

use pay_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment providers: {:?}", state.registry.list_keys());
    info!(
        "Webhook verification: {:?}",
        state.webhooks.keys().collect::<Vec<_>>()
    );

    let app = routes::create_router(state);

    info!("paybridge {} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    if !is_prod {
        info!("Providers: GET http://{}/api/v1/providers", addr);
        info!("Checkout: POST http://{}/api/v1/{{provider}}/checkout", addr);
        info!("Webhook: POST http://{}/webhook/{{provider}}", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
