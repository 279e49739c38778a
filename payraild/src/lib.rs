//! Payrail Service Layer
//!
//! Runtime entry point over the order lifecycle engine.
//!
//! # Architecture
//!
//! ```text
//! Caller → PayrailService → Order Engine → Gateway Driver
//!               │                 │
//!          Adapter Detector   Event Bus (order paid / failed)
//!          (webhook routing)
//! ```
//!
//! # Components
//!
//! - **PayrailService**: the inbound operations (create, capture, webhook
//!   verification, status confirmation) funneled through the engine
//! - **Config**: environment-based configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use payraild::{Config, PayrailService};
//!
//! let config = Config::from_env()?;
//! let service = PayrailService::create(config, factories, None).await?;
//! let snapshot = service
//!     .create_order("stub", &order_id, amount, "USD", "Sticker pack", None)
//!     .await?;
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod service;

// Re-exports for convenience
pub use config::{Config, EndpointsConfig};
pub use error::{ServiceError, ServiceResult};
pub use service::PayrailService;

/// Install the global tracing subscriber (fmt layer + `RUST_LOG` filter).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
