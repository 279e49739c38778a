//! Payrail Adapter Layer
//!
//! Defines the capability contract every payment-gateway integration must
//! satisfy, plus the shared pieces integrations build on:
//!
//! - **Ports**: the `GatewayDriver` trait the engine programs against
//! - **Transport**: retrying HTTP client with bounded exponential backoff
//! - **Payload**: content-type aware webhook/response body parsing
//! - **Detector**: routes an inbound webhook to an adapter by its headers
//! - **Stub**: an in-process gateway for tests and sandboxing
//!
//! Real gateway integrations (Alipay, PayPal, ...) live outside this
//! workspace and plug in through `GatewayDriver`.

#![warn(clippy::all)]

pub mod detector;
pub mod error;
pub mod payload;
pub mod ports;
pub mod stub;
pub mod transport;

// Re-exports for convenience
pub use detector::AdapterDetector;
pub use error::AdapterError;
pub use payload::parse_payload;
pub use ports::{GatewayDriver, WebhookHeaders};
pub use stub::StubGateway;
pub use transport::{GatewayResponse, HttpTransport, RetryPolicy};
