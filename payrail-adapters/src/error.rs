//! Adapter layer error types.

use thiserror::Error;

/// Errors raised by gateway drivers and their transport.
///
/// Credential/config errors are fatal at startup and abort adapter manager
/// construction. Business-level negative outcomes (a gateway reporting
/// close/void) are NOT errors: drivers express those as `Failed` snapshots
/// so they flow through the normal snapshot path.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// Missing or invalid gateway credential
    #[error("Credential error: {0}")]
    Credential(String),

    /// Invalid adapter/gateway configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Currency not accepted by this gateway
    #[error("Unsupported currency: {currency}, supported: {supported:?}")]
    UnsupportedCurrency {
        /// Rejected currency code
        currency: String,
        /// Currencies the gateway accepts
        supported: Vec<String>,
    },

    /// Network-level request failure (transient)
    #[error("Request failed: {0}")]
    Request(String),

    /// Request timed out (transient)
    #[error("Request timed out")]
    Timeout,

    /// Gateway returned an error status
    #[error("Gateway error: HTTP {code} - {message}")]
    Gateway {
        /// HTTP status code
        code: u16,
        /// Gateway-supplied error body or summary
        message: String,
    },

    /// Response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Unrecoverable order-level failure
    #[error("Order error: {0}")]
    Order(String),

    /// Inbound webhook was malformed or unroutable
    #[error("Webhook error: {0}")]
    Webhook(String),
}

impl AdapterError {
    /// Whether retrying the same request may succeed.
    ///
    /// Gateway 5xx responses from the retry list are already consumed by the
    /// transport; what surfaces here is only retryable at a higher level for
    /// `Request`/`Timeout`.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Timeout)
    }
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
