//! Engine error types.

use payrail_adapters::AdapterError;
use thiserror::Error;

/// Errors raised by the order engine and adapter manager.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An order with this id already has a context
    #[error("Order already exists: {0}")]
    DuplicateOrder(String),

    /// No context exists for this order id
    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    /// Adapter name not present in the registry
    #[error("Adapter not registered: {0}")]
    AdapterNotRegistered(String),

    /// Gateway driver error
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
