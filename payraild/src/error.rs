//! Service layer error types.

use payrail_adapters::AdapterError;
use payrail_domain::DomainError;
use payrail_engine::EngineError;
use thiserror::Error;

/// Service-level errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Domain validation error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Adapter error
    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No detector rule matched an inbound webhook
    #[error("Cannot route webhook to a registered adapter")]
    UnroutableWebhook,
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
