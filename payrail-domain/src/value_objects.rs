//! Value Objects for the Payrail Domain
//!
//! Immutable, validated domain primitives.
//! All value objects enforce invariants at construction time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain errors for value object validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Amount must be positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency must be a non-empty alphabetic code
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Order id must be non-empty
    #[error("Invalid order id: {0}")]
    InvalidOrderId(String),

    /// Environment name not recognized
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),
}

// =============================================================================
// Amount
// =============================================================================

/// Amount represents a positive monetary value in a gateway's quote currency
///
/// # Invariants
/// - Must be > 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    /// Create a new Amount with validation
    ///
    /// # Errors
    /// Returns `DomainError::InvalidAmount` if value <= 0
    pub fn new(value: Decimal) -> Result<Self, DomainError> {
        if value <= Decimal::ZERO {
            return Err(DomainError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the underlying Decimal value
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Currency
// =============================================================================

/// Currency represents an ISO-4217 style currency code (e.g., USD, CNY)
///
/// Normalized to uppercase at construction so comparisons against gateway
/// support lists are case-insensitive.
///
/// # Invariants
/// - Must be non-empty
/// - Must be ASCII alphabetic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    /// Create a new Currency with validation
    ///
    /// # Examples
    /// ```
    /// # use payrail_domain::value_objects::Currency;
    /// let currency = Currency::new("usd").unwrap();
    /// assert_eq!(currency.as_str(), "USD");
    /// ```
    ///
    /// # Errors
    /// Returns `DomainError::InvalidCurrency` if the code is empty or
    /// contains non-alphabetic characters
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(DomainError::InvalidCurrency(
                "Currency code must be non-empty".to_string(),
            ));
        }
        if !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::InvalidCurrency(format!(
                "Currency code must be alphabetic: {}",
                code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Get the uppercase currency code
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this currency appears in a gateway's support list
    pub fn is_supported_by(&self, supported: &[&str]) -> bool {
        supported
            .iter()
            .any(|code| code.eq_ignore_ascii_case(&self.0))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
