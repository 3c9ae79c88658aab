//! Error types for the dhv-pricer library.
//!
//! All fallible operations return `Result<T, PricerError>` rather than
//! panicking. Every variant is terminal for the single quote request that
//! raised it: the engine is a pure function and never retries.

use thiserror::Error;

use crate::fixed::Fixed18;

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, PricerError>;

/// Errors that can occur while configuring the pricer or computing a quote.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PricerError {
    /// No SABR parameter set has been configured for the expiration.
    #[error("missing volatility data for expiration {expiration}")]
    MissingVolatilityData { expiration: u64 },

    /// The expiration lies at or beyond the last interpolable tenor.
    #[error("tenor out of range: sqrt(tau) {sqrt_tau} reaches grid maximum {max_tenor_value}")]
    OutOfRangeTenor {
        /// Square root of seconds to expiry.
        sqrt_tau: Fixed18,
        /// Configured `max_tenor_value`.
        max_tenor_value: Fixed18,
    },

    /// Time to expiry is zero or negative.
    #[error("series expired: expiration {expiration} is not after {now}")]
    ExpiredSeries { expiration: u64, now: u64 },

    /// A setter or constructor received values that violate an invariant
    /// (array length mismatch, rate out of range, ...).
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Request arguments are invalid (e.g. non-positive trade size).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Fixed-point computation failed (overflow, log of non-positive value,
    /// division by zero).
    #[error("numerical error: {message}")]
    NumericalError { message: String },

    /// A collaborator (price feed, margin calculator) could not answer.
    #[error("feed error: {message}")]
    Feed { message: String },
}

impl PricerError {
    pub(crate) fn numerical(message: impl Into<String>) -> Self {
        Self::NumericalError {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}
