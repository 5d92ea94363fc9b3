//! Error types for `cardseal-lookup`.

use cardseal_crypto_core::CryptoError;
use thiserror::Error;

/// Failure reported by an injected transport (HTTP client, test double).
///
/// Transports decide their own failure taxonomy; the lookup layer only
/// needs a message for logs and a flag for whether a retry could help.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    retryable: bool,
}

impl TransportError {
    /// A failure that may succeed on retry (timeout, connection reset).
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that will not change on retry (4xx, malformed response).
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Errors produced while obtaining keys or resolving brands.
///
/// `Clone` so a single fetch failure can be delivered to every coalesced
/// waiter unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Cryptographic operation failed (delegated from crypto-core).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The key endpoint returned something that is not a usable public key.
    #[error("invalid public key from key endpoint: {0}")]
    InvalidKey(String),

    /// The transport failed to deliver a response.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No client key configured, so the key endpoint cannot be queried.
    #[error("no client key configured")]
    MissingClientKey,
}
