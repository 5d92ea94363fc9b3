//! Cryptographic error types for `cardseal-crypto-core`.

use thiserror::Error;

/// Errors produced by card validation and envelope encryption.
///
/// Field-level variants (`Invalid*`) are raised before any cryptographic
/// work starts and are always recoverable by re-prompting the user.
/// The remaining variants are terminal for the current encryption attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The OS CSPRNG could not produce session key or IV bytes.
    #[error("random generation failed: {0}")]
    RandomGeneration(String),

    /// AES-256-CCM sealing failed (bad key/nonce length, message too long).
    #[error("AES encryption failed: {0}")]
    AesEncryption(String),

    /// RSA encryption of the session key failed (e.g. key too small).
    #[error("RSA encryption failed: {0}")]
    RsaEncryption(String),

    /// Authentication tag verification failed: ciphertext tampered or wrong key.
    #[error("decryption failed: authentication tag mismatch")]
    Decryption,

    /// Malformed public key string (not `version|exponent|modulus` hex).
    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// The plaintext payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Payload(String),

    /// Every card field was absent.
    #[error("card has no number, security code, expiry month or expiry year")]
    InvalidCard,

    /// Card number empty or not all digits.
    #[error("card number is empty or contains non-digit characters")]
    InvalidNumber,

    /// Security code empty or not all digits.
    #[error("security code is empty or contains non-digit characters")]
    InvalidSecurityCode,

    /// Expiry month empty or not all digits.
    #[error("expiry month is empty or contains non-digit characters")]
    InvalidExpiryMonth,

    /// Expiry year empty or not all digits.
    #[error("expiry year is empty or contains non-digit characters")]
    InvalidExpiryYear,

    /// BIN empty or not all digits.
    #[error("BIN is empty or contains non-digit characters")]
    InvalidBin,
}

impl CryptoError {
    /// Returns `true` for field-level validation errors that never reached
    /// the cryptographic layer.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidCard
                | Self::InvalidNumber
                | Self::InvalidSecurityCode
                | Self::InvalidExpiryMonth
                | Self::InvalidExpiryYear
                | Self::InvalidBin
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(CryptoError::InvalidBin.is_validation());
        assert!(CryptoError::InvalidCard.is_validation());
        assert!(!CryptoError::Decryption.is_validation());
        assert!(!CryptoError::InvalidKey("x".into()).is_validation());
    }

    #[test]
    fn messages_carry_context() {
        let err = CryptoError::RsaEncryption("message too long".into());
        assert_eq!(err.to_string(), "RSA encryption failed: message too long");
    }
}
