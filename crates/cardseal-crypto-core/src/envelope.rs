//! Envelope encryption: a fresh AES-256-CCM session key per token, wrapped
//! with the backend's RSA public key.
//!
//! Token layout:
//!
//! ```text
//! <prefix> SEP base64(RSA(session_key)) SEP base64(iv ‖ ciphertext ‖ tag)
//! ```
//!
//! No state is retained between calls; the session key and IV live in
//! [`SecretBytes`] and are erased when the call returns.

use crate::ccm;
use crate::error::CryptoError;
use crate::memory::SecretBytes;
use crate::public_key::{PublicKeyMaterial, RsaPadding};
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default token prefix understood by the card backend.
pub const DEFAULT_PREFIX: &str = "adyenan0_1_1";

/// Default separator between token components.
pub const DEFAULT_SEPARATOR: char = '$';

/// Envelope settings, fixed for the lifetime of an integration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default)]
    pub padding: RsaPadding,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_owned()
}

const fn default_separator() -> char {
    DEFAULT_SEPARATOR
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            separator: default_separator(),
            padding: RsaPadding::default(),
        }
    }
}

/// An encrypted envelope, ready to send to the backend.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedToken(String);

/// Borrowed view of the three components of an [`EncryptedToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub prefix: &'a str,
    /// Base64 of the RSA-wrapped session key.
    pub wrapped_key: &'a str,
    /// Base64 of `iv ‖ ciphertext ‖ tag`.
    pub sealed_payload: &'a str,
}

impl EncryptedToken {
    /// Wrap an already-formatted token string (e.g. one read back from storage).
    #[must_use]
    pub const fn from_string(token: String) -> Self {
        Self(token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Split into prefix, wrapped key and sealed payload.
    ///
    /// Returns `None` unless the token has exactly three non-empty
    /// components.
    #[must_use]
    pub fn parts(&self, separator: char) -> Option<TokenParts<'_>> {
        let mut it = self.0.split(separator);
        let prefix = it.next()?;
        let wrapped_key = it.next()?;
        let sealed_payload = it.next()?;
        if it.next().is_some()
            || prefix.is_empty()
            || wrapped_key.is_empty()
            || sealed_payload.is_empty()
        {
            return None;
        }
        Some(TokenParts {
            prefix,
            wrapped_key,
            sealed_payload,
        })
    }
}

impl fmt::Display for EncryptedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are opaque but long; show only the prefix.
impl fmt::Debug for EncryptedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(16).collect();
        write!(f, "EncryptedToken({head}…, {} chars)", self.0.len())
    }
}

impl AsRef<str> for EncryptedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encrypt `plaintext` under `key` with the default [`EnvelopeConfig`].
///
/// # Errors
///
/// - [`CryptoError::RandomGeneration`] if the CSPRNG fails
/// - [`CryptoError::AesEncryption`] if the plaintext exceeds the CCM limit
/// - [`CryptoError::RsaEncryption`] if the session key cannot be wrapped
pub fn encrypt(plaintext: &[u8], key: &PublicKeyMaterial) -> Result<EncryptedToken, CryptoError> {
    encrypt_with(&EnvelopeConfig::default(), plaintext, key)
}

/// Encrypt `plaintext` under `key` using an explicit configuration.
///
/// # Errors
///
/// Same as [`encrypt`].
pub fn encrypt_with(
    config: &EnvelopeConfig,
    plaintext: &[u8],
    key: &PublicKeyMaterial,
) -> Result<EncryptedToken, CryptoError> {
    let session_key = SecretBytes::<{ ccm::KEY_LEN }>::random()?;
    let iv = SecretBytes::<{ ccm::NONCE_LEN }>::random()?;

    let sealed = ccm::seal(session_key.expose(), iv.expose(), plaintext)?;
    let wrapped_key = key.encrypt(session_key.expose(), config.padding)?;

    let mut body = Vec::with_capacity(ccm::NONCE_LEN.saturating_add(sealed.len()));
    body.extend_from_slice(iv.expose());
    body.extend_from_slice(&sealed);

    let sep = config.separator;
    Ok(EncryptedToken(format!(
        "{}{sep}{}{sep}{}",
        config.prefix,
        BASE64.encode(&wrapped_key),
        BASE64.encode(&body),
    )))
}
