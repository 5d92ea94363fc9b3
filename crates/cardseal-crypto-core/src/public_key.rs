//! RSA public key material for wrapping per-token session keys.
//!
//! Keys arrive from the key endpoint as a pipe-delimited hex string:
//!
//! ```text
//! version|exponent|modulus      (current form)
//! exponent|modulus              (legacy form, empty version)
//! ```
//!
//! [`PublicKeyMaterial::parse`] validates the hex and builds the RSA key once,
//! so every subsequent encryption reuses the parsed key.

use crate::error::CryptoError;
use data_encoding::HEXLOWER_PERMISSIVE;
use rand::rngs::OsRng;
use rsa::{BigUint, Oaep, Pkcs1v15Encrypt, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

/// Separator between the components of a key string.
pub const KEY_COMPONENT_SEPARATOR: char = '|';

/// RSA padding scheme negotiated with the token backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RsaPadding {
    /// RSAES-PKCS1-v1_5 (what the card backend accepts by default).
    #[default]
    Pkcs1v15,
    /// RSAES-OAEP with SHA-256 and MGF1-SHA-256.
    OaepSha256,
}

/// Parsed `version|exponent|modulus` public key.
///
/// Immutable once parsed and cheap to clone; share it across encryption calls.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyMaterial {
    version: String,
    exponent: String,
    modulus: String,
    key: RsaPublicKey,
}

impl PublicKeyMaterial {
    /// Parse a key string.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKey`] if the string does not have two or
    /// three `|`-separated components, a component is not valid hex, or the
    /// numbers do not form a usable RSA public key.
    pub fn parse(raw: &str) -> Result<Self, CryptoError> {
        let parts: Vec<&str> = raw.trim().split(KEY_COMPONENT_SEPARATOR).collect();
        let (version, exponent, modulus) = match parts.as_slice() {
            [version, exponent, modulus] => (*version, *exponent, *modulus),
            [exponent, modulus] => ("", *exponent, *modulus),
            _ => {
                return Err(CryptoError::InvalidKey(format!(
                    "expected 'version|exponent|modulus', got {} component(s)",
                    parts.len()
                )))
            }
        };

        let e = decode_hex_component("exponent", exponent)?;
        let n = decode_hex_component("modulus", modulus)?;
        let key = RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
            .map_err(|e| CryptoError::InvalidKey(format!("rejected RSA parameters: {e}")))?;

        Ok(Self {
            version: version.to_owned(),
            exponent: exponent.to_owned(),
            modulus: modulus.to_owned(),
            key,
        })
    }

    /// Key version tag (empty for legacy two-part keys).
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Public exponent as received (hex).
    #[must_use]
    pub fn exponent(&self) -> &str {
        &self.exponent
    }

    /// Modulus as received (hex).
    #[must_use]
    pub fn modulus(&self) -> &str {
        &self.modulus
    }

    /// Modulus size in bytes; the upper bound on RSA ciphertext length.
    #[must_use]
    pub fn modulus_len(&self) -> usize {
        rsa::traits::PublicKeyParts::size(&self.key)
    }

    /// Stable identifier for logs and cache keys: BLAKE3 of `exponent|modulus`.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.exponent.to_ascii_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(self.modulus.to_ascii_lowercase().as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Encrypt a short secret (the session key) under this public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::RsaEncryption`] if the data is too long for the
    /// modulus or the padding operation fails.
    pub fn encrypt(&self, data: &[u8], padding: RsaPadding) -> Result<Vec<u8>, CryptoError> {
        let result = match padding {
            RsaPadding::Pkcs1v15 => self.key.encrypt(&mut OsRng, Pkcs1v15Encrypt, data),
            RsaPadding::OaepSha256 => self.key.encrypt(&mut OsRng, Oaep::new::<Sha256>(), data),
        };
        result.map_err(|e| CryptoError::RsaEncryption(e.to_string()))
    }
}

impl FromStr for PublicKeyMaterial {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for PublicKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyMaterial")
            .field("version", &self.version)
            .field("modulus_bits", &self.modulus_len().saturating_mul(8))
            .finish_non_exhaustive()
    }
}

/// Decode one hex component, tolerating an odd digit count (leading zero).
fn decode_hex_component(name: &str, hex: &str) -> Result<Vec<u8>, CryptoError> {
    if hex.is_empty() {
        return Err(CryptoError::InvalidKey(format!("{name} is empty")));
    }
    let padded;
    let even = if hex.len() % 2 == 1 {
        padded = format!("0{hex}");
        padded.as_str()
    } else {
        hex
    };
    HEXLOWER_PERMISSIVE
        .decode(even.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(format!("{name} is not valid hex: {e}")))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
