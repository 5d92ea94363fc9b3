//! Card payloads and per-field encryption.
//!
//! Card fields are serialized to a small JSON document stamped with a
//! `generationtime`, then sealed with [`crate::envelope`]. Field validation
//! runs before any cryptographic work: each encrypted field must be a
//! non-empty string of ASCII digits.

use crate::envelope::{self, EncryptedToken, EnvelopeConfig};
use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use crate::public_key::PublicKeyMaterial;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// `generationtime` format: ISO-8601 UTC with millisecond precision.
const GENERATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format `now` the way the backend expects `generationtime`.
#[must_use]
pub fn generation_time(now: DateTime<Utc>) -> String {
    now.format(GENERATION_TIME_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// CardFields
// ---------------------------------------------------------------------------

/// Plaintext card data as entered by the user.
///
/// Erased on drop; `Debug` only reports which fields are present.
#[derive(Default, Clone, Zeroize, ZeroizeOnDrop)]
pub struct CardFields {
    pub number: Option<String>,
    pub security_code: Option<String>,
    pub expiry_month: Option<String>,
    pub expiry_year: Option<String>,
    pub holder_name: Option<String>,
    /// Raw leading digits, sealed as a BIN payload.
    pub bin: Option<String>,
}

impl CardFields {
    #[must_use]
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    #[must_use]
    pub fn with_security_code(mut self, security_code: impl Into<String>) -> Self {
        self.security_code = Some(security_code.into());
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, month: impl Into<String>, year: impl Into<String>) -> Self {
        self.expiry_month = Some(month.into());
        self.expiry_year = Some(year.into());
        self
    }

    #[must_use]
    pub fn with_expiry_month(mut self, month: impl Into<String>) -> Self {
        self.expiry_month = Some(month.into());
        self
    }

    #[must_use]
    pub fn with_expiry_year(mut self, year: impl Into<String>) -> Self {
        self.expiry_year = Some(year.into());
        self
    }

    #[must_use]
    pub fn with_holder_name(mut self, holder_name: impl Into<String>) -> Self {
        self.holder_name = Some(holder_name.into());
        self
    }

    #[must_use]
    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = Some(bin.into());
        self
    }

    /// `true` when number, security code and both expiry parts are all absent.
    ///
    /// The holder name or BIN alone does not make a card.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.number.is_none()
            && self.security_code.is_none()
            && self.expiry_month.is_none()
            && self.expiry_year.is_none()
    }
}

impl fmt::Debug for CardFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(field: Option<&String>) -> &'static str {
            if field.is_some() {
                "***"
            } else {
                "None"
            }
        }
        f.debug_struct("CardFields")
            .field("number", &mask(self.number.as_ref()))
            .field("security_code", &mask(self.security_code.as_ref()))
            .field("expiry_month", &mask(self.expiry_month.as_ref()))
            .field("expiry_year", &mask(self.expiry_year.as_ref()))
            .field("holder_name", &mask(self.holder_name.as_ref()))
            .field("bin", &mask(self.bin.as_ref()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// JSON document sealed into a card token. Absent fields are omitted.
#[derive(Serialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct CardPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    number: Option<&'a str>,
    #[serde(rename = "cvc", skip_serializing_if = "Option::is_none")]
    security_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry_month: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry_year: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    holder_name: Option<&'a str>,
    #[serde(rename = "generationtime")]
    generation_time: String,
}

/// JSON document sealed into a BIN lookup token.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BinPayload<'a> {
    bin_value: &'a str,
    #[serde(rename = "generationtime")]
    generation_time: String,
}

fn to_secret_json<T: Serialize>(payload: &T) -> Result<SecretBuffer, CryptoError> {
    serde_json::to_vec(payload)
        .map(SecretBuffer::from_vec)
        .map_err(|e| CryptoError::Payload(e.to_string()))
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn require_digits(value: &str, err: CryptoError) -> Result<&str, CryptoError> {
    if is_digits(value) {
        Ok(value)
    } else {
        Err(err)
    }
}

// ---------------------------------------------------------------------------
// CardEncryptor
// ---------------------------------------------------------------------------

/// Independently encrypted card fields, one token per present field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<EncryptedToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_code: Option<EncryptedToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<EncryptedToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<EncryptedToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<EncryptedToken>,
}

/// Encrypts card fields and BINs with a fixed [`EnvelopeConfig`].
///
/// Stateless apart from the configuration; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct CardEncryptor {
    config: EnvelopeConfig,
}

impl CardEncryptor {
    #[must_use]
    pub const fn new(config: EnvelopeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Encrypt each present field of `card` into its own token. The BIN,
    /// when present, is sealed as a BIN payload.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidCard`] if the card is empty, the matching
    /// `Invalid*` variant for a malformed field, or any envelope error.
    pub fn encrypt_card(
        &self,
        card: CardFields,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedCard, CryptoError> {
        if card.is_empty() {
            return Err(CryptoError::InvalidCard);
        }
        let now = Utc::now();
        let number = card
            .number
            .as_deref()
            .map(|n| self.number_at(n, key, now))
            .transpose()?;
        let security_code = card
            .security_code
            .as_deref()
            .map(|c| self.security_code_at(c, key, now))
            .transpose()?;
        let expiry_month = card
            .expiry_month
            .as_deref()
            .map(|m| self.expiry_month_at(m, key, now))
            .transpose()?;
        let expiry_year = card
            .expiry_year
            .as_deref()
            .map(|y| self.expiry_year_at(y, key, now))
            .transpose()?;
        let bin = card
            .bin
            .as_deref()
            .map(|b| self.bin_at(b, key, now))
            .transpose()?;

        Ok(EncryptedCard {
            number,
            security_code,
            expiry_month,
            expiry_year,
            bin,
        })
    }

    /// Encrypt the whole card, holder name included, into a single token.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidCard`] if the card is empty, otherwise any
    /// envelope error.
    pub fn encrypt_card_token(
        &self,
        card: CardFields,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        if card.is_empty() {
            return Err(CryptoError::InvalidCard);
        }
        let payload = CardPayload {
            number: card.number.as_deref(),
            security_code: card.security_code.as_deref(),
            expiry_month: card.expiry_month.as_deref(),
            expiry_year: card.expiry_year.as_deref(),
            holder_name: card.holder_name.as_deref(),
            generation_time: generation_time(Utc::now()),
        };
        self.seal(&payload, key)
    }

    /// # Errors
    ///
    /// [`CryptoError::InvalidNumber`] or any envelope error.
    pub fn encrypt_number(
        &self,
        number: &str,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        self.number_at(number, key, Utc::now())
    }

    /// # Errors
    ///
    /// [`CryptoError::InvalidSecurityCode`] or any envelope error.
    pub fn encrypt_security_code(
        &self,
        security_code: &str,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        self.security_code_at(security_code, key, Utc::now())
    }

    /// # Errors
    ///
    /// [`CryptoError::InvalidExpiryMonth`] or any envelope error.
    pub fn encrypt_expiry_month(
        &self,
        expiry_month: &str,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        self.expiry_month_at(expiry_month, key, Utc::now())
    }

    /// # Errors
    ///
    /// [`CryptoError::InvalidExpiryYear`] or any envelope error.
    pub fn encrypt_expiry_year(
        &self,
        expiry_year: &str,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        self.expiry_year_at(expiry_year, key, Utc::now())
    }

    /// Encrypt a BIN (the leading digits of a PAN) for a BIN lookup.
    ///
    /// # Errors
    ///
    /// [`CryptoError::InvalidBin`] or any envelope error.
    pub fn encrypt_bin(
        &self,
        bin: &str,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        self.bin_at(bin, key, Utc::now())
    }

    fn bin_at(
        &self,
        bin: &str,
        key: &PublicKeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<EncryptedToken, CryptoError> {
        let payload = BinPayload {
            bin_value: require_digits(bin, CryptoError::InvalidBin)?,
            generation_time: generation_time(now),
        };
        self.seal(&payload, key)
    }

    fn number_at(
        &self,
        number: &str,
        key: &PublicKeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<EncryptedToken, CryptoError> {
        let payload = CardPayload {
            number: Some(require_digits(number, CryptoError::InvalidNumber)?),
            generation_time: generation_time(now),
            ..CardPayload::default()
        };
        self.seal(&payload, key)
    }

    fn security_code_at(
        &self,
        security_code: &str,
        key: &PublicKeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<EncryptedToken, CryptoError> {
        let payload = CardPayload {
            security_code: Some(require_digits(
                security_code,
                CryptoError::InvalidSecurityCode,
            )?),
            generation_time: generation_time(now),
            ..CardPayload::default()
        };
        self.seal(&payload, key)
    }

    fn expiry_month_at(
        &self,
        expiry_month: &str,
        key: &PublicKeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<EncryptedToken, CryptoError> {
        let payload = CardPayload {
            expiry_month: Some(require_digits(
                expiry_month,
                CryptoError::InvalidExpiryMonth,
            )?),
            generation_time: generation_time(now),
            ..CardPayload::default()
        };
        self.seal(&payload, key)
    }

    fn expiry_year_at(
        &self,
        expiry_year: &str,
        key: &PublicKeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<EncryptedToken, CryptoError> {
        let payload = CardPayload {
            expiry_year: Some(require_digits(expiry_year, CryptoError::InvalidExpiryYear)?),
            generation_time: generation_time(now),
            ..CardPayload::default()
        };
        self.seal(&payload, key)
    }

    fn seal<T: Serialize>(
        &self,
        payload: &T,
        key: &PublicKeyMaterial,
    ) -> Result<EncryptedToken, CryptoError> {
        let json = to_secret_json(payload)?;
        envelope::encrypt_with(&self.config, json.expose(), key)
    }
}

// ---------------------------------------------------------------------------
// Default-config shorthands
// ---------------------------------------------------------------------------

/// [`CardEncryptor::encrypt_card`] with the default envelope.
///
/// # Errors
///
/// See [`CardEncryptor::encrypt_card`].
pub fn encrypt_card(card: CardFields, key: &PublicKeyMaterial) -> Result<EncryptedCard, CryptoError> {
    CardEncryptor::default().encrypt_card(card, key)
}

/// [`CardEncryptor::encrypt_card_token`] with the default envelope.
///
/// # Errors
///
/// See [`CardEncryptor::encrypt_card_token`].
pub fn encrypt_card_token(
    card: CardFields,
    key: &PublicKeyMaterial,
) -> Result<EncryptedToken, CryptoError> {
    CardEncryptor::default().encrypt_card_token(card, key)
}

/// # Errors
///
/// See [`CardEncryptor::encrypt_number`].
pub fn encrypt_number(number: &str, key: &PublicKeyMaterial) -> Result<EncryptedToken, CryptoError> {
    CardEncryptor::default().encrypt_number(number, key)
}

/// # Errors
///
/// See [`CardEncryptor::encrypt_security_code`].
pub fn encrypt_security_code(
    security_code: &str,
    key: &PublicKeyMaterial,
) -> Result<EncryptedToken, CryptoError> {
    CardEncryptor::default().encrypt_security_code(security_code, key)
}

/// # Errors
///
/// See [`CardEncryptor::encrypt_expiry_month`].
pub fn encrypt_expiry_month(
    expiry_month: &str,
    key: &PublicKeyMaterial,
) -> Result<EncryptedToken, CryptoError> {
    CardEncryptor::default().encrypt_expiry_month(expiry_month, key)
}

/// # Errors
///
/// See [`CardEncryptor::encrypt_expiry_year`].
pub fn encrypt_expiry_year(
    expiry_year: &str,
    key: &PublicKeyMaterial,
) -> Result<EncryptedToken, CryptoError> {
    CardEncryptor::default().encrypt_expiry_year(expiry_year, key)
}

/// # Errors
///
/// See [`CardEncryptor::encrypt_bin`].
pub fn encrypt_bin(bin: &str, key: &PublicKeyMaterial) -> Result<EncryptedToken, CryptoError> {
    CardEncryptor::default().encrypt_bin(bin, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn generation_time_has_millisecond_precision() {
        assert_eq!(generation_time(fixed_time()), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn full_card_payload_snapshot() {
        let payload = CardPayload {
            number: Some("4111111111111111"),
            security_code: Some("737"),
            expiry_month: Some("03"),
            expiry_year: Some("2030"),
            holder_name: Some("J. Smith"),
            generation_time: generation_time(fixed_time()),
        };
        insta::assert_json_snapshot!(payload, @r#"
        {
          "number": "4111111111111111",
          "cvc": "737",
          "expiryMonth": "03",
          "expiryYear": "2030",
          "holderName": "J. Smith",
          "generationtime": "2024-01-01T00:00:00.000Z"
        }
        "#);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let payload = CardPayload {
            security_code: Some("737"),
            generation_time: generation_time(fixed_time()),
            ..CardPayload::default()
        };
        let json = String::from_utf8(serde_json::to_vec(&payload).unwrap()).unwrap();
        assert_eq!(json, r#"{"cvc":"737","generationtime":"2024-01-01T00:00:00.000Z"}"#);
    }

    #[test]
    fn bin_payload_snapshot() {
        let payload = BinPayload {
            bin_value: "41111111111",
            generation_time: generation_time(fixed_time()),
        };
        insta::assert_json_snapshot!(payload, @r#"
        {
          "binValue": "41111111111",
          "generationtime": "2024-01-01T00:00:00.000Z"
        }
        "#);
    }

    #[test]
    fn digits_only_validation() {
        assert!(is_digits("0123456789"));
        assert!(!is_digits(""));
        assert!(!is_digits("4111 1111"));
        assert!(!is_digits("12a"));
        assert!(!is_digits("١٢٣"));
    }

    #[test]
    fn empty_card_is_detected() {
        assert!(CardFields::default().is_empty());
        assert!(CardFields::default().with_holder_name("J. Smith").is_empty());
        assert!(CardFields::default().with_bin("411111").is_empty());
        assert!(!CardFields::default().with_expiry_month("3").is_empty());
    }

    #[test]
    fn debug_masks_values() {
        let card = CardFields::default()
            .with_number("4111111111111111")
            .with_security_code("737")
            .with_bin("411111");
        let debug = format!("{card:?}");
        assert!(!debug.contains("4111"));
        assert!(debug.contains("bin: \"***\""));
        assert!(!debug.contains("737"));
        assert!(debug.contains("number: \"***\""));
        assert!(debug.contains("holder_name: \"None\""));
    }
}
