//! `cardseal-crypto-core`: Pure cryptographic primitives for card tokenization.
//!
//! This crate is the audit target: zero network, zero async, zero logging.
//! Card data enters as [`CardFields`] and leaves only as [`EncryptedToken`]s.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod ccm;

pub mod public_key;

pub mod envelope;

pub mod payload;

pub use envelope::{
    encrypt, encrypt_with, EncryptedToken, EnvelopeConfig, TokenParts, DEFAULT_PREFIX,
    DEFAULT_SEPARATOR,
};
pub use error::CryptoError;
pub use memory::{SecretBuffer, SecretBytes};
pub use payload::{
    encrypt_bin, encrypt_card, encrypt_card_token, encrypt_expiry_month, encrypt_expiry_year,
    encrypt_number, encrypt_security_code, generation_time, CardEncryptor, CardFields,
    EncryptedCard,
};
pub use public_key::{PublicKeyMaterial, RsaPadding};
