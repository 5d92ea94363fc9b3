//! `cardseal-lookup`: Card brand resolution for cardseal.
//!
//! Async consumer of `cardseal-crypto-core`: coalescing public key cache,
//! BIN lookup wire types and transport seams, the local brand table, card
//! number validation, and a keystroke throttler. HTTP is left to the
//! embedding application through [`PublicKeyTransport`] and
//! [`BinLookupTransport`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod cache;
pub mod config;
pub mod error;

pub mod bin_lookup;
pub mod brand;
pub mod public_key;

pub mod resolver;

pub mod throttle;
pub mod validation;

pub use bin_lookup::{
    generate_request_id, BinLookupRequest, BinLookupResponse, BinLookupTransport,
    PublicKeyTransport, RemoteBrand,
};
pub use brand::{local_matches, BrandMatch, CardBrand, UnknownBrand};
pub use cache::CoalescingCache;
pub use config::ResolverConfig;
pub use error::{LookupError, TransportError};
pub use public_key::PublicKeyProvider;
pub use resolver::CardBrandResolver;
pub use throttle::Throttler;
pub use validation::{
    is_valid_card_number, is_valid_expiry_month, is_valid_security_code, luhn_check, public_bin,
    sanitize, valid_pan_length, MIN_VALID_CARD_LENGTH,
};
