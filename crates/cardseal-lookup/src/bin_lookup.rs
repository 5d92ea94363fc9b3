//! BIN lookup wire types and the transport seams.
//!
//! The HTTP client, retries and backoff are the embedding application's
//! business. This module fixes what goes over the wire and the async traits
//! a transport implements.

use std::future::Future;

use cardseal_crypto_core::EncryptedToken;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

use crate::brand::{BrandMatch, CardBrand};
use crate::error::TransportError;

// ── Wire types ─────────────────────────────────────────────────────

/// Request body for the BIN lookup endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinLookupRequest {
    pub encrypted_bin: EncryptedToken,
    pub supported_brands: Vec<CardBrand>,
    pub request_id: String,
}

/// One brand reported by the BIN lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBrand {
    pub brand: CardBrand,
    pub supported: bool,
}

/// Response body of the BIN lookup endpoint.
///
/// Brands the client does not know are dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinLookupResponse {
    #[serde(default, deserialize_with = "known_brands")]
    pub brands: Vec<RemoteBrand>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl BinLookupResponse {
    /// Convert to resolver output, keeping the endpoint's order.
    #[must_use]
    pub fn into_matches(self) -> Vec<BrandMatch> {
        self.brands
            .into_iter()
            .map(|remote| BrandMatch::new(remote.brand, remote.supported))
            .collect()
    }
}

#[derive(Deserialize)]
struct RawBrand {
    brand: String,
    #[serde(default = "default_supported")]
    supported: bool,
}

const fn default_supported() -> bool {
    true
}

fn known_brands<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<RemoteBrand>, D::Error> {
    let raw = Vec::<RawBrand>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|entry| {
            let brand = CardBrand::from_wire(&entry.brand);
            if brand.is_none() {
                tracing::trace!(brand = %entry.brand, "ignoring unknown brand from BIN lookup");
            }
            brand.map(|brand| RemoteBrand {
                brand,
                supported: entry.supported,
            })
        })
        .collect())
}

/// Random RFC 4122 version 4 identifier correlating a request with its
/// response.
#[must_use]
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);

    bytes[6] = (bytes[6] & 0x0F) | 0x40;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

// ── Transport seams ────────────────────────────────────────────────

/// Fetches the RSA public key string for a client key.
///
/// The response is `"version|exponent|modulus"` hex; parsing happens in the
/// caller.
pub trait PublicKeyTransport: Send + Sync + 'static {
    fn fetch_public_key(
        &self,
        client_key: &str,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Sends a BIN lookup request.
pub trait BinLookupTransport: Send + Sync + 'static {
    fn lookup(
        &self,
        request: BinLookupRequest,
    ) -> impl Future<Output = Result<BinLookupResponse, TransportError>> + Send;
}
