//! Brand/validation resolver: partial card number in, matching brands out.
//!
//! Short BINs resolve against the local prefix table. Long BINs are
//! encrypted and sent to the BIN lookup endpoint; a non-empty remote answer
//! replaces the local one. Any remote failure falls back to the local
//! answer, so [`CardBrandResolver::resolve`] never fails.

use std::sync::Arc;

use cardseal_crypto_core::CardEncryptor;

use crate::bin_lookup::{
    generate_request_id, BinLookupRequest, BinLookupTransport, PublicKeyTransport,
};
use crate::brand::{local_matches, BrandMatch, CardBrand};
use crate::config::ResolverConfig;
use crate::error::LookupError;
use crate::public_key::PublicKeyProvider;
use crate::validation::{public_bin, sanitize};

/// Resolves card brands for a partially entered card number.
pub struct CardBrandResolver<K, B> {
    config: ResolverConfig,
    keys: PublicKeyProvider<K>,
    bin_lookup: Arc<B>,
    encryptor: CardEncryptor,
}

impl<K, B> CardBrandResolver<K, B>
where
    K: PublicKeyTransport,
    B: BinLookupTransport,
{
    #[must_use]
    pub fn new(config: ResolverConfig, keys: PublicKeyProvider<K>, bin_lookup: B) -> Self {
        let encryptor = CardEncryptor::new(config.envelope.clone());
        Self {
            config,
            keys,
            bin_lookup: Arc::new(bin_lookup),
            encryptor,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The key provider, e.g. to invalidate after an invalid-key error.
    #[must_use]
    pub const fn public_keys(&self) -> &PublicKeyProvider<K> {
        &self.keys
    }

    /// Leading digits of `input` reported as the public BIN.
    #[must_use]
    pub fn public_bin(&self, input: &str) -> String {
        public_bin(&sanitize(input), self.config.public_bin_length).to_owned()
    }

    /// Brands `bin` may belong to, restricted to `supported`.
    ///
    /// Never fails: remote problems are logged and answered locally.
    pub async fn resolve(&self, bin: &str, supported: &[CardBrand]) -> Vec<BrandMatch> {
        let digits = sanitize(bin);
        let local = local_matches(&digits, supported);

        if digits.len() < self.config.min_bin_length {
            tracing::trace!(bin_len = digits.len(), "resolved locally");
            return local;
        }

        match self.resolve_remote(&digits, supported).await {
            Ok(remote) if !remote.is_empty() => {
                tracing::debug!(
                    bin_len = digits.len(),
                    brands = ?remote.iter().map(|m| m.brand.as_str()).collect::<Vec<_>>(),
                    "resolved by BIN lookup"
                );
                remote
            }
            Ok(_) => {
                tracing::debug!(bin_len = digits.len(), "BIN lookup returned no brands, using local table");
                local
            }
            Err(e) => {
                tracing::warn!(bin_len = digits.len(), "BIN lookup failed, using local table: {e}");
                local
            }
        }
    }

    /// Local table only; never touches the network.
    #[must_use]
    pub fn resolve_local(&self, bin: &str, supported: &[CardBrand]) -> Vec<BrandMatch> {
        local_matches(&sanitize(bin), supported)
    }

    async fn resolve_remote(
        &self,
        digits: &str,
        supported: &[CardBrand],
    ) -> Result<Vec<BrandMatch>, LookupError> {
        let client_key = self
            .config
            .client_key
            .as_deref()
            .ok_or(LookupError::MissingClientKey)?;
        let key = self.keys.fetch(client_key).await?;
        let encrypted_bin = self.encryptor.encrypt_bin(digits, &key)?;

        let request_id = generate_request_id();
        let request = BinLookupRequest {
            encrypted_bin,
            supported_brands: supported.to_vec(),
            request_id: request_id.clone(),
        };
        let response = self.bin_lookup.lookup(request).await?;

        if let Some(echoed) = response.request_id.as_deref() {
            if echoed != request_id {
                tracing::debug!("discarding BIN lookup response for a different request");
                return Ok(Vec::new());
            }
        }
        Ok(response.into_matches())
    }
}
