//! Resolver configuration, stored as plain JSON.
//!
//! Nothing here is secret: the client key is a public identifier and the
//! envelope settings are fixed per integration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use cardseal_crypto_core::EnvelopeConfig;
use serde::{Deserialize, Serialize};

// ── ResolverConfig ─────────────────────────────────────────────────

/// Settings for [`CardBrandResolver`](crate::CardBrandResolver) and the
/// [`Throttler`](crate::Throttler) in front of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    /// Shortest BIN sent to the remote lookup; shorter BINs resolve locally.
    #[serde(default = "default_min_bin_length")]
    pub min_bin_length: usize,

    /// Minimum milliseconds between brand resolutions while typing.
    #[serde(default = "default_throttle_delay_ms")]
    pub throttle_delay_ms: u64,

    /// Client key identifying the merchant to the key endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,

    /// Leading digits reported to callers as the public BIN.
    #[serde(default = "default_public_bin_length")]
    pub public_bin_length: usize,

    /// Token format used when encrypting the BIN.
    #[serde(default)]
    pub envelope: EnvelopeConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_bin_length: default_min_bin_length(),
            throttle_delay_ms: default_throttle_delay_ms(),
            client_key: None,
            public_bin_length: default_public_bin_length(),
            envelope: EnvelopeConfig::default(),
        }
    }
}

const fn default_min_bin_length() -> usize {
    11
}
const fn default_throttle_delay_ms() -> u64 {
    500
}
const fn default_public_bin_length() -> usize {
    6
}

impl ResolverConfig {
    /// Defaults with the given client key.
    #[must_use]
    pub fn with_client_key(client_key: impl Into<String>) -> Self {
        Self {
            client_key: Some(client_key.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn throttle_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_delay_ms)
    }
}

// ── File I/O ───────────────────────────────────────────────────────

const CONFIG_FILE: &str = "cardseal.json";

impl ResolverConfig {
    /// Load from `{config_dir}/cardseal.json`.
    ///
    /// Returns [`Default::default()`] when the file is missing or contains
    /// invalid JSON.
    #[must_use]
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(CONFIG_FILE);
        fs::read_to_string(&path).map_or_else(
            |_| Self::default(),
            |contents| {
                serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), "ignoring corrupt config: {e}");
                    Self::default()
                })
            },
        )
    }

    /// Persist to `{config_dir}/cardseal.json` (write `.tmp`, then rename).
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if the directory does not exist or the
    /// file system rejects the write/rename.
    pub fn save(&self, config_dir: &Path) -> std::io::Result<()> {
        let path = config_dir.join(CONFIG_FILE);
        let tmp = config_dir.join(".cardseal.json.tmp");

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &path)?;

        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────
