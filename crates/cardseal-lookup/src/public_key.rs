//! Public key provider: one key fetch per client key, shared by every
//! concurrent caller.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use cardseal_crypto_core::PublicKeyMaterial;

use crate::bin_lookup::PublicKeyTransport;
use crate::cache::CoalescingCache;
use crate::error::LookupError;

type KeyCache = CoalescingCache<String, Arc<PublicKeyMaterial>, LookupError>;
type KeyFetch = Pin<Box<dyn Future<Output = Result<Arc<PublicKeyMaterial>, LookupError>> + Send>>;

/// Fetches and caches parsed public keys, keyed by client key.
///
/// A key stays cached until [`invalidate`](Self::invalidate)d; call that
/// after the backend rejects a token with an invalid-key error.
pub struct PublicKeyProvider<T> {
    transport: Arc<T>,
    cache: KeyCache,
}

impl<T> Clone for PublicKeyProvider<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            cache: self.cache.clone(),
        }
    }
}

impl<T: PublicKeyTransport> PublicKeyProvider<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_shared(Arc::new(transport))
    }

    /// Build around a transport shared with other components.
    #[must_use]
    pub fn with_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            cache: KeyCache::new(),
        }
    }

    /// Public key for `client_key`, fetching it if not cached.
    ///
    /// # Errors
    ///
    /// - [`LookupError::Transport`] if the key endpoint fails
    /// - [`LookupError::InvalidKey`] if the response does not parse
    pub async fn fetch(&self, client_key: &str) -> Result<Arc<PublicKeyMaterial>, LookupError> {
        self.cache
            .get(client_key.to_owned(), self.fetcher(client_key))
            .await
    }

    /// Callback form of [`fetch`](Self::fetch); completes synchronously on
    /// a cache hit.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime and the key is not cached.
    pub fn provide<C>(&self, client_key: &str, completion: C)
    where
        C: FnOnce(Result<Arc<PublicKeyMaterial>, LookupError>) + Send + 'static,
    {
        self.cache
            .provide(client_key.to_owned(), self.fetcher(client_key), completion);
    }

    /// Already-fetched key, without touching the network.
    #[must_use]
    pub fn cached(&self, client_key: &str) -> Option<Arc<PublicKeyMaterial>> {
        self.cache.cached(&client_key.to_owned())
    }

    /// Forget the key for `client_key`; the next request fetches again.
    pub fn invalidate(&self, client_key: &str) {
        tracing::debug!("public key invalidated");
        self.cache.invalidate(&client_key.to_owned());
    }

    fn fetcher(&self, client_key: &str) -> impl FnOnce() -> KeyFetch + Send + 'static {
        let transport = Arc::clone(&self.transport);
        let client_key = client_key.to_owned();
        move || -> KeyFetch {
            Box::pin(async move {
                let raw = transport.fetch_public_key(&client_key).await.map_err(|e| {
                    tracing::warn!(retryable = e.is_retryable(), "public key fetch failed: {e}");
                    LookupError::Transport(e)
                })?;
                let key = PublicKeyMaterial::parse(&raw).map_err(|e| {
                    tracing::warn!("key endpoint returned an unusable key: {e}");
                    LookupError::InvalidKey(e.to_string())
                })?;
                tracing::debug!(
                    key_fingerprint = %key.fingerprint(),
                    key_version = key.version(),
                    "public key fetched"
                );
                Ok::<_, LookupError>(Arc::new(key))
            })
        }
    }
}
