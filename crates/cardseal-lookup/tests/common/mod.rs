//! Test doubles for the transport seams.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use cardseal_lookup::{
    BinLookupRequest, BinLookupResponse, BinLookupTransport, PublicKeyTransport, TransportError,
};
use data_encoding::HEXUPPER;
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

/// `version|exponent|modulus` string for a test key pair, generated once.
pub fn key_string() -> &'static str {
    static KEY: OnceLock<String> = OnceLock::new();
    KEY.get_or_init(|| {
        let private = RsaPrivateKey::new(&mut OsRng, 1024).expect("key generation should succeed");
        format!(
            "10001|{}|{}",
            HEXUPPER.encode(&private.e().to_bytes_be()),
            HEXUPPER.encode(&private.n().to_bytes_be()),
        )
    })
}

/// Key endpoint that counts calls and answers after an optional delay.
pub struct FakeKeyEndpoint {
    pub calls: Arc<AtomicUsize>,
    pub delay: Duration,
    pub response: Result<String, TransportError>,
}

impl FakeKeyEndpoint {
    pub fn ok() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            response: Ok(key_string().to_owned()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(TransportError::retryable("connection refused")),
            ..Self::ok()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = Ok(response.to_owned());
        self
    }
}

impl PublicKeyTransport for FakeKeyEndpoint {
    async fn fetch_public_key(&self, _client_key: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.response.clone()
    }
}

/// BIN lookup endpoint that records requests and replays a fixed answer.
pub struct FakeBinLookup {
    pub requests: Arc<Mutex<Vec<BinLookupRequest>>>,
    pub response: Result<BinLookupResponse, TransportError>,
    pub echo_request_id: bool,
}

impl FakeBinLookup {
    pub fn answering(response: BinLookupResponse) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response: Ok(response),
            echo_request_id: true,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(TransportError::permanent("500 internal server error")),
            ..Self::answering(BinLookupResponse::default())
        }
    }
}

impl BinLookupTransport for FakeBinLookup {
    async fn lookup(&self, request: BinLookupRequest) -> Result<BinLookupResponse, TransportError> {
        let request_id = request.request_id.clone();
        self.requests.lock().unwrap().push(request);
        let mut response = self.response.clone()?;
        if self.echo_request_id {
            response.request_id = Some(request_id);
        }
        Ok(response)
    }
}
