#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! End-to-end brand resolution against fake key and BIN lookup endpoints.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Once;

use cardseal_lookup::{
    BinLookupResponse, CardBrand, CardBrandResolver, PublicKeyProvider, RemoteBrand,
    ResolverConfig,
};
use common::{FakeBinLookup, FakeKeyEndpoint};

const SUPPORTED: &[CardBrand] = &[CardBrand::Visa, CardBrand::Mastercard, CardBrand::AmericanExpress];
const LONG_VISA_BIN: &str = "4111 1111 111";

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn resolver(
    keys: FakeKeyEndpoint,
    lookup: FakeBinLookup,
) -> CardBrandResolver<FakeKeyEndpoint, FakeBinLookup> {
    init_tracing();
    CardBrandResolver::new(
        ResolverConfig::with_client_key("test_CLIENTKEY"),
        PublicKeyProvider::new(keys),
        lookup,
    )
}

fn brands(matches: &[cardseal_lookup::BrandMatch]) -> Vec<CardBrand> {
    matches.iter().map(|m| m.brand).collect()
}

fn remote(brands: &[(CardBrand, bool)]) -> BinLookupResponse {
    BinLookupResponse {
        brands: brands
            .iter()
            .map(|&(brand, supported)| RemoteBrand { brand, supported })
            .collect(),
        request_id: None,
    }
}

#[tokio::test]
async fn short_bin_resolves_locally_without_network() {
    let keys = FakeKeyEndpoint::ok();
    let key_calls = std::sync::Arc::clone(&keys.calls);
    let lookup = FakeBinLookup::failing();
    let requests = std::sync::Arc::clone(&lookup.requests);
    let resolver = resolver(keys, lookup);

    let matches = resolver.resolve("4", SUPPORTED).await;

    assert_eq!(brands(&matches), vec![CardBrand::Visa]);
    assert!(matches[0].supported);
    assert_eq!(key_calls.load(Ordering::SeqCst), 0);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_and_unmatched_input_resolve_to_nothing() {
    let resolver = resolver(FakeKeyEndpoint::ok(), FakeBinLookup::failing());
    assert!(resolver.resolve("", SUPPORTED).await.is_empty());
    assert!(resolver.resolve("9", SUPPORTED).await.is_empty());
}

#[tokio::test]
async fn unsupported_brands_are_filtered_locally() {
    let resolver = resolver(FakeKeyEndpoint::ok(), FakeBinLookup::failing());
    let matches = resolver.resolve("37", &[CardBrand::Visa]).await;
    assert!(matches.is_empty());
}

#[tokio::test]
async fn remote_answer_replaces_local_answer() {
    let lookup = FakeBinLookup::answering(remote(&[
        (CardBrand::Visa, true),
        (CardBrand::CarteBancaire, false),
    ]));
    let requests = std::sync::Arc::clone(&lookup.requests);
    let resolver = resolver(FakeKeyEndpoint::ok(), lookup);

    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;

    assert_eq!(brands(&matches), vec![CardBrand::Visa, CardBrand::CarteBancaire]);
    assert!(!matches[1].supported);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.supported_brands, SUPPORTED);
    let parts = request.encrypted_bin.parts('$').expect("token should have three parts");
    assert_eq!(parts.prefix, "adyenan0_1_1");
    assert!(!request.encrypted_bin.as_str().contains("41111111111"));
}

#[tokio::test]
async fn empty_remote_answer_falls_back_to_local() {
    let resolver = resolver(FakeKeyEndpoint::ok(), FakeBinLookup::answering(remote(&[])));
    let local = resolver.resolve_local(LONG_VISA_BIN, SUPPORTED);
    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    assert_eq!(matches, local);
    assert_eq!(brands(&matches), vec![CardBrand::Visa]);
}

#[tokio::test]
async fn lookup_failure_falls_back_to_local() {
    let resolver = resolver(FakeKeyEndpoint::ok(), FakeBinLookup::failing());
    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    assert_eq!(matches, resolver.resolve_local(LONG_VISA_BIN, SUPPORTED));
}

#[tokio::test]
async fn key_failure_falls_back_to_local_without_lookup() {
    let lookup = FakeBinLookup::answering(remote(&[(CardBrand::Mastercard, true)]));
    let requests = std::sync::Arc::clone(&lookup.requests);
    let resolver = resolver(FakeKeyEndpoint::failing(), lookup);

    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;

    assert_eq!(brands(&matches), vec![CardBrand::Visa]);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unparseable_key_falls_back_to_local() {
    let resolver = resolver(
        FakeKeyEndpoint::ok().with_response("10001|zz"),
        FakeBinLookup::answering(remote(&[(CardBrand::Mastercard, true)])),
    );
    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    assert_eq!(brands(&matches), vec![CardBrand::Visa]);
}

#[tokio::test]
async fn missing_client_key_falls_back_to_local() {
    init_tracing();
    let keys = FakeKeyEndpoint::ok();
    let key_calls = std::sync::Arc::clone(&keys.calls);
    let resolver = CardBrandResolver::new(
        ResolverConfig::default(),
        PublicKeyProvider::new(keys),
        FakeBinLookup::answering(remote(&[(CardBrand::Mastercard, true)])),
    );

    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;

    assert_eq!(brands(&matches), vec![CardBrand::Visa]);
    assert_eq!(key_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn response_for_another_request_is_ignored() {
    let mut lookup = FakeBinLookup::answering(BinLookupResponse {
        request_id: Some("someone-else".to_owned()),
        ..remote(&[(CardBrand::Mastercard, true)])
    });
    lookup.echo_request_id = false;
    let resolver = resolver(FakeKeyEndpoint::ok(), lookup);

    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    assert_eq!(brands(&matches), vec![CardBrand::Visa]);
}

#[tokio::test]
async fn response_without_request_id_is_accepted() {
    let mut lookup = FakeBinLookup::answering(remote(&[(CardBrand::Mastercard, true)]));
    lookup.echo_request_id = false;
    let resolver = resolver(FakeKeyEndpoint::ok(), lookup);

    let matches = resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    assert_eq!(brands(&matches), vec![CardBrand::Mastercard]);
}

#[tokio::test]
async fn repeated_resolves_reuse_the_cached_key() {
    let keys = FakeKeyEndpoint::ok();
    let key_calls = std::sync::Arc::clone(&keys.calls);
    let lookup = FakeBinLookup::answering(remote(&[(CardBrand::Visa, true)]));
    let requests = std::sync::Arc::clone(&lookup.requests);
    let resolver = resolver(keys, lookup);

    for _ in 0..3 {
        resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    }
    assert_eq!(key_calls.load(Ordering::SeqCst), 1);

    let ids: std::collections::HashSet<String> = requests
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.request_id.clone())
        .collect();
    assert_eq!(ids.len(), 3, "every lookup carries a fresh request id");

    resolver.public_keys().invalidate("test_CLIENTKEY");
    resolver.resolve(LONG_VISA_BIN, SUPPORTED).await;
    assert_eq!(key_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn public_bin_uses_configured_length() {
    let resolver = resolver(FakeKeyEndpoint::ok(), FakeBinLookup::failing());
    assert_eq!(resolver.public_bin("4111 1111 1111 1111"), "411111");
    assert_eq!(resolver.public_bin("41"), "41");
}
