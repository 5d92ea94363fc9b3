#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the AES-256-CCM primitive.

use cardseal_crypto_core::ccm::{open, seal, KEY_LEN, NONCE_LEN, TAG_LEN};
use ccm::aead::{Aead, KeyInit};
use ccm::consts::{U12, U8};
use proptest::prelude::*;

type ReferenceCcm = ccm::Ccm<aes::Aes256, U8, U12>;

/// Fixed key for property tests.
const PROP_KEY: [u8; KEY_LEN] = [0xCC; KEY_LEN];

/// Fixed nonce for property tests.
const PROP_NONCE: [u8; NONCE_LEN] = [0x5A; NONCE_LEN];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// seal→open recovers the plaintext for lengths up to 10 000 bytes.
    #[test]
    fn seal_open_roundtrip(
        plaintext in proptest::collection::vec(any::<u8>(), 0..=10_000),
    ) {
        let sealed = seal(&PROP_KEY, &PROP_NONCE, &plaintext)
            .expect("seal should succeed");
        prop_assert_eq!(sealed.len(), plaintext.len() + TAG_LEN);
        let opened = open(&PROP_KEY, &PROP_NONCE, &sealed)
            .expect("open should succeed");
        prop_assert_eq!(opened.expose(), plaintext.as_slice());
    }

    /// Output matches the RustCrypto `ccm` crate byte for byte.
    #[test]
    fn matches_reference_implementation(
        key in any::<[u8; KEY_LEN]>(),
        nonce in any::<[u8; NONCE_LEN]>(),
        plaintext in proptest::collection::vec(any::<u8>(), 0..2048),
    ) {
        let ours = seal(&key, &nonce, &plaintext).expect("seal should succeed");
        let reference = ReferenceCcm::new_from_slice(&key)
            .unwrap()
            .encrypt(nonce.as_slice().into(), plaintext.as_slice())
            .unwrap();
        prop_assert_eq!(ours, reference);
    }

    /// Flipping any single bit of ciphertext or tag fails authentication.
    #[test]
    fn single_bit_flip_is_rejected(
        plaintext in proptest::collection::vec(any::<u8>(), 0..512),
        bit in any::<prop::sample::Index>(),
    ) {
        let mut sealed = seal(&PROP_KEY, &PROP_NONCE, &plaintext)
            .expect("seal should succeed");
        let position = bit.index(sealed.len() * 8);
        sealed[position / 8] ^= 1 << (position % 8);
        prop_assert!(open(&PROP_KEY, &PROP_NONCE, &sealed).is_err());
    }

    /// Opening with a different nonce fails.
    #[test]
    fn wrong_nonce_is_rejected(
        plaintext in proptest::collection::vec(any::<u8>(), 1..256),
        other in any::<[u8; NONCE_LEN]>(),
    ) {
        prop_assume!(other != PROP_NONCE);
        let sealed = seal(&PROP_KEY, &PROP_NONCE, &plaintext)
            .expect("seal should succeed");
        prop_assert!(open(&PROP_KEY, &other, &sealed).is_err());
    }
}
