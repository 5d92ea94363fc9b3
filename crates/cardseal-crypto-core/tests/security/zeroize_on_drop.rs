//! Verify that secret types actually erase their contents.
//!
//! These call `zeroize()` explicitly on live values and inspect them
//! afterwards, which is the same code path `Drop` runs.

use cardseal_crypto_core::memory::SecretBytes;
use cardseal_crypto_core::CardFields;
use zeroize::Zeroize;

#[test]
fn secret_bytes_zeroize_clears_session_key() {
    let mut key = SecretBytes::<32>::new([0xDE; 32]);
    assert_eq!(key.expose(), &[0xDE; 32]);
    key.zeroize();
    assert_eq!(key.expose(), &[0u8; 32]);
}

#[test]
fn secret_bytes_random_is_not_all_zero() {
    let iv = SecretBytes::<12>::random().expect("CSPRNG should be available");
    assert_ne!(iv.expose(), &[0u8; 12]);
}

#[test]
fn card_fields_zeroize_drops_every_field() {
    let mut card = CardFields {
        number: Some("4111111111111111".into()),
        security_code: Some("737".into()),
        expiry_month: Some("03".into()),
        expiry_year: Some("2030".into()),
        holder_name: Some("J. Smith".into()),
        bin: Some("411111".into()),
    };
    card.zeroize();
    assert!(card.number.is_none());
    assert!(card.security_code.is_none());
    assert!(card.expiry_month.is_none());
    assert!(card.expiry_year.is_none());
    assert!(card.holder_name.is_none());
    assert!(card.bin.is_none());
}
