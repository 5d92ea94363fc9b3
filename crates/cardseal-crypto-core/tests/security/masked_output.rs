//! Card data and key material must never show up in `Debug`/`Display`.

use cardseal_crypto_core::memory::{SecretBuffer, SecretBytes};
use cardseal_crypto_core::CardFields;

const PAN: &str = "4111111111111111";

#[test]
fn card_fields_debug_hides_values() {
    let card = CardFields::default()
        .with_number(PAN)
        .with_holder_name("J. Smith")
        .with_bin(&PAN[..8]);
    let debug = format!("{card:?}");
    assert!(!debug.contains(&PAN[..8]));
    assert!(!debug.contains("Smith"));
}

#[test]
fn secret_buffer_formats_are_masked() {
    let buf = SecretBuffer::new(PAN.as_bytes());
    assert!(!format!("{buf:?}").contains(PAN));
    assert!(!format!("{buf}").contains(PAN));
}

#[test]
fn secret_bytes_formats_are_masked() {
    let key = SecretBytes::new(*b"0123456789abcdef0123456789abcdef");
    assert!(!format!("{key:?}").contains("0123"));
    assert!(!format!("{key:#?}").contains("0123"));
}
