//! AES-256 in CCM mode (RFC 3610 / NIST SP 800-38C) without associated data.
//!
//! This module provides:
//! - [`seal`]: encrypt and authenticate, returning `ciphertext || tag`
//! - [`open`]: verify and decrypt `ciphertext || tag`, returning [`SecretBuffer`]
//!
//! # Parameters
//!
//! The token backend expects a fixed parameter set:
//! - `M` (tag length) = 8 bytes
//! - nonce = 12 bytes, so `L` (length field) = 15 - 12 = 3 bytes
//! - no associated data (the `Adata` flag bit is always clear)
//!
//! # Construction
//!
//! ```text
//! B0  = flags(M, L) || nonce || be(len(m), L)
//! X1  = E(B0);  X(i+1) = E(Xi ^ m_i)            (last block zero-padded for MAC only)
//! A_i = (L - 1) || nonce || be(i, L)
//! c_i = m_i ^ E(A_i)    for i = 1, 2, ...
//! tag = first M bytes of (X_final ^ E(A_0))
//! ```
//!
//! The block cipher is only ever used in the forward direction (ECB on a
//! single block), which is all CCM needs.

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes256, Block};
use zeroize::Zeroize;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// AES-256 key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// CCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// CCM authentication tag length in bytes (`M`).
pub const TAG_LEN: usize = 8;

/// Size of the message-length field in bytes (`L = 15 - NONCE_LEN`).
pub const LENGTH_FIELD_LEN: usize = 3;

/// Largest message encodable in a 3-byte length field.
pub const MAX_MESSAGE_LEN: usize = (1 << 24) - 1;

const _: () = assert!(NONCE_LEN + LENGTH_FIELD_LEN == 15);

/// Offset of the length/counter field inside a 16-byte block.
const LENGTH_FIELD_START: usize = BLOCK_LEN - LENGTH_FIELD_LEN;

/// Flags byte of `B0`: no AAD, `M = 8`, `L = 3`.
const B0_FLAGS: u8 = ccm_flags(false, TAG_LEN, LENGTH_FIELD_LEN);

/// Flags byte of every counter block `A_i`: `L - 1`.
#[allow(clippy::cast_possible_truncation)]
const COUNTER_FLAGS: u8 = (LENGTH_FIELD_LEN - 1) as u8;

/// `(Adata << 6) | (((M - 2) / 2) << 3) | (L - 1)`.
#[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
const fn ccm_flags(has_aad: bool, tag_len: usize, length_field_len: usize) -> u8 {
    let aad_bit: u8 = if has_aad { 1 << 6 } else { 0 };
    aad_bit | ((((tag_len - 2) / 2) as u8) << 3) | ((length_field_len - 1) as u8)
}

// ---------------------------------------------------------------------------
// Block helpers
// ---------------------------------------------------------------------------

/// Single-block AES-256 forward permutation.
struct BlockEncryptor(Aes256);

impl BlockEncryptor {
    fn new(key: &[u8; KEY_LEN]) -> Self {
        Self(Aes256::new(GenericArray::from_slice(key)))
    }

    fn encrypt(&self, input: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let mut block = Block::clone_from_slice(input);
        self.0.encrypt_block(&mut block);
        let mut out = [0u8; BLOCK_LEN];
        out.copy_from_slice(&block);
        block.as_mut_slice().zeroize();
        out
    }
}

/// Write the low `L` bytes of `value` big-endian into the tail of `block`.
fn write_length_field(block: &mut [u8; BLOCK_LEN], value: u32) {
    let be = value.to_be_bytes();
    block[LENGTH_FIELD_START..].copy_from_slice(&be[be.len() - LENGTH_FIELD_LEN..]);
}

fn message_len_field(len: usize) -> Result<u32, CryptoError> {
    if len > MAX_MESSAGE_LEN {
        return Err(CryptoError::AesEncryption(format!(
            "message too long for CCM: {len} bytes (maximum {MAX_MESSAGE_LEN})"
        )));
    }
    u32::try_from(len)
        .map_err(|_| CryptoError::AesEncryption(format!("message length {len} overflows u32")))
}

/// Build `B0`: flags, nonce, big-endian message length.
fn block_b0(nonce: &[u8; NONCE_LEN], message_len: u32) -> [u8; BLOCK_LEN] {
    let mut b0 = [0u8; BLOCK_LEN];
    b0[0] = B0_FLAGS;
    b0[1..=NONCE_LEN].copy_from_slice(nonce);
    write_length_field(&mut b0, message_len);
    b0
}

/// Build counter block `A_i`.
fn counter_block(nonce: &[u8; NONCE_LEN], counter: u32) -> [u8; BLOCK_LEN] {
    let mut a = [0u8; BLOCK_LEN];
    a[0] = COUNTER_FLAGS;
    a[1..=NONCE_LEN].copy_from_slice(nonce);
    write_length_field(&mut a, counter);
    a
}

/// One CBC-MAC step: `X' = E(X ^ chunk)`.
///
/// A short final chunk leaves the tail of `X` untouched, which is the same
/// as XOR-ing a zero-padded block.
fn mac_step(cipher: &BlockEncryptor, x: &[u8; BLOCK_LEN], chunk: &[u8]) -> [u8; BLOCK_LEN] {
    let mut b = *x;
    for (dst, src) in b.iter_mut().zip(chunk) {
        *dst ^= src;
    }
    let next = cipher.encrypt(&b);
    b.zeroize();
    next
}

/// Counter value for the block at `index` (counters start at 1).
fn block_counter(index: usize) -> Result<u32, CryptoError> {
    u32::try_from(index)
        .ok()
        .and_then(|i| i.checked_add(1))
        .ok_or_else(|| CryptoError::AesEncryption("CCM counter overflow".into()))
}

/// XOR `chunk` with the keystream block for `counter`, appending to `out`.
fn apply_keystream(
    cipher: &BlockEncryptor,
    nonce: &[u8; NONCE_LEN],
    counter: u32,
    chunk: &[u8],
    out: &mut Vec<u8>,
) {
    let mut s = cipher.encrypt(&counter_block(nonce, counter));
    out.extend(chunk.iter().zip(s.iter()).map(|(m, k)| m ^ k));
    s.zeroize();
}

/// Mask the final CBC-MAC value with `S0 = E(A_0)`.
fn final_tag(cipher: &BlockEncryptor, nonce: &[u8; NONCE_LEN], x: &[u8; BLOCK_LEN]) -> [u8; TAG_LEN] {
    let s0 = cipher.encrypt(&counter_block(nonce, 0));
    let mut tag = [0u8; TAG_LEN];
    for ((t, m), s) in tag.iter_mut().zip(x.iter()).zip(s0.iter()) {
        *t = m ^ s;
    }
    tag
}

/// Constant-time tag comparison.
///
/// Lengths are public (always [`TAG_LEN`]), only the contents are protected.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ---------------------------------------------------------------------------
// Seal / open
// ---------------------------------------------------------------------------

/// Encrypt and authenticate `plaintext` with AES-256-CCM.
///
/// Returns `ciphertext || tag`, exactly `plaintext.len() + TAG_LEN` bytes.
///
/// # Errors
///
/// Returns [`CryptoError::AesEncryption`] if the plaintext exceeds
/// [`MAX_MESSAGE_LEN`].
pub fn seal(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let message_len = message_len_field(plaintext.len())?;
    let cipher = BlockEncryptor::new(key);

    let mut x = cipher.encrypt(&block_b0(nonce, message_len));
    let mut out = Vec::with_capacity(plaintext.len().saturating_add(TAG_LEN));

    for (index, chunk) in plaintext.chunks(BLOCK_LEN).enumerate() {
        x = mac_step(&cipher, &x, chunk);
        apply_keystream(&cipher, nonce, block_counter(index)?, chunk, &mut out);
    }

    out.extend_from_slice(&final_tag(&cipher, nonce, &x));
    x.zeroize();
    Ok(out)
}

/// Verify and decrypt `ciphertext || tag` produced by [`seal`].
///
/// The decrypted bytes are zeroized if authentication fails.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] if the input is shorter than the tag
/// or the tag does not verify (tampered data or wrong key/nonce).
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    sealed: &[u8],
) -> Result<SecretBuffer, CryptoError> {
    let ct_len = sealed
        .len()
        .checked_sub(TAG_LEN)
        .ok_or(CryptoError::Decryption)?;
    let (ciphertext, tag) = sealed.split_at(ct_len);
    let message_len = message_len_field(ct_len).map_err(|_| CryptoError::Decryption)?;
    let cipher = BlockEncryptor::new(key);

    let mut plaintext = Vec::with_capacity(ct_len);
    for (index, chunk) in ciphertext.chunks(BLOCK_LEN).enumerate() {
        let counter = block_counter(index).map_err(|_| CryptoError::Decryption)?;
        apply_keystream(&cipher, nonce, counter, chunk, &mut plaintext);
    }

    let mut x = cipher.encrypt(&block_b0(nonce, message_len));
    for chunk in plaintext.chunks(BLOCK_LEN) {
        x = mac_step(&cipher, &x, chunk);
    }
    let expected = final_tag(&cipher, nonce, &x);
    x.zeroize();

    if !constant_time_eq(&expected, tag) {
        plaintext.zeroize();
        return Err(CryptoError::Decryption);
    }
    Ok(SecretBuffer::from_vec(plaintext))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
