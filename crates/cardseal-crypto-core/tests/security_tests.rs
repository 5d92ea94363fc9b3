#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Security validation for `cardseal-crypto-core`:
//! - secret types erase their contents
//! - nothing sensitive reaches `Debug` output

mod security;
