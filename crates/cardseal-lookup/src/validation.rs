//! Card field validation over sanitized digit strings.

use std::collections::BTreeSet;

/// Shortest number accepted as a complete card number.
pub const MIN_VALID_CARD_LENGTH: usize = 12;

/// Longest PAN in any brand's length set.
pub const MAX_PAN_LENGTH: usize = 19;

/// Luhn doubling of each digit, already reduced (`2d` or `2d - 9`).
const LUHN_DOUBLED: [u32; 10] = [0, 2, 4, 6, 8, 1, 3, 5, 7, 9];

/// Keep only ASCII digits: `"4111 1111-1111"` → `"411111111111"`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Luhn (mod 10) checksum. `false` for empty or non-digit input.
#[must_use]
pub fn luhn_check(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut sum: u32 = 0;
    for (position, c) in digits.chars().rev().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        let value = if position % 2 == 1 {
            LUHN_DOUBLED.get(digit as usize).copied().unwrap_or(0)
        } else {
            digit
        };
        sum = sum.wrapping_add(value);
    }
    sum % 10 == 0
}

/// `true` if `digits` has one of the lengths in `lengths`.
#[must_use]
pub fn valid_pan_length(digits: &str, lengths: &BTreeSet<u8>) -> bool {
    u8::try_from(digits.len()).is_ok_and(|len| lengths.contains(&len))
}

/// Full card number check: sanitize, require at least
/// [`MIN_VALID_CARD_LENGTH`] digits, then Luhn.
#[must_use]
pub fn is_valid_card_number(input: &str) -> bool {
    let digits = sanitize(input);
    (MIN_VALID_CARD_LENGTH..=MAX_PAN_LENGTH).contains(&digits.len()) && luhn_check(&digits)
}

/// Security code: 3 or 4 digits after sanitizing.
#[must_use]
pub fn is_valid_security_code(input: &str) -> bool {
    (3..=4).contains(&sanitize(input).len())
}

/// Expiry month: 1 through 12, leading zero allowed.
#[must_use]
pub fn is_valid_expiry_month(input: &str) -> bool {
    let digits = sanitize(input);
    !digits.is_empty()
        && digits.len() <= 2
        && digits.parse::<u8>().is_ok_and(|month| (1..=12).contains(&month))
}

/// The leading `len` digits reported when the BIN changes; shorter input is
/// returned whole.
#[must_use]
pub fn public_bin(digits: &str, len: usize) -> &str {
    digits.get(..len).unwrap_or(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators() {
        assert_eq!(sanitize("4111 1111-1111 1111"), "4111111111111111");
        assert_eq!(sanitize("abc"), "");
        assert_eq!(sanitize("١٢٣4"), "4");
    }

    #[test]
    fn luhn_known_numbers() {
        assert!(luhn_check("4111111111111111"));
        assert!(!luhn_check("4111111111111112"));
        assert!(luhn_check("5555555555554444"));
        assert!(luhn_check("378282246310005"));
        assert!(luhn_check("0"));
        assert!(!luhn_check(""));
        assert!(!luhn_check("4111a11111111111"));
    }

    #[test]
    fn card_number_requires_minimum_length() {
        assert!(is_valid_card_number("4111 1111 1111 1111"));
        // Luhn-valid but too short.
        assert!(!is_valid_card_number("18"));
        assert!(!is_valid_card_number("00000000000000000000"));
    }

    #[test]
    fn pan_length_against_brand_set() {
        let lengths = BTreeSet::from([15]);
        assert!(valid_pan_length("378282246310005", &lengths));
        assert!(!valid_pan_length("4111111111111111", &lengths));
        assert!(!valid_pan_length(&"1".repeat(300), &lengths));
    }

    #[test]
    fn security_code_length() {
        assert!(is_valid_security_code("737"));
        assert!(is_valid_security_code("7373"));
        assert!(!is_valid_security_code("73"));
        assert!(!is_valid_security_code("73737"));
    }

    #[test]
    fn expiry_month_range() {
        assert!(is_valid_expiry_month("1"));
        assert!(is_valid_expiry_month("03"));
        assert!(is_valid_expiry_month("12"));
        assert!(!is_valid_expiry_month("0"));
        assert!(!is_valid_expiry_month("13"));
        assert!(!is_valid_expiry_month(""));
        assert!(!is_valid_expiry_month("012"));
    }

    #[test]
    fn public_bin_truncates() {
        assert_eq!(public_bin("411111111111", 6), "411111");
        assert_eq!(public_bin("4111", 6), "4111");
    }
}
