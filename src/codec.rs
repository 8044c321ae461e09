//! Textual encodings for a 63-bit unsigned id: base-62 (with its inverse
//! parser), plus decimal/hex/base-36 as thin wrappers over the platform
//! integer formatter.
//!
//! Grounded in `examples/original_source/base62.go`.

use crate::error::DecodeError;

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// `base62Map` from the original source, built once at first use: ASCII
/// byte -> alphabet index, or `-1` for "not a base-62 digit".
fn base62_value(c: char) -> Option<i8> {
    if !c.is_ascii() {
        return None;
    }
    BASE62_ALPHABET
        .iter()
        .position(|&b| b == c as u8)
        .map(|i| i as i8)
}

/// Encodes `id` as base-62. `id == 0` encodes as `"0"`.
pub fn to_base62(id: i64) -> String {
    if id == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(11);
    let mut n = id;
    while n > 0 {
        buf.push(BASE62_ALPHABET[(n % 62) as usize]);
        n /= 62;
    }
    buf.reverse();
    String::from_utf8(buf).expect("base62 alphabet is ASCII")
}

/// Decodes a base-62 string back into a signed 64-bit id. Empty input
/// returns [`DecodeError::Empty`]; a character outside the alphabet returns
/// [`DecodeError::InvalidChar`]; a value that would exceed `i64::MAX`
/// returns [`DecodeError::Overflow`].
pub fn from_base62(s: &str) -> Result<i64, DecodeError> {
    if s.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut result: i64 = 0;
    for c in s.chars() {
        let val = base62_value(c).ok_or(DecodeError::InvalidChar(c))?;
        if result > (i64::MAX - val as i64) / 62 {
            return Err(DecodeError::Overflow);
        }
        result = result * 62 + val as i64;
    }
    Ok(result)
}

/// Lowercase hex, no prefix, no padding.
pub fn to_hex(id: i64) -> String {
    format!("{:x}", id)
}

/// Parses a lowercase (or uppercase) hex string.
pub fn from_hex(s: &str) -> Result<i64, DecodeError> {
    if s.is_empty() {
        return Err(DecodeError::Empty);
    }
    i64::from_str_radix(s, 16).map_err(|_| DecodeError::InvalidChar(first_offender(s, 16)))
}

/// Lowercase base-36 (`0-9a-z`), no padding.
pub fn to_base36(id: i64) -> String {
    radix_encode(id, 36)
}

/// Parses a lowercase (or uppercase) base-36 string.
pub fn from_base36(s: &str) -> Result<i64, DecodeError> {
    if s.is_empty() {
        return Err(DecodeError::Empty);
    }
    i64::from_str_radix(s, 36).map_err(|_| DecodeError::InvalidChar(first_offender(s, 36)))
}

fn radix_encode(id: i64, radix: u32) -> String {
    if id == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::new();
    let mut n = id as u64;
    while n > 0 {
        buf.push(DIGITS[(n % radix as u64) as usize]);
        n /= radix as u64;
    }
    buf.reverse();
    String::from_utf8(buf).expect("digit alphabet is ASCII")
}

fn first_offender(s: &str, radix: u32) -> char {
    s.chars()
        .find(|c| c.to_digit(radix).is_none())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base62_fixed_vectors() {
        assert_eq!(to_base62(0), "0");
        assert_eq!(to_base62(61), "Z");
        assert_eq!(to_base62(62), "10");
        assert_eq!(to_base62(3843), "ZZ");
    }

    #[test]
    fn base62_round_trip() {
        for id in [0i64, 1, 61, 62, 3843, 123_456_789, i64::MAX] {
            let encoded = to_base62(id);
            assert_eq!(from_base62(&encoded).unwrap(), id);
        }
    }

    #[test]
    fn base62_empty_is_error() {
        assert_eq!(from_base62(""), Err(DecodeError::Empty));
    }

    #[test]
    fn base62_invalid_char_is_error() {
        assert_eq!(from_base62("!!"), Err(DecodeError::InvalidChar('!')));
    }

    #[test]
    fn base62_overflow_is_detected() {
        // A base62 string whose value exceeds i64::MAX.
        assert_eq!(from_base62("AzL8n0Y58m8"), Err(DecodeError::Overflow));
    }

    #[test]
    fn hex_and_base36_round_trip() {
        let id = 123_456_789_012_345i64;
        assert_eq!(from_hex(&to_hex(id)).unwrap(), id);
        assert_eq!(from_base36(&to_base36(id)).unwrap(), id);
    }
}
