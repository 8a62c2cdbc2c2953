//! Fixed-alphabet base62 encoding for segment-allocated codes.
//!
//! The alphabet is a fixed permutation of `[0-9a-zA-Z]`. Its order only shapes
//! how codes look; uniqueness comes from the encoded integers themselves.
//! Codes are left-padded with the alphabet's zero digit to a fixed length, so
//! [`decode`] is a pure positional inverse and round-trips every value in
//! range.

use crate::error::KeygenError;

/// Shuffled base62 alphabet. Index = digit value.
const ALPHABET: &[u8; 62] = b"p5msyAiV1lLO26IMgxDcewTJ9CH83XYBb0SNqW4hzQdnFEjUaPtvfKrGouZRk7";

/// Longest code length whose full range still fits in an `i64`.
pub const MAX_CODE_LENGTH: usize = 10;

/// Largest value representable by `code_length` base62 digits.
///
/// # Errors
///
/// Returns [`KeygenError::Config`] if `code_length` is zero or larger than
/// [`MAX_CODE_LENGTH`].
pub fn max_encodable(code_length: usize) -> Result<i64, KeygenError> {
    if code_length == 0 || code_length > MAX_CODE_LENGTH {
        return Err(KeygenError::Config(format!(
            "code length must be 1..={}, got {}",
            MAX_CODE_LENGTH, code_length
        )));
    }
    // 62^10 < i64::MAX, checked above
    Ok(62i64.pow(code_length as u32) - 1)
}

/// Encodes `value` as a fixed-width base62 code of `code_length` characters.
///
/// # Errors
///
/// Returns [`KeygenError::CounterOverflow`] if `value` is negative or exceeds
/// the range of `code_length` digits. Overflow is a fatal configuration error
/// (code length too small for the counter range), never a truncation.
pub fn encode(value: i64, code_length: usize) -> Result<String, KeygenError> {
    let max = max_encodable(code_length)?;
    if value < 0 || value > max {
        return Err(KeygenError::CounterOverflow { value, code_length });
    }

    let mut digits = [0u8; MAX_CODE_LENGTH];
    let mut rest = value;
    for slot in digits[..code_length].iter_mut().rev() {
        *slot = ALPHABET[(rest % 62) as usize];
        rest /= 62;
    }

    // ALPHABET is ASCII, so the bytes are valid UTF-8
    Ok(String::from_utf8_lossy(&digits[..code_length]).into_owned())
}

/// Decodes a code produced by [`encode`] back to its integer value.
///
/// Returns `None` if the code contains a character outside the alphabet or
/// would overflow an `i64`.
pub fn decode(code: &str) -> Option<i64> {
    let mut value: i64 = 0;
    for byte in code.bytes() {
        let digit = ALPHABET.iter().position(|&c| c == byte)? as i64;
        value = value.checked_mul(62)?.checked_add(digit)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fixed_length() {
        for value in [0, 1, 61, 62, 1000, 916_132_831] {
            let code = encode(value, 5).unwrap();
            assert_eq!(code.len(), 5, "value {} encoded as {:?}", value, code);
        }
    }

    #[test]
    fn test_encode_zero_is_all_pad() {
        let code = encode(0, 5).unwrap();
        assert_eq!(code, "ppppp");
    }

    #[test]
    fn test_round_trip() {
        for value in [0, 1, 61, 62, 63, 999, 1000, 1001, 123_456_789] {
            let code = encode(value, 6).unwrap();
            assert_eq!(decode(&code), Some(value), "code {:?}", code);
        }
    }

    #[test]
    fn test_round_trip_range_boundaries() {
        let max = max_encodable(5).unwrap();
        for value in [max, max - 1, max - 61] {
            let code = encode(value, 5).unwrap();
            assert_eq!(decode(&code), Some(value));
        }
    }

    #[test]
    fn test_encode_preserves_order_after_decode() {
        let mut previous = decode(&encode(0, 5).unwrap()).unwrap();
        for value in 1..5000 {
            let current = decode(&encode(value, 5).unwrap()).unwrap();
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = max_encodable(2).unwrap();
        assert_eq!(max, 62 * 62 - 1);

        let err = encode(max + 1, 2).unwrap_err();
        assert!(matches!(
            err,
            KeygenError::CounterOverflow { value, code_length } if value == max + 1 && code_length == 2
        ));
    }

    #[test]
    fn test_negative_value_is_overflow() {
        assert!(matches!(
            encode(-1, 5),
            Err(KeygenError::CounterOverflow { .. })
        ));
    }

    #[test]
    fn test_invalid_code_length() {
        assert!(matches!(encode(1, 0), Err(KeygenError::Config(_))));
        assert!(matches!(
            encode(1, MAX_CODE_LENGTH + 1),
            Err(KeygenError::Config(_))
        ));
    }

    #[test]
    fn test_decode_rejects_foreign_characters() {
        assert_eq!(decode("ab+cd"), None);
        assert_eq!(decode("ключ"), None);
    }

    #[test]
    fn test_alphabet_is_a_base62_permutation() {
        let mut sorted = *ALPHABET;
        sorted.sort_unstable();
        let mut reference: Vec<u8> = (b'0'..=b'9')
            .chain(b'A'..=b'Z')
            .chain(b'a'..=b'z')
            .collect();
        reference.sort_unstable();
        assert_eq!(sorted.to_vec(), reference);
    }
}
