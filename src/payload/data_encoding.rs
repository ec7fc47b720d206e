//! # Telegram Value Encoding
//!
//! This module provides the byte-level codec applied to captured telegrams:
//! 4-byte BCD packing of meter values, the value-field locator, and the
//! checksum arithmetic that keeps a mutated telegram wire-valid.

use crate::constants::{
    MBUS_LONG_FRAME_OVERHEAD, TEMPLATE_HEADER_LEN, TEMPLATE_VALUE_DIF, TEMPLATE_VALUE_LEN,
    TEMPLATE_VALUE_VIF,
};
use crate::error::SimError;

/// Largest value a 4-byte BCD field can carry, plus one.
const BCD4_MODULUS: u64 = 100_000_000;

/// Location of the mutable BCD value inside a template telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueFieldLocator {
    /// Byte offset of the first BCD byte
    pub offset: usize,
    /// DIF byte observed at the signature position
    pub dif: u8,
    /// VIF byte observed at the signature position
    pub vif: u8,
    /// Width of the field in bytes
    pub len: usize,
}

/// Scans a template telegram for the 4-byte BCD energy value signature.
///
/// The DIF/VIF descriptor pair sits directly after the fixed 20-byte
/// telegram header; a match yields the value location one past the pair.
/// A template without the signature cannot be mutated safely and is
/// rejected rather than written at an unvalidated offset.
pub fn locate_value_field(telegram: &[u8]) -> Result<ValueFieldLocator, SimError> {
    let dif = *telegram
        .get(TEMPLATE_HEADER_LEN)
        .ok_or(SimError::ValueFieldNotFound)?;
    let vif = *telegram
        .get(TEMPLATE_HEADER_LEN + 1)
        .ok_or(SimError::ValueFieldNotFound)?;

    if dif != TEMPLATE_VALUE_DIF || vif != TEMPLATE_VALUE_VIF {
        return Err(SimError::ValueFieldNotFound);
    }

    Ok(ValueFieldLocator {
        offset: TEMPLATE_HEADER_LEN + 2,
        dif,
        vif,
        len: TEMPLATE_VALUE_LEN,
    })
}

/// Truncates a decimal string to the integer that gets BCD-encoded.
///
/// No rounding takes place. Negative inputs saturate to zero, non-finite
/// inputs are rejected, and values beyond 8 digits keep only the
/// least-significant 8 digits (the capacity of the BCD field).
pub fn truncate_decimal(value: &str) -> Result<u64, SimError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| SimError::InvalidRecordValue(value.to_string()))?;
    if !parsed.is_finite() {
        return Err(SimError::InvalidRecordValue(value.to_string()));
    }
    Ok((parsed.trunc() as u64) % BCD4_MODULUS)
}

/// Encodes an integer as a 4-byte packed BCD field.
///
/// Two decimal digits per output byte, high nibble holding the more
/// significant digit, least-significant digit pair in byte 0. Values are
/// reduced modulo 10^8 first.
pub fn encode_bcd4(value: u64) -> [u8; TEMPLATE_VALUE_LEN] {
    let mut v = value % BCD4_MODULUS;
    let mut out = [0u8; TEMPLATE_VALUE_LEN];
    for byte in out.iter_mut() {
        let ones = (v % 10) as u8;
        let tens = ((v / 10) % 10) as u8;
        *byte = (tens << 4) | ones;
        v /= 100;
    }
    out
}

/// Decodes a 4-byte packed BCD field back to its integer value.
///
/// Returns `None` when any nibble is not a decimal digit.
pub fn decode_bcd4(bytes: &[u8; TEMPLATE_VALUE_LEN]) -> Option<u32> {
    let mut value: u32 = 0;
    for byte in bytes.iter().rev() {
        let tens = (byte >> 4) & 0x0F;
        let ones = byte & 0x0F;
        if tens > 9 || ones > 9 {
            return None;
        }
        value = value * 100 + u32::from(tens) * 10 + u32::from(ones);
    }
    Some(value)
}

/// Computes the checksum of a long frame: the sum of every byte strictly
/// between the 4-byte header and the checksum position, mod 256.
pub fn long_frame_checksum(telegram: &[u8]) -> u8 {
    if telegram.len() < MBUS_LONG_FRAME_OVERHEAD {
        return 0;
    }
    telegram[4..telegram.len() - 2]
        .iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

/// Rewrites the value field of a telegram copy and restores the checksum
/// invariant.
///
/// The template itself is never modified; every call returns a fresh
/// telegram with the new value in place and the checksum byte recomputed.
/// Fails closed when the locator would overrun the buffer.
pub fn patch_value_field(
    template: &[u8],
    locator: &ValueFieldLocator,
    value: u64,
) -> Result<Vec<u8>, SimError> {
    let end = locator.offset + locator.len;
    if end > template.len() || template.len() < MBUS_LONG_FRAME_OVERHEAD {
        return Err(SimError::ValueFieldOutOfRange {
            offset: locator.offset,
            len: template.len(),
        });
    }

    let mut telegram = template.to_vec();
    telegram[locator.offset..end].copy_from_slice(&encode_bcd4(value));
    let checksum_pos = telegram.len() - 2;
    telegram[checksum_pos] = long_frame_checksum(&telegram);
    Ok(telegram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_bcd4_digit_order() {
        // Least-significant digit pair lands in byte 0
        assert_eq!(encode_bcd4(0), [0x00, 0x00, 0x00, 0x00]);
        assert_eq!(encode_bcd4(1234), [0x34, 0x12, 0x00, 0x00]);
        assert_eq!(encode_bcd4(12345678), [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_encode_bcd4_overflow_keeps_low_digits() {
        // 123456789 keeps 23456789
        assert_eq!(encode_bcd4(123456789), [0x89, 0x67, 0x45, 0x23]);
    }

    #[test]
    fn test_decode_bcd4() {
        assert_eq!(decode_bcd4(&[0x34, 0x12, 0x00, 0x00]), Some(1234));
        assert_eq!(decode_bcd4(&[0x78, 0x56, 0x34, 0x12]), Some(12345678));
        // 0xA in the tens nibble is not a decimal digit
        assert_eq!(decode_bcd4(&[0xA0, 0x00, 0x00, 0x00]), None);
    }

    #[test]
    fn test_truncate_decimal() {
        assert_eq!(truncate_decimal("1234.999999").unwrap(), 1234);
        assert_eq!(truncate_decimal("00001234").unwrap(), 1234);
        assert_eq!(truncate_decimal("-5.0").unwrap(), 0);
        assert!(truncate_decimal("not a number").is_err());
        assert!(truncate_decimal("NaN").is_err());
    }

    #[test]
    fn test_locate_value_field_requires_signature() {
        let mut telegram = vec![0u8; 30];
        telegram[20] = TEMPLATE_VALUE_DIF;
        telegram[21] = TEMPLATE_VALUE_VIF;
        let locator = locate_value_field(&telegram).unwrap();
        assert_eq!(locator.offset, 22);
        assert_eq!(locator.len, 4);

        telegram[20] = 0x0C;
        assert!(locate_value_field(&telegram).is_err());
        assert!(locate_value_field(&[0u8; 10]).is_err());
    }
}
