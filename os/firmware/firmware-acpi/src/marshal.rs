//! # Checksum and marshaling
//!
//! Every ACPI table is protected by an 8-bit checksum: the sum of all bytes
//! of the table, including the checksum byte itself, must be zero modulo 256.

use crate::error::{Error, Result};

/// Smallest buffer that can hold a signature, length, revision and checksum.
pub const MIN_TABLE_LEN: usize = 10;

/// Offset of the length field in a standard table header.
pub const LENGTH_OFFSET: usize = 4;

/// Offset of the checksum byte in a standard table header.
pub const CHECKSUM_OFFSET: usize = 9;

/// Wrapping byte sum.
#[must_use]
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}

/// The byte that, added to `bytes`, makes the total sum zero.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    0u8.wrapping_sub(sum(bytes))
}

/// Stamp the length and checksum into a serialized table.
///
/// # Errors
/// [`Error::TooShort`] if `bytes` cannot hold the header prefix, and
/// [`Error::TooLong`] if the length does not fit 32 bits.
pub fn finalize_table(mut bytes: Vec<u8>) -> Result<Vec<u8>> {
    if bytes.len() < MIN_TABLE_LEN {
        return Err(Error::TooShort {
            need: MIN_TABLE_LEN,
            got: bytes.len(),
        });
    }

    let len = u32::try_from(bytes.len()).map_err(|_| Error::TooLong(bytes.len()))?;
    bytes[LENGTH_OFFSET..LENGTH_OFFSET + 4].copy_from_slice(&len.to_le_bytes());
    bytes[CHECKSUM_OFFSET] = 0;
    bytes[CHECKSUM_OFFSET] = checksum(&bytes);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_balances_sum() {
        let data = [1u8, 2, 3, 250];
        let c = checksum(&data);
        assert_eq!(sum(&data).wrapping_add(c), 0);
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x80, 0x80]), 0);
    }

    #[test]
    fn finalize_stamps_length_and_checksum() {
        let mut raw = b"TEST".to_vec();
        raw.extend_from_slice(&[0xff; 4]); // stale length
        raw.extend_from_slice(&[1, 0x55]); // revision, stale checksum
        raw.extend_from_slice(&[9; 30]);

        let out = finalize_table(raw).unwrap();
        assert_eq!(out.len(), 40);
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()), 40);
        assert_eq!(sum(&out), 0);
    }

    #[test]
    fn finalize_rejects_short_buffers() {
        let err = finalize_table(vec![0; 9]).unwrap_err();
        assert!(matches!(err, Error::TooShort { need: 10, got: 9 }));
        assert!(finalize_table(vec![0; 10]).is_ok());
    }
}
