//! # Standard table header
//!
//! The common 36-byte prologue of every ACPI system description table.

use crate::error::{Error, Result};
use crate::le::LeLayout;
use utils_layout_derive::Setters;

/// Size of the standard header in bytes.
pub const HEADER_LEN: usize = 36;

/// The standard ACPI description header.
///
/// Owned by exactly one table. Fields are public and have builder setters so
/// callers can patch a header before re-marshaling the table.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Setters, LeLayout)]
pub struct Header {
    /// ASCII table signature, e.g. `APIC`.
    #[le(offset = 0)]
    pub signature: [u8; 4],
    /// Total table length in bytes, header included.
    #[le(offset = 4)]
    pub length: u32,
    #[le(offset = 8)]
    pub revision: u8,
    /// Sum-to-zero checksum over the whole table.
    #[le(offset = 9)]
    pub checksum: u8,
    #[le(offset = 10)]
    pub oem_id: [u8; 6],
    #[le(offset = 16)]
    pub oem_table_id: [u8; 8],
    #[le(offset = 24)]
    pub oem_revision: u32,
    #[le(offset = 28)]
    pub creator_id: u32,
    #[le(offset = 32)]
    pub creator_revision: u32,
}

const _: () = assert!(<Header as LeLayout>::LEN == HEADER_LEN);

impl Header {
    /// A header for a new table with the given signature.
    #[must_use]
    pub fn new(signature: [u8; 4]) -> Self {
        Self {
            signature,
            ..Self::default()
        }
    }

    /// Decode the header from the start of `bytes`.
    ///
    /// # Errors
    /// [`Error::TooShort`] if fewer than [`HEADER_LEN`] bytes are supplied.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        <Self as LeLayout>::read_le(bytes).ok_or(Error::TooShort {
            need: HEADER_LEN,
            got: bytes.len(),
        })
    }

    /// Encode the header into its 36-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_le_vec()
    }
}

/// Render a fixed ASCII field, trimming trailing NULs and spaces.
#[must_use]
pub fn ascii(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches(['\0', ' '])
        .to_owned()
}

/// Pad or truncate `s` into an `N`-byte ASCII field.
#[must_use]
pub fn ascii_field<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [b' '; N];
    for (dst, src) in out.iter_mut().zip(s.bytes()) {
        *dst = src;
    }
    out
}
