//! # RSDT/XSDT (Root/Extended System Description Table)
//!
//! The root table is a standard header followed by an array of physical
//! addresses: 32-bit wide in an `RSDT`, 64-bit wide in an `XSDT`.

use crate::error::{Error, Result};
use crate::header::{HEADER_LEN, Header, ascii_field};
use crate::le::LeField;
use crate::marshal::finalize_table;
use crate::table::AcpiTable;

pub const RSDT_SIGNATURE: &[u8; 4] = b"RSDT";
pub const XSDT_SIGNATURE: &[u8; 4] = b"XSDT";

/// A root system description table and the addresses it points at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sdt {
    header: Header,
    pointers: Vec<u64>,
    /// Bytes after the last whole entry.
    tail: Vec<u8>,
    data: Vec<u8>,
    base: u64,
}

impl Sdt {
    /// Build a fresh `XSDT` pointing at `pointers`.
    ///
    /// # Errors
    /// [`Error::TooLong`] if the pointer array overflows the length field.
    pub fn new(pointers: Vec<u64>) -> Result<Self> {
        let header = Header::new(*XSDT_SIGNATURE)
            .with_revision(1)
            .with_oem_id(ascii_field("FWACPI"))
            .with_oem_table_id(ascii_field("FWACPI"))
            .with_oem_revision(1);
        let mut sdt = Self {
            header,
            pointers,
            tail: Vec::new(),
            data: Vec::new(),
            base: 0,
        };
        sdt.data = sdt.marshal()?;
        sdt.header = Header::parse(&sdt.data)?;
        Ok(sdt)
    }

    /// Interpret an `RSDT` or `XSDT` table.
    ///
    /// The pointer count is `(length - 36) / width`. A trailing partial entry
    /// is not a pointer, but it is kept and re-emitted by `marshal`.
    ///
    /// # Errors
    /// [`Error::WrongSignature`] for any other signature and
    /// [`Error::TooShort`] if the header is incomplete.
    pub fn from_table(table: &impl AcpiTable) -> Result<Self> {
        let header = Header::parse(table.data())?;
        let width = pointer_width(&header.signature).ok_or_else(|| Error::WrongSignature {
            expected: "RSDT/XSDT",
            found: String::from_utf8_lossy(&header.signature).into_owned(),
        })?;

        let entries = table.table_data().chunks_exact(width);
        let tail = entries.remainder().to_vec();
        let pointers = entries
            .filter_map(|c| {
                if width == 8 {
                    u64::read_le(c, 0)
                } else {
                    u32::read_le(c, 0).map(u64::from)
                }
            })
            .collect();

        Ok(Self {
            header,
            pointers,
            tail,
            data: table.data().to_vec(),
            base: table.base(),
        })
    }

    /// The physical addresses of the tables this root references, in order.
    #[must_use]
    pub fn pointers(&self) -> &[u64] {
        &self.pointers
    }

    /// Bytes per pointer entry: 4 for `RSDT`, 8 for `XSDT`.
    #[must_use]
    pub fn pointer_width(&self) -> usize {
        pointer_width(&self.header.signature).unwrap_or(8)
    }

    #[must_use]
    pub fn is_xsdt(&self) -> bool {
        self.header.signature == *XSDT_SIGNATURE
    }

    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }
}

fn pointer_width(signature: &[u8; 4]) -> Option<usize> {
    match signature {
        b"RSDT" => Some(4),
        b"XSDT" => Some(8),
        _ => None,
    }
}

impl AcpiTable for Sdt {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn base(&self) -> u64 {
        self.base
    }

    fn signature(&self) -> &[u8] {
        &self.header.signature
    }

    fn length(&self) -> u32 {
        self.header.length
    }

    /// Re-emits the header followed by the pointer array at the source width
    /// and any trailing partial entry. Pointers that do not fit an `RSDT`
    /// entry are truncated to 32 bits.
    fn marshal(&self) -> Result<Vec<u8>> {
        let width = self.pointer_width();
        let mut out = self.header.to_bytes();
        out.reserve(self.pointers.len() * width + self.tail.len());
        for &p in &self.pointers {
            if width == 8 {
                out.extend_from_slice(&p.to_le_bytes());
            } else {
                #[allow(clippy::cast_possible_truncation)]
                out.extend_from_slice(&(p as u32).to_le_bytes());
            }
        }
        out.extend_from_slice(&self.tail);
        debug_assert!(out.len() >= HEADER_LEN);
        finalize_table(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Raw;

    #[test]
    fn new_xsdt_round_trips() {
        let sdt = Sdt::new(vec![0x1000, 0xdead_beef_0000]).unwrap();
        assert!(sdt.is_xsdt());
        assert_eq!(sdt.length() as usize, HEADER_LEN + 16);
        assert!(sdt.checksum_ok());

        let back = Sdt::from_table(&Raw::new(sdt.data()).unwrap()).unwrap();
        assert_eq!(back.pointers(), &[0x1000, 0xdead_beef_0000]);
        assert_eq!(back.header(), sdt.header());
    }

    #[test]
    fn rsdt_uses_32_bit_entries() {
        let mut bytes = Header::new(*RSDT_SIGNATURE).to_bytes();
        bytes.extend_from_slice(&0x7fe1_4000u32.to_le_bytes());
        bytes.extend_from_slice(&0x7fe1_5000u32.to_le_bytes());
        bytes.extend_from_slice(&[0xaa, 0xbb]); // partial entry
        let bytes = finalize_table(bytes).unwrap();

        let sdt = Sdt::from_table(&Raw::new(&bytes).unwrap()).unwrap();
        assert_eq!(sdt.pointer_width(), 4);
        assert_eq!(sdt.pointers(), &[0x7fe1_4000, 0x7fe1_5000]);

        let out = sdt.marshal().unwrap();
        assert_eq!(out.len(), HEADER_LEN + 10);
        assert_eq!(out, bytes);
    }

    #[test]
    fn rejects_other_signatures() {
        let bytes = finalize_table(Header::new(*b"FACP").to_bytes()).unwrap();
        let err = Sdt::from_table(&Raw::new(&bytes).unwrap()).unwrap_err();
        assert!(matches!(err, Error::WrongSignature { .. }));
    }
}
