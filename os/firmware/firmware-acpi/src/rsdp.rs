//! # RSDP/XSDP (Root/Extended System Description Pointer)

use crate::error::{Error, Result};
use crate::header::ascii_field;
use crate::le::LeLayout;
use crate::marshal::{checksum, sum};
use crate::table::AcpiTable;

/// The 8-byte tag every RSDP starts with.
pub const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// The 4-byte signature an RSDP reports through [`AcpiTable::signature`], so
/// it can be found and filtered like any other table.
pub const RSDP_TABLE_SIGNATURE: &[u8; 4] = b"RSDP";

/// Size of the ACPI 1.0 part covered by the legacy checksum.
pub const RSDP_V1_LEN: usize = 20;

/// Size of the ACPI 2.0+ structure.
pub const RSDP_LEN: usize = 36;

#[allow(clippy::cast_possible_truncation)]
const LENGTH_FIELD: u32 = RSDP_LEN as u32;

/// Wire layout of the ACPI 2.0 Extended System Description Pointer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, LeLayout)]
struct RsdpLayout {
    #[le(offset = 0)]
    signature: [u8; 8], // "RSD PTR "
    #[le(offset = 8)]
    checksum: u8, // sum of first 20 bytes == 0
    #[le(offset = 9)]
    oem_id: [u8; 6],
    #[le(offset = 15)]
    revision: u8, // 0 for ACPI 1.0, 2 for ACPI 2.0+
    #[le(offset = 16)]
    rsdt_addr: u32,
    #[le(offset = 20)]
    length: u32,
    #[le(offset = 24)]
    xsdt_addr: u64,
    #[le(offset = 32)]
    ext_checksum: u8, // checksum of entire table
    #[le(offset = 33)]
    reserved: [u8; 3],
}

const _: () = assert!(<RsdpLayout as LeLayout>::LEN == RSDP_LEN);

/// A validated root system description pointer.
///
/// `base` is where the structure was found; it is not part of the wire bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rsdp {
    base: u64,
    layout: RsdpLayout,
    data: Vec<u8>,
}

impl Rsdp {
    /// Build a fresh ACPI 2.0 RSDP pointing at an XSDT, both checksums stamped.
    #[must_use]
    pub fn new(xsdt_addr: u64) -> Self {
        let layout = RsdpLayout {
            signature: *RSDP_SIGNATURE,
            oem_id: ascii_field("FWACPI"),
            revision: 2,
            length: LENGTH_FIELD,
            xsdt_addr,
            ..RsdpLayout::default()
        };
        let data = stamp(layout);
        Self {
            base: 0,
            layout: RsdpLayout::read_le(&data).unwrap_or(layout),
            data,
        }
    }

    /// Validate an RSDP read from physical address `base`.
    ///
    /// Requires the `"RSD PTR "` tag and a zero sum over the first 20 bytes.
    /// The extended checksum is not enforced.
    ///
    /// # Errors
    /// [`Error::TooShort`] if fewer than 36 bytes are supplied, and
    /// [`Error::Invalid`] for a bad tag or legacy checksum.
    pub fn parse(bytes: &[u8], base: u64) -> Result<Self> {
        let layout = RsdpLayout::read_le(bytes).ok_or(Error::TooShort {
            need: RSDP_LEN,
            got: bytes.len(),
        })?;
        if layout.signature != *RSDP_SIGNATURE {
            return Err(Error::Invalid {
                what: "RSDP",
                reason: format!("bad signature {:?}", String::from_utf8_lossy(&layout.signature)),
            });
        }
        if sum(&bytes[..RSDP_V1_LEN]) != 0 {
            return Err(Error::Invalid {
                what: "RSDP",
                reason: "legacy checksum mismatch".into(),
            });
        }
        Ok(Self {
            base,
            layout,
            data: bytes[..RSDP_LEN].to_vec(),
        })
    }

    /// Physical address the structure was found at.
    #[must_use]
    pub const fn base_address(&self) -> u64 {
        self.base
    }

    #[must_use]
    pub const fn rsdt_address(&self) -> u64 {
        self.layout.rsdt_addr as u64
    }

    /// The XSDT address, or `0` for ACPI 1.0 structures which have none.
    #[must_use]
    pub const fn xsdt_address(&self) -> u64 {
        if self.layout.revision >= 2 {
            self.layout.xsdt_addr
        } else {
            0
        }
    }

    /// The root table to walk: the XSDT if present, else the RSDT.
    #[must_use]
    pub const fn sdt_address(&self) -> u64 {
        match self.xsdt_address() {
            0 => self.rsdt_address(),
            x => x,
        }
    }

    /// Whether the extended checksum over all 36 bytes holds.
    #[must_use]
    pub fn extended_checksum_ok(&self) -> bool {
        self.layout.revision < 2 || sum(&self.data) == 0
    }
}

/// Encode `layout`, stamping the length, legacy and extended checksums.
fn stamp(mut layout: RsdpLayout) -> Vec<u8> {
    layout.length = LENGTH_FIELD;
    layout.checksum = 0;
    layout.ext_checksum = 0;
    let mut out = layout.to_le_vec();
    out[8] = checksum(&out[..RSDP_V1_LEN]);
    out[32] = checksum(&out);
    out
}

impl AcpiTable for Rsdp {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn base(&self) -> u64 {
        self.base
    }

    fn signature(&self) -> &[u8] {
        RSDP_TABLE_SIGNATURE
    }

    fn length(&self) -> u32 {
        LENGTH_FIELD
    }

    fn revision(&self) -> u8 {
        self.layout.revision
    }

    fn checksum(&self) -> u8 {
        self.layout.checksum
    }

    fn oem_id(&self) -> &[u8] {
        &self.data[9..15]
    }

    fn oem_table_id(&self) -> &[u8] {
        &[]
    }

    fn oem_revision(&self) -> u32 {
        0
    }

    fn creator_id(&self) -> u32 {
        0
    }

    fn creator_revision(&self) -> u32 {
        0
    }

    fn table_data(&self) -> &[u8] {
        &[]
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        Ok(stamp(self.layout))
    }
}
