//! # MADT (Multiple APIC Description Table)
//!
//! After the standard header the MADT carries the local APIC address and a
//! flags word, followed by a packed list of interrupt controller structures:
//!
//! ```text
//! +------+--------+----------------------+
//! | type | length | payload (length - 2) |
//! +------+--------+----------------------+
//! ```
//!
//! Every known type has a fixed length. Unknown types are skipped.

use std::ops::Range;

use bitfield_struct::bitfield;
use log::warn;

use crate::error::{Error, Result};
use crate::header::HEADER_LEN;
use crate::le::{LeField, LeLayout, le_bits};
use crate::marshal::finalize_table;
use crate::table::AcpiTable;

/// MADT signature (`b"APIC"`).
pub const MADT_SIGNATURE: &[u8; 4] = b"APIC";

/// Local APIC address and flags precede the sub-records.
pub const MADT_FIXED_LEN: usize = 8;

/// Sub-record types with a fixed, checked length.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum SubtableKind {
    LocalApic = 0,
    IoApic = 1,
    InterruptSourceOverride = 2,
    LocalApicNmi = 4,
    LocalApicAddressOverride = 5,
    LocalX2Apic = 9,
    LocalX2ApicNmi = 10,
}

impl SubtableKind {
    #[must_use]
    pub const fn from_type(kind: u8) -> Option<Self> {
        Some(match kind {
            0 => Self::LocalApic,
            1 => Self::IoApic,
            2 => Self::InterruptSourceOverride,
            4 => Self::LocalApicNmi,
            5 => Self::LocalApicAddressOverride,
            9 => Self::LocalX2Apic,
            10 => Self::LocalX2ApicNmi,
            _ => return None,
        })
    }

    /// Length of the record including its two-byte prefix.
    #[must_use]
    pub const fn expected_len(self) -> usize {
        match self {
            Self::LocalApic => 8,
            Self::IoApic | Self::LocalApicAddressOverride | Self::LocalX2ApicNmi => 12,
            Self::InterruptSourceOverride => 10,
            Self::LocalApicNmi => 6,
            Self::LocalX2Apic => 16,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LocalApic => "LocalAPIC",
            Self::IoApic => "IOAPIC",
            Self::InterruptSourceOverride => "InterruptSourceOverride",
            Self::LocalApicNmi => "LocalAPICNMI",
            Self::LocalApicAddressOverride => "LocalAPICAddressOverride",
            Self::LocalX2Apic => "LocalX2APIC",
            Self::LocalX2ApicNmi => "LocalX2APICNMI",
        }
    }
}

/// Local APIC and `x2APIC` flags.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct LocalApicFlags {
    /// The processor is usable.
    pub enabled: bool,
    /// The processor can be brought online later (ACPI 6.3+).
    pub online_capable: bool,
    #[bits(30)]
    __reserved: u32,
}

/// MPS INTI flags of overrides and NMI records.
#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct MpsIntiFlags {
    /// 0 = bus default, 1 = active high, 3 = active low.
    #[bits(2)]
    pub polarity: u8,
    /// 0 = bus default, 1 = edge, 3 = level.
    #[bits(2)]
    pub trigger_mode: u8,
    #[bits(12)]
    __reserved: u16,
}

le_bits!(LocalApicFlags, u32);
le_bits!(MpsIntiFlags, u16);

/// Type 0: Processor Local APIC.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct LocalApic {
    #[le(offset = 2)]
    pub processor_uid: u8,
    #[le(offset = 3)]
    pub apic_id: u8,
    #[le(offset = 4)]
    pub flags: LocalApicFlags,
}

/// Type 1: I/O APIC.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct IoApic {
    #[le(offset = 2)]
    pub id: u8,
    #[le(offset = 4)]
    pub address: u32,
    #[le(offset = 8)]
    pub gsi_base: u32,
}

/// Type 2: Interrupt Source Override.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct InterruptSourceOverride {
    /// Always 0 (ISA).
    #[le(offset = 2)]
    pub bus: u8,
    /// Bus-relative IRQ.
    #[le(offset = 3)]
    pub source: u8,
    #[le(offset = 4)]
    pub gsi: u32,
    #[le(offset = 8)]
    pub flags: MpsIntiFlags,
}

/// Type 4: Local APIC NMI.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct LocalApicNmi {
    /// `0xff` means all processors.
    #[le(offset = 2)]
    pub processor_uid: u8,
    #[le(offset = 3)]
    pub flags: MpsIntiFlags,
    /// LINT# input the NMI is wired to.
    #[le(offset = 5)]
    pub lint: u8,
}

/// Type 5: 64-bit Local APIC address override.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct LocalApicAddressOverride {
    #[le(offset = 4)]
    pub address: u64,
}

/// Type 9: Processor Local `x2APIC`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct LocalX2Apic {
    #[le(offset = 4)]
    pub x2apic_id: u32,
    #[le(offset = 8)]
    pub flags: LocalApicFlags,
    #[le(offset = 12)]
    pub processor_uid: u32,
}

/// Type 10: Local `x2APIC` NMI.
#[derive(Clone, Copy, Debug, Eq, PartialEq, LeLayout)]
pub struct LocalX2ApicNmi {
    #[le(offset = 2)]
    pub flags: MpsIntiFlags,
    /// `0xffff_ffff` means all processors.
    #[le(offset = 4)]
    pub processor_uid: u32,
    #[le(offset = 8)]
    pub lint: u8,
}

/// A typed view of a known sub-record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MadtEntry {
    LocalApic(LocalApic),
    IoApic(IoApic),
    InterruptSourceOverride(InterruptSourceOverride),
    LocalApicNmi(LocalApicNmi),
    LocalApicAddressOverride(LocalApicAddressOverride),
    LocalX2Apic(LocalX2Apic),
    LocalX2ApicNmi(LocalX2ApicNmi),
}

/// One recorded sub-record; `bytes` includes the two-byte prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Subtable<'a> {
    pub kind: u8,
    pub bytes: &'a [u8],
}

impl Subtable<'_> {
    /// Decode into a typed entry; `None` for unknown types.
    #[must_use]
    pub fn entry(&self) -> Option<MadtEntry> {
        let b = self.bytes;
        Some(match SubtableKind::from_type(self.kind)? {
            SubtableKind::LocalApic => MadtEntry::LocalApic(LeLayout::read_le(b)?),
            SubtableKind::IoApic => MadtEntry::IoApic(LeLayout::read_le(b)?),
            SubtableKind::InterruptSourceOverride => {
                MadtEntry::InterruptSourceOverride(LeLayout::read_le(b)?)
            }
            SubtableKind::LocalApicNmi => MadtEntry::LocalApicNmi(LeLayout::read_le(b)?),
            SubtableKind::LocalApicAddressOverride => {
                MadtEntry::LocalApicAddressOverride(LeLayout::read_le(b)?)
            }
            SubtableKind::LocalX2Apic => MadtEntry::LocalX2Apic(LeLayout::read_le(b)?),
            SubtableKind::LocalX2ApicNmi => MadtEntry::LocalX2ApicNmi(LeLayout::read_le(b)?),
        })
    }
}

/// A decoded MADT.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Madt {
    data: Vec<u8>,
    base: u64,
    local_apic_address: u32,
    flags: u32,
    subtables: Vec<(u8, Range<usize>)>,
}

impl Madt {
    /// Decode the sub-records of an `APIC` table.
    ///
    /// # Errors
    /// * [`Error::WrongSignature`] for any other table.
    /// * [`Error::TooShort`] if the body cannot hold the address and flags.
    /// * [`Error::SubtableTruncated`] for an incomplete prefix, or an unknown
    ///   type whose declared length is below two.
    /// * [`Error::SizeMismatch`] if a known type has the wrong length,
    ///   including zero or one.
    /// * [`Error::BufferUnderrun`] if a record runs past the table end.
    pub fn decode(table: &impl AcpiTable) -> Result<Self> {
        if table.signature() != MADT_SIGNATURE {
            return Err(Error::WrongSignature {
                expected: "APIC",
                found: String::from_utf8_lossy(table.signature()).into_owned(),
            });
        }

        let body = table.table_data();
        if body.len() < MADT_FIXED_LEN {
            return Err(Error::TooShort {
                need: MADT_FIXED_LEN,
                got: body.len(),
            });
        }
        let local_apic_address = u32::read_le(body, 0).unwrap_or(0);
        let flags = u32::read_le(body, 4).unwrap_or(0);

        let start = HEADER_LEN + MADT_FIXED_LEN;
        let mut subtables = Vec::new();
        let mut off = MADT_FIXED_LEN;
        while off < body.len() {
            let rest = &body[off..];
            let [kind, len, ..] = *rest else {
                return Err(Error::SubtableTruncated { offset: off });
            };
            let len = usize::from(len);

            match SubtableKind::from_type(kind) {
                Some(known) => {
                    if len != known.expected_len() {
                        return Err(Error::SizeMismatch {
                            kind,
                            name: known.name(),
                            expected: known.expected_len(),
                            actual: len,
                        });
                    }
                    if len > rest.len() {
                        return Err(Error::BufferUnderrun {
                            kind,
                            name: known.name(),
                            declared: len,
                            remaining: rest.len(),
                        });
                    }
                    let at = start + off - MADT_FIXED_LEN;
                    subtables.push((kind, at..at + len));
                }
                None => {
                    if len < 2 {
                        return Err(Error::SubtableTruncated { offset: off });
                    }
                    if len > rest.len() {
                        return Err(Error::BufferUnderrun {
                            kind,
                            name: "unknown",
                            declared: len,
                            remaining: rest.len(),
                        });
                    }
                    warn!("MADT: skipping unknown sub-record type {kind} ({len} bytes)");
                }
            }
            off += len;
        }

        Ok(Self {
            data: table.data().to_vec(),
            base: table.base(),
            local_apic_address,
            flags,
            subtables,
        })
    }

    /// Physical address of the local APIC as stored in the table body.
    #[must_use]
    pub const fn local_apic_address(&self) -> u32 {
        self.local_apic_address
    }

    /// MADT flags; bit 0 set means dual 8259 PICs are installed.
    #[must_use]
    pub const fn flags(&self) -> u32 {
        self.flags
    }

    #[must_use]
    pub fn pcat_compat(&self) -> bool {
        self.flags & 1 != 0
    }

    /// Recorded sub-records in table order. Unknown types are not included.
    pub fn subtables(&self) -> impl Iterator<Item = Subtable<'_>> + '_ {
        self.subtables.iter().map(|(kind, range)| Subtable {
            kind: *kind,
            bytes: &self.data[range.clone()],
        })
    }

    /// Typed entries in table order.
    pub fn entries(&self) -> impl Iterator<Item = MadtEntry> + '_ {
        self.subtables().filter_map(|s| s.entry())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subtables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subtables.is_empty()
    }
}

impl AcpiTable for Madt {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn base(&self) -> u64 {
        self.base
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        finalize_table(self.data.clone())
    }
}
