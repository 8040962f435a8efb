//! # Tables
//!
//! [`Table`] is the closed set of table variants this crate produces. All of
//! them answer the same header questions through [`AcpiTable`].

use std::fmt;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::header::{HEADER_LEN, Header, ascii};
use crate::le::LeField;
use crate::madt::{MADT_SIGNATURE, Madt};
use crate::marshal::{MIN_TABLE_LEN, finalize_table, sum};
use crate::rsdp::{RSDP_LEN, RSDP_SIGNATURE, Rsdp};
use crate::sdt::Sdt;

/// Common accessors shared by every table variant.
///
/// The default implementations read the standard header directly out of
/// [`AcpiTable::data`]; fields that lie beyond a short table read as empty/zero.
pub trait AcpiTable {
    /// The complete table, header included.
    fn data(&self) -> &[u8];

    /// Physical address the table was read from, `0` if unknown.
    fn base(&self) -> u64 {
        0
    }

    fn signature(&self) -> &[u8] {
        field(self.data(), 0, 4)
    }

    fn length(&self) -> u32 {
        u32::read_le(self.data(), 4).unwrap_or(0)
    }

    fn revision(&self) -> u8 {
        u8::read_le(self.data(), 8).unwrap_or(0)
    }

    fn checksum(&self) -> u8 {
        u8::read_le(self.data(), 9).unwrap_or(0)
    }

    fn oem_id(&self) -> &[u8] {
        field(self.data(), 10, 6)
    }

    fn oem_table_id(&self) -> &[u8] {
        field(self.data(), 16, 8)
    }

    fn oem_revision(&self) -> u32 {
        u32::read_le(self.data(), 24).unwrap_or(0)
    }

    fn creator_id(&self) -> u32 {
        u32::read_le(self.data(), 28).unwrap_or(0)
    }

    fn creator_revision(&self) -> u32 {
        u32::read_le(self.data(), 32).unwrap_or(0)
    }

    /// The table body, i.e. everything after the 36-byte header.
    fn table_data(&self) -> &[u8] {
        self.data().get(HEADER_LEN..).unwrap_or_default()
    }

    /// Whether the stored bytes currently sum to zero.
    fn checksum_ok(&self) -> bool {
        sum(self.data()) == 0
    }

    /// Serialize the table with a freshly stamped length and checksum.
    ///
    /// # Errors
    /// Propagates [`finalize_table`] failures.
    fn marshal(&self) -> Result<Vec<u8>>;
}

fn field(data: &[u8], offset: usize, len: usize) -> &[u8] {
    let end = (offset + len).min(data.len());
    data.get(offset..end).unwrap_or_default()
}

/// A table known only by its bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Raw {
    data: Vec<u8>,
    base: u64,
}

impl Raw {
    /// Wrap a table read from `bytes`. Bytes past the declared length are ignored.
    ///
    /// # Errors
    /// [`Error::TooShort`] if `bytes` (or the declared length) is below the
    /// 10-byte minimum, [`Error::Truncated`] if the declared length exceeds
    /// `bytes`.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_TABLE_LEN {
            return Err(Error::TooShort {
                need: MIN_TABLE_LEN,
                got: bytes.len(),
            });
        }
        let declared = u32::read_le(bytes, 4).unwrap_or(0) as usize;
        if declared < MIN_TABLE_LEN {
            return Err(Error::TooShort {
                need: MIN_TABLE_LEN,
                got: declared,
            });
        }
        let data = bytes.get(..declared).ok_or(Error::Truncated {
            declared,
            available: bytes.len(),
        })?;
        Ok(Self {
            data: data.to_vec(),
            base: 0,
        })
    }

    /// Like [`Raw::new`], remembering the physical address the bytes came from.
    ///
    /// # Errors
    /// Same as [`Raw::new`].
    pub fn at(bytes: &[u8], base: u64) -> Result<Self> {
        let mut raw = Self::new(bytes)?;
        raw.base = base;
        Ok(raw)
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl AcpiTable for Raw {
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

/// A table with a parsed, mutable header and an opaque body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Generic {
    header: Header,
    data: Vec<u8>,
    base: u64,
}

impl Generic {
    /// Parse the header of any table with at least a full standard header.
    ///
    /// # Errors
    /// [`Error::TooShort`] if the table is shorter than 36 bytes.
    pub fn from_table(table: &impl AcpiTable) -> Result<Self> {
        Ok(Self {
            header: Header::parse(table.data())?,
            data: table.data().to_vec(),
            base: table.base(),
        })
    }

    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Mutable access to the header; changes show up in [`AcpiTable::marshal`].
    pub const fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }
}

impl AcpiTable for Generic {
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

    fn revision(&self) -> u8 {
        self.header.revision
    }

    fn checksum(&self) -> u8 {
        self.header.checksum
    }

    fn oem_id(&self) -> &[u8] {
        &self.header.oem_id
    }

    fn oem_table_id(&self) -> &[u8] {
        &self.header.oem_table_id
    }

    fn oem_revision(&self) -> u32 {
        self.header.oem_revision
    }

    fn creator_id(&self) -> u32 {
        self.header.creator_id
    }

    fn creator_revision(&self) -> u32 {
        self.header.creator_revision
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = self.header.to_bytes();
        out.extend_from_slice(self.table_data());
        finalize_table(out)
    }
}

/// Every kind of table this crate hands out.
#[derive(Clone, Debug)]
pub enum Table {
    Raw(Raw),
    Generic(Generic),
    Sdt(Sdt),
    Rsdp(Rsdp),
    Madt(Madt),
}

macro_rules! each_variant {
    ($self:ident, $t:ident => $e:expr) => {
        match $self {
            Table::Raw($t) => $e,
            Table::Generic($t) => $e,
            Table::Sdt($t) => $e,
            Table::Rsdp($t) => $e,
            Table::Madt($t) => $e,
        }
    };
}

impl AcpiTable for Table {
    fn data(&self) -> &[u8] {
        each_variant!(self, t => t.data())
    }

    fn base(&self) -> u64 {
        each_variant!(self, t => t.base())
    }

    fn signature(&self) -> &[u8] {
        each_variant!(self, t => t.signature())
    }

    fn length(&self) -> u32 {
        each_variant!(self, t => t.length())
    }

    fn revision(&self) -> u8 {
        each_variant!(self, t => t.revision())
    }

    fn checksum(&self) -> u8 {
        each_variant!(self, t => t.checksum())
    }

    fn oem_id(&self) -> &[u8] {
        each_variant!(self, t => t.oem_id())
    }

    fn oem_table_id(&self) -> &[u8] {
        each_variant!(self, t => t.oem_table_id())
    }

    fn oem_revision(&self) -> u32 {
        each_variant!(self, t => t.oem_revision())
    }

    fn creator_id(&self) -> u32 {
        each_variant!(self, t => t.creator_id())
    }

    fn creator_revision(&self) -> u32 {
        each_variant!(self, t => t.creator_revision())
    }

    fn table_data(&self) -> &[u8] {
        each_variant!(self, t => t.table_data())
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        each_variant!(self, t => t.marshal())
    }
}

impl Table {
    /// Pick the most specific variant for a raw table by its signature.
    ///
    /// `APIC` becomes [`Table::Madt`], `RSDT`/`XSDT` become [`Table::Sdt`],
    /// anything with a full header becomes [`Table::Generic`], the rest stays
    /// [`Table::Raw`].
    ///
    /// # Errors
    /// Propagates MADT and SDT decode failures.
    pub fn decode(raw: Raw) -> Result<Self> {
        match raw.signature() {
            s if s == MADT_SIGNATURE => Ok(Self::Madt(Madt::decode(&raw)?)),
            b"RSDT" | b"XSDT" => Ok(Self::Sdt(Sdt::from_table(&raw)?)),
            _ if raw.data().len() >= HEADER_LEN => Ok(Self::Generic(Generic::from_table(&raw)?)),
            _ => Ok(Self::Raw(raw)),
        }
    }

    /// The signature as text, lossy for non-ASCII bytes.
    #[must_use]
    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.signature()).into_owned()
    }
}

impl From<Raw> for Table {
    fn from(t: Raw) -> Self {
        Self::Raw(t)
    }
}

impl From<Generic> for Table {
    fn from(t: Generic) -> Self {
        Self::Generic(t)
    }
}

impl From<Sdt> for Table {
    fn from(t: Sdt) -> Self {
        Self::Sdt(t)
    }
}

impl From<Rsdp> for Table {
    fn from(t: Rsdp) -> Self {
        Self::Rsdp(t)
    }
}

impl From<Madt> for Table {
    fn from(t: Madt) -> Self {
        Self::Madt(t)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {:#x}: len {:#x} rev {} csum {:#04x} oem {:?}/{:?} oemrev {:#x} creator {:#x}/{:#x}",
            self.name(),
            self.base(),
            self.length(),
            self.revision(),
            self.checksum(),
            ascii(self.oem_id()),
            ascii(self.oem_table_id()),
            self.oem_revision(),
            self.creator_id(),
            self.creator_revision(),
        )
    }
}

/// Decode a captured stream of back-to-back raw tables.
///
/// An RSDP has no length field; a `"RSD PTR "` tag consumes exactly 36 bytes.
///
/// # Errors
/// I/O errors from `reader`, or a decode failure annotated with the stream
/// offset of the offending table.
pub fn read_tables(reader: &mut impl Read) -> Result<Vec<Table>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;

    let mut tables = Vec::new();
    let mut off = 0;
    while off < buf.len() {
        let rest = &buf[off..];
        let table = if rest.starts_with(RSDP_SIGNATURE) {
            Table::Rsdp(Rsdp::parse(rest, 0).map_err(|e| e.at_offset(off))?)
        } else {
            Table::Raw(Raw::new(rest).map_err(|e| e.at_offset(off))?)
        };
        off += match &table {
            Table::Rsdp(_) => RSDP_LEN,
            other => other.data().len(),
        };
        tables.push(table);
    }
    Ok(tables)
}

/// Marshal every table and write them back-to-back.
///
/// # Errors
/// Marshaling or I/O errors; nothing further is written after the first one.
pub fn write_tables<'a>(
    writer: &mut impl Write,
    tables: impl IntoIterator<Item = &'a Table>,
) -> Result<()> {
    for t in tables {
        writer.write_all(&t.marshal()?)?;
    }
    Ok(())
}

/// First table with the given signature.
#[must_use]
pub fn find_table<'a>(tables: &'a [Table], signature: &[u8]) -> Option<&'a Table> {
    tables.iter().find(|t| t.signature() == signature)
}

/// Keep only the tables whose signature is one of `signatures`.
#[must_use]
pub fn filter_tables<S: AsRef<[u8]>>(
    tables: impl IntoIterator<Item = Table>,
    signatures: &[S],
) -> Vec<Table> {
    tables
        .into_iter()
        .filter(|t| signatures.iter().any(|s| s.as_ref() == t.signature()))
        .collect()
}
