//! # Walking the table chain in physical memory

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::header::HEADER_LEN;
use crate::le::LeField;
use crate::locate::RsdpLocator;
use crate::marshal::MIN_TABLE_LEN;
use crate::phys::PhysMem;
use crate::rsdp::Rsdp;
use crate::sdt::Sdt;
use crate::table::{AcpiTable, Raw, Table};

/// FADT signature.
pub const FADT_SIGNATURE: &[u8; 4] = b"FACP";

/// FADT offset of the 32-bit DSDT pointer.
pub const FADT_DSDT32_OFFSET: usize = 40;

/// FADT offset of the 64-bit `X_DSDT` pointer (ACPI 2.0+).
pub const FADT_DSDT64_OFFSET: usize = 140;

/// Pointers at or above this address are kernel virtual addresses some
/// firmware leaves behind; only the low 32 bits are physical.
const KERNEL_VA_BASE: u64 = 0xffff_8000_0000_0000;

/// The RSDP and every table reachable from it, in discovery order.
///
/// The first table is always the root SDT.
#[derive(Clone, Debug)]
pub struct BiosTable {
    rsdp: Rsdp,
    tables: Vec<Table>,
}

impl BiosTable {
    /// Locate the RSDP with `locator` and walk the chain in `mem`.
    ///
    /// # Errors
    /// [`Error::RsdpNotFound`] or any [`walk_sdt`] failure.
    pub fn read(mem: &impl PhysMem, locator: &RsdpLocator<'_>) -> Result<Self> {
        let rsdp = locator.locate()?;
        walk_sdt(mem, rsdp)
    }

    #[must_use]
    pub const fn rsdp(&self) -> &Rsdp {
        &self.rsdp
    }

    /// The root SDT followed by every table it references.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// The RSDP followed by every table.
    #[must_use]
    pub fn into_tables(self) -> Vec<Table> {
        let mut all = Vec::with_capacity(self.tables.len() + 1);
        all.push(Table::Rsdp(self.rsdp));
        all.extend(self.tables);
        all
    }
}

/// Read one table from physical memory: its header, then its declared length.
///
/// # Errors
/// Read failures or a malformed length, annotated with `addr`.
pub fn read_table(mem: &impl PhysMem, addr: u64) -> Result<Raw> {
    read_table_inner(mem, addr).map_err(|e| e.at(addr))
}

fn read_table_inner(mem: &impl PhysMem, addr: u64) -> Result<Raw> {
    let header = mem.read_phys(addr, HEADER_LEN)?;
    let len = u32::read_le(&header, 4).unwrap_or(0) as usize;
    if len < MIN_TABLE_LEN {
        return Err(Error::TooShort {
            need: MIN_TABLE_LEN,
            got: len,
        });
    }
    let data = mem.read_phys(addr, len)?;
    Raw::at(&data, addr)
}

/// Walk every table referenced by `rsdp`.
///
/// The root is the XSDT when the RSDP carries one, the RSDT otherwise. Each
/// FADT is followed by the DSDT it points at. Any unreadable table aborts the
/// walk.
///
/// # Errors
/// The first read or decode failure, annotated with its physical address.
pub fn walk_sdt(mem: &impl PhysMem, rsdp: Rsdp) -> Result<BiosTable> {
    let root_addr = rsdp.sdt_address();
    let root = read_table(mem, root_addr)?;
    let sdt = Sdt::from_table(&root).map_err(|e| e.at(root_addr))?;
    debug!(
        "{} at {root_addr:#x} lists {} tables",
        String::from_utf8_lossy(sdt.signature()),
        sdt.pointers().len()
    );

    let pointers = sdt.pointers().to_vec();
    let mut tables = vec![Table::Sdt(sdt)];
    for addr in pointers {
        let table = read_table(mem, addr)?;
        let dsdt = if table.signature() == FADT_SIGNATURE {
            fadt_dsdt_address(&table).map_err(|e| e.at(addr))?
        } else {
            None
        };
        tables.push(Table::Raw(table));

        if let Some(dsdt) = dsdt {
            tables.push(Table::Raw(read_table(mem, dsdt)?));
        }
    }

    Ok(BiosTable { rsdp, tables })
}

/// The physical DSDT address stored in a FADT, if any.
///
/// Prefers the 64-bit `X_DSDT` field and falls back to the 32-bit `DSDT`
/// field when the former is absent (short FADT) or zero.
///
/// # Errors
/// [`Error::Truncated`] if the FADT is too short to hold even the 32-bit field.
pub fn fadt_dsdt_address(fadt: &impl AcpiTable) -> Result<Option<u64>> {
    let data = fadt.data();
    let addr = match u64::read_le(data, FADT_DSDT64_OFFSET) {
        Some(x) if x != 0 => x,
        _ => u32::read_le(data, FADT_DSDT32_OFFSET)
            .map(u64::from)
            .ok_or(Error::Truncated {
                declared: FADT_DSDT32_OFFSET + 4,
                available: data.len(),
            })?,
    };

    if addr == 0 {
        warn!("FADT carries no DSDT pointer");
        return Ok(None);
    }
    if addr >= KERNEL_VA_BASE {
        let masked = addr & 0xffff_ffff;
        debug!("DSDT pointer {addr:#x} looks virtual, using {masked:#x}");
        return Ok(Some(masked));
    }
    Ok(Some(addr))
}
