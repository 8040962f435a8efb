//! # RSDP discovery
//!
//! The RSDP can be found in three mutually independent ways. They are tried
//! in a fixed order and the first structurally valid hit wins:
//!
//! 1. **EBDA**: the segment stored in the BIOS data area at `0x40E` points at
//!    the Extended BIOS Data Area, which is scanned on 16-byte boundaries.
//! 2. **Legacy range**: the BIOS read-only area `0xE0000..=0xFFFF0`, again on
//!    16-byte boundaries.
//! 3. **EFI**: the `ACPI20=` (preferred) or `ACPI=` entry of the EFI system
//!    table export names the address directly.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::SourcePaths;
use crate::error::{Error, Result};
use crate::fallback::{Strategy, first_ok};
use crate::le::LeField;
use crate::phys::{DevMem, PhysMem};
use crate::rsdp::{RSDP_LEN, RSDP_SIGNATURE, Rsdp};

/// BIOS data area word holding the EBDA real-mode segment.
pub const BDA_EBDA_SEGMENT: u64 = 0x40e;

/// EBDA bytes scanned when its size byte reads zero: the first KiB, as ACPI requires.
pub const EBDA_DEFAULT_LEN: usize = 1024;

/// First address of the legacy BIOS scan window.
pub const LEGACY_START: u64 = 0xe_0000;

/// Last 16-byte aligned candidate in the legacy BIOS scan window.
pub const LEGACY_END: u64 = 0xf_fff0;

const SCAN_STEP: usize = 16;

/// Scan `region` (a copy of physical memory starting at `base`) for an RSDP.
///
/// Candidates are re-read from `mem` so a hit close to the end of `region`
/// still yields the full 36-byte structure.
///
/// # Errors
/// [`Error::Invalid`] if no candidate validates.
pub fn scan_for_rsdp(mem: &impl PhysMem, base: u64, region: &[u8]) -> Result<Rsdp> {
    for off in (0..region.len()).step_by(SCAN_STEP) {
        if !region[off..].starts_with(RSDP_SIGNATURE) {
            continue;
        }
        let addr = base + off as u64;
        match mem
            .read_phys(addr, RSDP_LEN)
            .map_err(Error::from)
            .and_then(|b| Rsdp::parse(&b, addr))
        {
            Ok(rsdp) => return Ok(rsdp),
            Err(e) => debug!("RSDP candidate at {addr:#x} rejected: {e}"),
        }
    }
    Err(Error::Invalid {
        what: "RSDP scan",
        reason: format!(
            "no valid RSDP in {base:#x}..{:#x}",
            base + region.len() as u64
        ),
    })
}

/// Locate the RSDP in the Extended BIOS Data Area.
///
/// # Errors
/// Missing EBDA pointer, read failures, or no valid candidate in the area.
pub fn rsdp_from_ebda(mem: &impl PhysMem) -> Result<Rsdp> {
    let seg = mem
        .read_phys(BDA_EBDA_SEGMENT, 2)
        .map_err(|e| Error::from(e).at(BDA_EBDA_SEGMENT))?;
    let base = u64::from(u16::read_le(&seg, 0).unwrap_or(0)) << 4;
    if base == 0 {
        return Err(Error::Invalid {
            what: "EBDA",
            reason: "BIOS data area holds no EBDA segment".into(),
        });
    }

    // The first byte of the EBDA is its size in KiB.
    let size = mem
        .read_phys(base, 1)
        .map_err(|e| Error::from(e).at(base))?;
    let len = match size.first().copied().unwrap_or(0) {
        0 => EBDA_DEFAULT_LEN,
        kib => usize::from(kib) * 1024,
    };

    let region = mem
        .read_phys(base, len)
        .map_err(|e| Error::from(e).at(base))?;
    scan_for_rsdp(mem, base, &region)
}

/// Locate the RSDP in the legacy BIOS area `0xE0000..=0xFFFF0`.
///
/// # Errors
/// Read failures or no valid candidate in the window.
pub fn rsdp_from_legacy_range(mem: &impl PhysMem) -> Result<Rsdp> {
    #[allow(clippy::cast_possible_truncation)]
    let len = (LEGACY_END - LEGACY_START) as usize + SCAN_STEP;
    let region = mem
        .read_phys(LEGACY_START, len)
        .map_err(|e| Error::from(e).at(LEGACY_START))?;
    scan_for_rsdp(mem, LEGACY_START, &region)
}

/// Locate the RSDP through the EFI system table export at `systab`.
///
/// # Errors
/// Unreadable file, no `ACPI20=`/`ACPI=` line, a malformed address, or an
/// invalid structure at that address.
pub fn rsdp_from_efi_systab(mem: &impl PhysMem, systab: &Path) -> Result<Rsdp> {
    let text = fs::read_to_string(systab).map_err(|e| Error::from(e).in_file(systab))?;
    let addr = systab_acpi_address(&text).map_err(|e| e.in_file(systab))?;
    let bytes = mem
        .read_phys(addr, RSDP_LEN)
        .map_err(|e| Error::from(e).at(addr))?;
    Rsdp::parse(&bytes, addr).map_err(|e| e.at(addr))
}

/// Pick the RSDP address out of EFI system table text, preferring `ACPI20=`.
///
/// # Errors
/// [`Error::Invalid`] if neither entry is present or the address is malformed.
pub fn systab_acpi_address(text: &str) -> Result<u64> {
    let mut acpi10 = None;
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.trim() {
            "ACPI20" => return parse_address(value),
            "ACPI" if acpi10.is_none() => acpi10 = Some(value),
            _ => {}
        }
    }
    acpi10.map_or_else(
        || {
            Err(Error::Invalid {
                what: "EFI systab",
                reason: "no ACPI20= or ACPI= entry".into(),
            })
        },
        parse_address,
    )
}

/// Parse a `0x`-prefixed hexadecimal or a plain decimal address.
fn parse_address(value: &str) -> Result<u64> {
    let v = value.trim();
    let parsed = match v.strip_prefix("0x").or_else(|| v.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => v.parse(),
    };
    parsed.map_err(|e| Error::Invalid {
        what: "EFI systab address",
        reason: format!("{v:?}: {e}"),
    })
}

/// Ordered RSDP discovery strategies.
pub struct RsdpLocator<'a> {
    strategies: Vec<(&'static str, Strategy<'a, Rsdp>)>,
}

impl Default for RsdpLocator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RsdpLocator<'a> {
    /// A locator with no strategies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The default chain (`ebda`, `legacy`, `efi`) over `/dev/mem`-style access.
    #[must_use]
    pub fn with_paths(paths: &SourcePaths) -> RsdpLocator<'static> {
        RsdpLocator::with_mem(DevMem::new(&paths.dev_mem), paths.efi_systab.clone())
    }

    /// The default chain over an arbitrary physical memory source.
    #[must_use]
    pub fn with_mem<M>(mem: M, efi_systab: impl Into<PathBuf>) -> Self
    where
        M: PhysMem + Clone + 'a,
    {
        let systab = efi_systab.into();
        let (ebda, legacy, efi) = (mem.clone(), mem.clone(), mem);
        let mut locator = Self::new();
        locator
            .register("ebda", move || rsdp_from_ebda(&ebda))
            .register("legacy", move || rsdp_from_legacy_range(&legacy))
            .register("efi", move || rsdp_from_efi_systab(&efi, &systab));
        locator
    }

    /// Append a strategy; it runs after every strategy registered before it.
    pub fn register(
        &mut self,
        name: &'static str,
        strategy: impl Fn() -> Result<Rsdp> + 'a,
    ) -> &mut Self {
        self.strategies.push((name, Box::new(strategy)));
        self
    }

    /// Strategy names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.strategies.iter().map(|(n, _)| *n)
    }

    /// Find the RSDP.
    ///
    /// # Errors
    /// [`Error::RsdpNotFound`] once every strategy failed.
    pub fn locate(&self) -> Result<Rsdp> {
        self.locate_named().map(|(_, rsdp)| rsdp)
    }

    /// Find the RSDP and report which strategy found it.
    ///
    /// # Errors
    /// [`Error::RsdpNotFound`] once every strategy failed.
    pub fn locate_named(&self) -> Result<(&'static str, Rsdp)> {
        let (name, rsdp) = first_ok(self.strategies.iter().map(|(n, s)| (*n, s)))
            .map_err(|attempts| Error::RsdpNotFound { attempts })?;
        info!("RSDP at {:#x} via {name}", rsdp.base_address());
        Ok((name, rsdp))
    }
}
