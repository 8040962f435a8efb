//! # coreboot code generation
//!
//! A [`Corebooter`] turns a decoded table back into the C that coreboot's
//! ACPI layer uses to rebuild it at boot. Generators are looked up by table
//! signature in a [`CorebootRegistry`]; only the MADT has one by default.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;

use log::debug;

use crate::error::{Error, Result};
use crate::madt::{MADT_SIGNATURE, Madt, MadtEntry};
use crate::table::{AcpiTable, Table};

/// Emits C source reproducing a table.
pub trait Corebooter {
    /// Write the generated source to `w`.
    ///
    /// # Errors
    /// I/O failures from `w`.
    fn generate(&self, w: &mut dyn io::Write) -> Result<()>;
}

/// Builds a generator for one table.
pub type CorebootConstructor = fn(&Table) -> Result<Box<dyn Corebooter>>;

/// Signature-keyed generator constructors.
#[derive(Clone, Debug)]
pub struct CorebootRegistry {
    constructors: BTreeMap<[u8; 4], CorebootConstructor>,
}

impl Default for CorebootRegistry {
    /// A registry with the MADT generator.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(*MADT_SIGNATURE, madt_corebooter);
        registry
    }
}

impl CorebootRegistry {
    /// A registry without any generator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register (or replace) the constructor for `signature`.
    pub fn register(&mut self, signature: [u8; 4], ctor: CorebootConstructor) -> &mut Self {
        self.constructors.insert(signature, ctor);
        self
    }

    /// Signatures with a registered generator, in byte order.
    pub fn signatures(&self) -> impl Iterator<Item = &[u8; 4]> + '_ {
        self.constructors.keys()
    }

    /// The constructor registered for `signature`.
    ///
    /// # Errors
    /// [`Error::NoCorebooter`] if none is registered.
    pub fn constructor(&self, signature: &[u8]) -> Result<CorebootConstructor> {
        <[u8; 4]>::try_from(signature)
            .ok()
            .and_then(|sig| self.constructors.get(&sig).copied())
            .ok_or_else(|| Error::NoCorebooter(String::from_utf8_lossy(signature).into_owned()))
    }

    /// Build the generator for `table`.
    ///
    /// # Errors
    /// [`Error::NoCorebooter`] or a constructor failure.
    pub fn dispatch(&self, table: &Table) -> Result<Box<dyn Corebooter>> {
        self.constructor(table.signature())?(table)
    }

    /// Build the generator for `table` and run it into `w`.
    ///
    /// # Errors
    /// As [`Self::dispatch`], plus I/O failures from `w`.
    pub fn generate(&self, table: &Table, w: &mut dyn io::Write) -> Result<()> {
        self.dispatch(table)?.generate(w)
    }
}

fn madt_corebooter(table: &Table) -> Result<Box<dyn Corebooter>> {
    let madt = match table {
        Table::Madt(m) => m.clone(),
        other => Madt::decode(other)?,
    };
    Ok(Box::new(MadtCorebooter(madt)))
}

/// Generates `acpi_fill_madt()` from a decoded MADT.
#[derive(Clone, Debug)]
pub struct MadtCorebooter(pub Madt);

impl MadtCorebooter {
    /// Render the whole function.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("unsigned long acpi_fill_madt(unsigned long current)\n{\n");
        for entry in self.0.entries() {
            if let Some(call) = madt_call(&entry) {
                // Writing into a String cannot fail.
                let _ = writeln!(out, "\tcurrent += {call};");
            }
        }
        out.push_str("\treturn current;\n}\n");
        out
    }
}

impl Corebooter for MadtCorebooter {
    fn generate(&self, w: &mut dyn io::Write) -> Result<()> {
        w.write_all(self.render().as_bytes())?;
        Ok(())
    }
}

/// The coreboot helper call for one entry; `None` for entries coreboot
/// derives on its own.
fn madt_call(entry: &MadtEntry) -> Option<String> {
    Some(match entry {
        MadtEntry::LocalApic(e) => format!(
            "acpi_create_madt_lapic((acpi_madt_lapic_t *)current, {:#x}, {:#x})",
            e.processor_uid, e.apic_id
        ),
        MadtEntry::IoApic(e) => format!(
            "acpi_create_madt_ioapic((acpi_madt_ioapic_t *)current, {:#x}, {:#010x}, {:#010x})",
            e.id, e.address, e.gsi_base
        ),
        MadtEntry::InterruptSourceOverride(e) => format!(
            "acpi_create_madt_irqoverride((acpi_madt_irqoverride_t *)current, {:#x}, {:#x}, {:#010x}, {:#06x})",
            e.bus,
            e.source,
            e.gsi,
            e.flags.into_bits()
        ),
        MadtEntry::LocalApicNmi(e) => format!(
            "acpi_create_madt_lapic_nmi((acpi_madt_lapic_nmi_t *)current, {:#x}, {:#06x}, {:#x})",
            e.processor_uid,
            e.flags.into_bits(),
            e.lint
        ),
        MadtEntry::LocalX2Apic(e) => format!(
            "acpi_create_madt_lx2apic((acpi_madt_lx2apic_t *)current, {:#010x}, {:#010x})",
            e.processor_uid, e.x2apic_id
        ),
        MadtEntry::LocalX2ApicNmi(e) => format!(
            "acpi_create_madt_lx2apic_nmi((acpi_madt_lx2apic_nmi_t *)current, {:#010x}, {:#06x}, {:#x})",
            e.processor_uid,
            e.flags.into_bits(),
            e.lint
        ),
        MadtEntry::LocalApicAddressOverride(e) => {
            debug!("coreboot: no helper for LAPIC address override {:#x}", e.address);
            return None;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Header;
    use crate::marshal::finalize_table;
    use crate::table::Raw;

    fn madt_table(records: &[&[u8]]) -> Table {
        let mut b = Header::new(*MADT_SIGNATURE).to_bytes();
        b.extend_from_slice(&0xfee0_0000u32.to_le_bytes());
        b.extend_from_slice(&0u32.to_le_bytes());
        for r in records {
            b.extend_from_slice(r);
        }
        Table::decode(Raw::new(&finalize_table(b).unwrap()).unwrap()).unwrap()
    }

    fn generate(table: &Table) -> String {
        let mut out = Vec::new();
        CorebootRegistry::default().generate(table, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn local_apic_line() {
        let c = generate(&madt_table(&[&[0, 8, 1, 2, 3, 0, 0, 0]]));
        assert_eq!(
            c,
            "unsigned long acpi_fill_madt(unsigned long current)\n{\n\
             \tcurrent += acpi_create_madt_lapic((acpi_madt_lapic_t *)current, 0x1, 0x2);\n\
             \treturn current;\n}\n"
        );
    }

    #[test]
    fn ioapic_line() {
        let c = generate(&madt_table(&[&[1, 12, 3, 0, 4, 5, 6, 7, 9, 10, 11, 12]]));
        assert!(c.contains(
            "acpi_create_madt_ioapic((acpi_madt_ioapic_t *)current, 0x3, 0x07060504, 0x0c0b0a09);"
        ));
    }

    #[test]
    fn override_and_nmi_lines() {
        let c = generate(&madt_table(&[
            &[2, 10, 0, 9, 9, 0, 0, 0, 0x0d, 0],
            &[4, 6, 0xff, 5, 0, 1],
            &[5, 12, 0, 0, 0, 0, 0xe0, 0xfe, 0, 0, 0, 0],
        ]));
        assert!(c.contains(
            "acpi_create_madt_irqoverride((acpi_madt_irqoverride_t *)current, 0x0, 0x9, 0x00000009, 0x000d);"
        ));
        assert!(c.contains(
            "acpi_create_madt_lapic_nmi((acpi_madt_lapic_nmi_t *)current, 0xff, 0x0005, 0x1);"
        ));
        assert_eq!(c.matches("current +=").count(), 2);
    }

    #[test]
    fn x2apic_lines() {
        let c = generate(&madt_table(&[
            &[9, 16, 0, 0, 0x10, 0, 0, 0, 1, 0, 0, 0, 0x20, 0, 0, 0],
            &[10, 12, 5, 0, 0xff, 0xff, 0xff, 0xff, 1, 0, 0, 0],
        ]));
        assert!(c.contains(
            "\tcurrent += acpi_create_madt_lx2apic((acpi_madt_lx2apic_t *)current, 0x00000020, 0x00000010);\n"
        ));
        assert!(c.contains(
            "\tcurrent += acpi_create_madt_lx2apic_nmi((acpi_madt_lx2apic_nmi_t *)current, 0xffffffff, 0x0005, 0x1);\n"
        ));
    }

    #[test]
    fn empty_madt_still_returns() {
        let c = generate(&madt_table(&[]));
        assert!(c.ends_with("{\n\treturn current;\n}\n"));
    }

    #[test]
    fn unknown_signature() {
        let raw = Raw::new(&finalize_table(Header::new(*b"HPET").to_bytes()).unwrap()).unwrap();
        let err = CorebootRegistry::default()
            .dispatch(&Table::Raw(raw))
            .err()
            .unwrap();
        assert!(matches!(err, Error::NoCorebooter(ref s) if s == "HPET"));
    }

    #[test]
    fn raw_madt_is_decoded_on_dispatch() {
        let mut b = Header::new(*MADT_SIGNATURE).to_bytes();
        b.extend_from_slice(&[0; 8]);
        b.extend_from_slice(&[0, 8, 7, 7, 1, 0, 0, 0]);
        let raw = Table::Raw(Raw::new(&finalize_table(b).unwrap()).unwrap());
        assert!(generate(&raw).contains("0x7, 0x7);"));
    }
}
