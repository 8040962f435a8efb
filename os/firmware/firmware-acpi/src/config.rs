//! # Source paths
//!
//! Where the collaborators live on a Linux host. Tests and the CLI redirect
//! them to fixtures.

use std::path::PathBuf;

use utils_layout_derive::Setters;

/// File system locations consulted during discovery.
#[derive(Clone, Debug, Eq, PartialEq, Setters)]
pub struct SourcePaths {
    /// Physical memory device.
    #[setters(into)]
    pub dev_mem: PathBuf,

    /// Directory with one file per ACPI table.
    #[setters(into)]
    pub sysfs_tables: PathBuf,

    /// EFI system table text export (`ACPI20=`/`ACPI=` lines).
    #[setters(into)]
    pub efi_systab: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            dev_mem: "/dev/mem".into(),
            sysfs_tables: "/sys/firmware/acpi/tables".into(),
            efi_systab: "/sys/firmware/efi/systab".into(),
        }
    }
}
