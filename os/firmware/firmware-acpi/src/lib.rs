//! # ACPI Table Discovery and Decoding
//!
//! This crate discovers, validates and decodes ACPI firmware tables on a
//! running machine (or from a captured byte stream), and re-encodes the
//! Multiple APIC Description Table (MADT) as C source for a coreboot build.
//!
//! ## Architecture
//!
//! ```text
//! TableSources ("sysfs", "mem", ...)
//!     ↓ first source yielding tables wins
//! RsdpLocator ("ebda", "legacy", "efi")  ──or──  /sys/firmware/acpi/tables
//!     ↓
//! walk_sdt: RSDP → XSDT/RSDT → every table (+ FADT → DSDT)
//!     ↓
//! Vec<Table>  →  signature dispatch  →  Madt::decode  →  CorebootRegistry
//! ```
//!
//! ## Key Components
//!
//! ### Checksum and marshaling ([`marshal`])
//! * **Checksum**: 8-bit sum-to-zero over the whole table
//! * **Finalize**: stamps the length and checksum of a serialized table
//!
//! ### Tables ([`table`], [`sdt`], [`rsdp`], [`madt`])
//! A closed set of variants collected in [`Table`]; all of them expose the
//! same header accessors through the [`AcpiTable`] trait.
//!
//! ### Discovery ([`locate`], [`bios`], [`sources`])
//! Ordered fallback chains evaluated by [`fallback::first_ok`]. Each
//! strategy is tried once, in registration order; only exhaustion of the
//! whole chain is an error.
//!
//! ### Physical memory ([`phys`])
//! All physical reads go through the [`PhysMem`] trait. Parsing above it only
//! ever sees owned, bounds-checked byte buffers.
//!
//! ### Code generation ([`coreboot`])
//! Signature-keyed constructors producing [`coreboot::Corebooter`] values.
//!
//! ## Checksums
//!
//! Checksums are a write-time guarantee: every marshal restamps them. Tables
//! with a bad checksum are still decoded; use [`AcpiTable::checksum_ok`] to
//! check explicitly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use firmware_acpi::{AcpiTable, SourcePaths, TableSources};
//! use firmware_acpi::coreboot::CorebootRegistry;
//!
//! let sources = TableSources::with_paths(&SourcePaths::default());
//! let (method, tables) = sources.get_tables()?;
//! println!("tables via {method}");
//!
//! let registry = CorebootRegistry::default();
//! for table in tables.iter().filter(|t| t.signature() == b"APIC") {
//!     registry.generate(table, &mut std::io::stdout())?;
//! }
//! # Ok::<(), firmware_acpi::Error>(())
//! ```

extern crate self as firmware_acpi;

pub mod bios;
pub mod config;
pub mod coreboot;
pub mod error;
pub mod fallback;
pub mod header;
pub mod le;
pub mod locate;
pub mod madt;
pub mod marshal;
pub mod phys;
pub mod rsdp;
pub mod sdt;
pub mod sources;
pub mod table;

pub use bios::{BiosTable, read_table, walk_sdt};
pub use config::SourcePaths;
pub use error::{Error, Result};
pub use header::Header;
pub use locate::RsdpLocator;
pub use madt::Madt;
pub use phys::{DevMem, MemImage, PhysMem};
pub use rsdp::Rsdp;
pub use sdt::Sdt;
pub use sources::TableSources;
pub use table::{AcpiTable, Generic, Raw, Table};
