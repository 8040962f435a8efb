//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use firmware_acpi::marshal::finalize_table;
use firmware_acpi::{Header, MemImage, Rsdp};

/// A finalized table with a full header and `body`.
pub fn table(sig: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Header::new(*sig).with_revision(2).to_bytes();
    out.extend_from_slice(body);
    finalize_table(out).unwrap()
}

/// An `XSDT` listing `pointers`.
pub fn xsdt(pointers: &[u64]) -> Vec<u8> {
    let body: Vec<u8> = pointers.iter().flat_map(|p| p.to_le_bytes()).collect();
    table(b"XSDT", &body)
}

/// An `RSDT` listing `pointers`.
pub fn rsdt(pointers: &[u32]) -> Vec<u8> {
    let body: Vec<u8> = pointers.iter().flat_map(|p| p.to_le_bytes()).collect();
    table(b"RSDT", &body)
}

/// A 244-byte FADT whose `X_DSDT` points at `dsdt`.
pub fn fadt(dsdt: u64) -> Vec<u8> {
    let mut body = vec![0; 244 - 36];
    body[140 - 36..148 - 36].copy_from_slice(&dsdt.to_le_bytes());
    table(b"FACP", &body)
}

/// An ACPI 1.0 RSDP pointing at an RSDT.
pub fn rsdp_v1(rsdt: u32) -> Vec<u8> {
    let mut b = vec![0; 36];
    b[..8].copy_from_slice(b"RSD PTR ");
    b[9..15].copy_from_slice(b"OEMOEM");
    b[16..20].copy_from_slice(&rsdt.to_le_bytes());
    b[8] = firmware_acpi::marshal::checksum(&b[..20]);
    b
}

/// An ACPI 2.0 RSDP pointing at an XSDT.
pub fn rsdp_v2(xsdt: u64) -> Vec<u8> {
    use firmware_acpi::AcpiTable;
    Rsdp::new(xsdt).data().to_vec()
}

/// A 1 MiB image with an empty BIOS data area.
pub fn low_memory() -> MemImage {
    MemImage::zeroed(0, 0x10_0000)
}
