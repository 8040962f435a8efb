mod common;

use std::io::Write;

use common::{low_memory, rsdp_v1, rsdp_v2};
use firmware_acpi::error::Error;
use firmware_acpi::locate::{rsdp_from_ebda, rsdp_from_legacy_range};
use firmware_acpi::{AcpiTable, MemImage, RsdpLocator};

const EBDA_BASE: u64 = 0x9_fc00;

fn with_ebda(mem: &mut MemImage, rsdp: &[u8]) {
    mem.write(0x40e, &0x9fc0u16.to_le_bytes())
        .write(EBDA_BASE, &[1])
        .write(EBDA_BASE + 0x20, rsdp);
}

fn no_systab() -> &'static str {
    "/nonexistent/systab"
}

#[test]
fn ebda_wins_over_legacy() {
    let mut mem = low_memory();
    with_ebda(&mut mem, &rsdp_v2(0x1000));
    mem.write(0xf_5a00, &rsdp_v2(0x2000));

    let (name, rsdp) = RsdpLocator::with_mem(&mem, no_systab())
        .locate_named()
        .unwrap();
    assert_eq!(name, "ebda");
    assert_eq!(rsdp.base_address(), EBDA_BASE + 0x20);
    assert_eq!(rsdp.sdt_address(), 0x1000);
}

#[test]
fn legacy_range_is_the_fallback() {
    let mut mem = low_memory();
    mem.write(0xe_0000, &rsdp_v1(0x3000));

    let (name, rsdp) = RsdpLocator::with_mem(&mem, no_systab())
        .locate_named()
        .unwrap();
    assert_eq!(name, "legacy");
    assert_eq!(rsdp.base_address(), 0xe_0000);
    assert_eq!(rsdp.xsdt_address(), 0);
    assert_eq!(rsdp.sdt_address(), 0x3000);
    assert_eq!(rsdp.oem_id(), b"OEMOEM");
}

#[test]
fn scan_skips_bad_checksum_and_unaligned_tags() {
    let mut mem = low_memory();
    let mut bad = rsdp_v1(0x1000);
    bad[8] = bad[8].wrapping_add(1);
    mem.write(0xe_0000, &bad)
        // Not on a 16-byte boundary.
        .write(0xe_0108, &rsdp_v1(0x2000))
        .write(0xe_0200, &rsdp_v1(0x3000));

    let rsdp = rsdp_from_legacy_range(&mem).unwrap();
    assert_eq!(rsdp.base_address(), 0xe_0200);
    assert_eq!(rsdp.rsdt_address(), 0x3000);
}

#[test]
fn ebda_without_segment_fails() {
    let err = rsdp_from_ebda(&low_memory()).unwrap_err();
    assert!(matches!(err, Error::Invalid { what: "EBDA", .. }));
}

#[test]
fn efi_systab_is_the_last_resort() {
    let mut mem = low_memory();
    mem.write(0x7_0000, &rsdp_v2(0x8000));

    let mut systab = tempfile::NamedTempFile::new().unwrap();
    writeln!(systab, "SMBIOS=0xf0000\nACPI=0xe0000\nACPI20=0x70000").unwrap();

    let (name, rsdp) = RsdpLocator::with_mem(&mem, systab.path())
        .locate_named()
        .unwrap();
    assert_eq!(name, "efi");
    assert_eq!(rsdp.base_address(), 0x7_0000);
    assert_eq!(rsdp.sdt_address(), 0x8000);
    assert!(rsdp.extended_checksum_ok());
}

#[test]
fn exhausted_chain_lists_every_attempt() {
    let mem = low_memory();
    let locator = RsdpLocator::with_mem(&mem, no_systab());
    assert_eq!(locator.names().collect::<Vec<_>>(), ["ebda", "legacy", "efi"]);

    let Error::RsdpNotFound { attempts } = locator.locate().unwrap_err() else {
        panic!("expected RsdpNotFound");
    };
    let names: Vec<_> = attempts
        .iter()
        .map(|e| match e {
            Error::StrategyFailed { name, .. } => name.as_str(),
            other => panic!("unexpected {other}"),
        })
        .collect();
    assert_eq!(names, ["ebda", "legacy", "efi"]);
}

#[test]
fn custom_strategies_run_in_registration_order() {
    let mem = low_memory();
    let mut locator = RsdpLocator::with_mem(&mem, no_systab());
    locator.register("fixed", || {
        firmware_acpi::Rsdp::parse(&rsdp_v2(0xab_c000), 0x1234_0000)
    });

    let (name, rsdp) = locator.locate_named().unwrap();
    assert_eq!(name, "fixed");
    assert_eq!(rsdp.sdt_address(), 0xab_c000);
}
