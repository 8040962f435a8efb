mod common;

use common::{fadt, low_memory, rsdp_v1, rsdp_v2, rsdt, table, xsdt};
use firmware_acpi::error::Error;
use firmware_acpi::{AcpiTable, Rsdp, Table, read_table, walk_sdt};

fn signatures(tables: &[Table]) -> Vec<String> {
    tables.iter().map(Table::name).collect()
}

#[test]
fn walks_xsdt_and_follows_fadt_to_dsdt() {
    let mut mem = low_memory();
    mem.write(0x1000, &xsdt(&[0x2000, 0x3000]))
        .write(0x2000, &fadt(0x4000))
        .write(0x3000, &table(b"APIC", &[0; 8]))
        .write(0x4000, &table(b"DSDT", &[0x10, 0x20]));

    let rsdp = Rsdp::parse(&rsdp_v2(0x1000), 0xe_0000).unwrap();
    let bios = walk_sdt(&mem, rsdp).unwrap();
    assert_eq!(signatures(bios.tables()), ["XSDT", "FACP", "DSDT", "APIC"]);
    assert_eq!(bios.tables()[2].base(), 0x4000);
    assert_eq!(bios.tables()[2].table_data(), &[0x10, 0x20]);

    let all = bios.into_tables();
    assert_eq!(signatures(&all)[0], "RSDP");
    assert_eq!(all.len(), 5);
}

#[test]
fn acpi1_walks_rsdt() {
    let mut mem = low_memory();
    mem.write(0x1000, &rsdt(&[0x2000]))
        .write(0x2000, &table(b"HPET", &[0; 20]));

    let rsdp = Rsdp::parse(&rsdp_v1(0x1000), 0xe_0000).unwrap();
    let bios = walk_sdt(&mem, rsdp).unwrap();
    let Table::Sdt(root) = &bios.tables()[0] else {
        panic!("root is not an SDT");
    };
    assert!(!root.is_xsdt());
    assert_eq!(root.pointers(), [0x2000]);
    assert_eq!(signatures(bios.tables()), ["RSDT", "HPET"]);
}

#[test]
fn unreadable_pointer_aborts_with_address() {
    let mut mem = low_memory();
    mem.write(0x1000, &xsdt(&[0x2000, 0x20_0000]))
        .write(0x2000, &table(b"SSDT", &[]));

    let rsdp = Rsdp::parse(&rsdp_v2(0x1000), 0).unwrap();
    let err = walk_sdt(&mem, rsdp).unwrap_err();
    assert!(matches!(err, Error::At { addr: 0x20_0000, .. }));
    assert!(matches!(err.root(), Error::Io(_)));
}

#[test]
fn read_table_honours_declared_length() {
    let mut mem = low_memory();
    mem.write(0x5000, &table(b"SSDT", &[1, 2, 3]))
        .write(0x5000 + 39, &[0xff; 16]);

    let t = read_table(&mem, 0x5000).unwrap();
    assert_eq!(t.length(), 39);
    assert_eq!(t.data().len(), 39);
    assert!(t.checksum_ok());
}

#[test]
fn read_table_rejects_tiny_length() {
    let mut mem = low_memory();
    mem.write(0x5000, b"JUNK\x04\x00\x00\x00");
    let err = read_table(&mem, 0x5000).unwrap_err();
    assert!(matches!(err.root(), Error::TooShort { need: 10, got: 4 }));
}
