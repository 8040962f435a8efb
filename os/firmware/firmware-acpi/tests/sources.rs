mod common;

use std::cell::Cell;
use std::fs;

use common::{low_memory, rsdp_v2, table, xsdt};
use firmware_acpi::error::Error;
use firmware_acpi::sources::tables_from_sysfs;
use firmware_acpi::table::{filter_tables, find_table, read_tables, write_tables};
use firmware_acpi::{AcpiTable, BiosTable, Raw, RsdpLocator, Table, TableSources};

#[test]
fn sysfs_reads_files_in_name_order_and_skips_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("SSDT1"), table(b"SSDT", &[1])).unwrap();
    fs::write(dir.path().join("APIC"), table(b"APIC", &[0; 8])).unwrap();
    fs::write(dir.path().join("FACP"), table(b"FACP", &[0; 80])).unwrap();
    fs::create_dir(dir.path().join("dynamic")).unwrap();

    let tables = tables_from_sysfs(dir.path()).unwrap();
    let names: Vec<_> = tables.iter().map(Table::name).collect();
    assert_eq!(names, ["APIC", "FACP", "SSDT"]);
    assert!(tables.iter().all(AcpiTable::checksum_ok));
}

#[test]
fn sysfs_error_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("BAD"), [0u8; 4]).unwrap();

    let err = tables_from_sysfs(dir.path()).unwrap_err();
    let Error::InFile { path, .. } = &err else {
        panic!("expected a file annotation, got {err}");
    };
    assert!(path.ends_with("BAD"));
    assert!(matches!(err.root(), Error::TooShort { .. }));
}

#[test]
fn first_non_empty_source_wins() {
    let calls = Cell::new(0);
    let mut sources = TableSources::new();
    sources
        .register("broken", || Err(Error::Empty))
        .register("empty", || Ok(Vec::new()))
        .register("good", || {
            calls.set(calls.get() + 1);
            Ok(vec![Table::Raw(Raw::new(&table(b"SSDT", &[])).unwrap())])
        })
        .register("never", || panic!("ran past the first success"));

    let (name, tables) = sources.get_tables().unwrap();
    assert_eq!(name, "good");
    assert_eq!(tables.len(), 1);
    assert_eq!(calls.get(), 1);
}

#[test]
fn all_sources_failing_is_aggregated() {
    let mut sources = TableSources::new();
    sources
        .register("sysfs", || Err(Error::Empty))
        .register("mem", || Ok(Vec::new()));

    let err = sources.get_tables().unwrap_err();
    let Error::NoTablesAvailable { attempts } = &err else {
        panic!("expected NoTablesAvailable, got {err}");
    };
    assert_eq!(attempts.len(), 2);
    assert!(err.to_string().contains("sysfs"));
    assert!(err.to_string().contains("mem"));
}

#[test]
fn memory_source_through_a_custom_locator() {
    let mut mem = low_memory();
    mem.write(0xe_0000, &rsdp_v2(0x1000))
        .write(0x1000, &xsdt(&[0x2000]))
        .write(0x2000, &table(b"APIC", &[0; 8]));

    let mut sources = TableSources::new();
    sources.register("image", || {
        let locator = RsdpLocator::with_mem(&mem, "/nonexistent");
        Ok(BiosTable::read(&mem, &locator)?.into_tables())
    });

    let (_, tables) = sources.get_tables().unwrap();
    let names: Vec<_> = tables.iter().map(Table::name).collect();
    assert_eq!(names, ["RSDP", "XSDT", "APIC"]);
    assert!(find_table(&tables, b"APIC").is_some());
    assert!(find_table(&tables, b"RSDP").is_some());
}

#[test]
fn stream_round_trip() {
    let mut stream = Vec::new();
    let parts: [(&[u8; 4], &[u8]); 3] = [(b"FACP", &[7; 16]), (b"APIC", &[0; 8]), (b"SSDT", &[])];
    for (sig, body) in parts {
        stream.extend_from_slice(&table(sig, body));
    }

    let tables = read_tables(&mut stream.as_slice()).unwrap();
    assert_eq!(tables.len(), 3);

    let mut out = Vec::new();
    write_tables(&mut out, &tables).unwrap();
    assert_eq!(out, stream);

    let kept = filter_tables(tables, &[b"SSDT", b"FACP"]);
    assert_eq!(kept.iter().map(Table::name).collect::<Vec<_>>(), ["FACP", "SSDT"]);
}

#[test]
fn stream_error_carries_offset() {
    let mut stream = table(b"SSDT", &[]);
    stream.extend_from_slice(&table(b"HPET", &[0; 20])[..30]);

    let err = read_tables(&mut stream.as_slice()).unwrap_err();
    assert!(matches!(err, Error::AtOffset { offset: 36, .. }));
    assert!(matches!(err.root(), Error::Truncated { declared: 56, available: 30 }));
}

#[test]
fn marshal_restamps_checksum() {
    let mut bytes = table(b"SSDT", &[1, 2, 3]);
    bytes[9] ^= 0x55;
    let raw = Raw::new(&bytes).unwrap();
    assert!(!raw.checksum_ok());

    let fixed = Raw::new(&raw.marshal().unwrap()).unwrap();
    assert!(fixed.checksum_ok());
    assert_eq!(fixed.table_data(), &[1, 2, 3]);
}
