//! `acpitool`: host front-end for `firmware-acpi`.
//!
//! Every sub-command that writes tables emits them raw and back-to-back, so
//! the output of one invocation can be piped into the next:
//!
//! ```text
//! acpitool dump | acpitool grep APIC | acpitool coreboot
//! ```

mod logger;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use firmware_acpi::coreboot::CorebootRegistry;
use firmware_acpi::table::{filter_tables, read_tables, write_tables};
use firmware_acpi::{AcpiTable, RsdpLocator, SourcePaths, Table, TableSources};
use log::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "acpitool",
    version,
    about = "Read ACPI tables and generate coreboot source from them"
)]
struct Cli {
    /// More log output on stderr; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Physical memory device.
    #[arg(long, global = true)]
    dev_mem: Option<PathBuf>,

    /// Directory with one file per ACPI table.
    #[arg(long, global = true)]
    sysfs: Option<PathBuf>,

    /// EFI system table export.
    #[arg(long, global = true)]
    systab: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Acquire every table and write them raw to stdout.
    Dump {
        /// Print one summary line per table instead of the raw bytes.
        #[arg(short, long)]
        list: bool,
    },
    /// Keep tables with the given signatures from a captured stream on stdin.
    Grep {
        /// Table signatures, e.g. `APIC` or `FACP`.
        #[arg(required = true)]
        signatures: Vec<String>,
    },
    /// Locate the RSDP and print it along with the strategy that found it.
    Rsdp,
    /// Emit coreboot C for every table that has a generator.
    Coreboot {
        /// Captured table stream; stdin if omitted.
        file: Option<PathBuf>,
    },
}

impl Cli {
    fn paths(&self) -> SourcePaths {
        let mut paths = SourcePaths::default();
        if let Some(p) = &self.dev_mem {
            paths.set_dev_mem(p);
        }
        if let Some(p) = &self.sysfs {
            paths.set_sysfs_tables(p);
        }
        if let Some(p) = &self.systab {
            paths.set_efi_systab(p);
        }
        paths
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose).context("installing logger")?;

    let paths = cli.paths();
    debug!("using {paths:?}");

    match &cli.cmd {
        Cmd::Dump { list } => dump(&paths, *list),
        Cmd::Grep { signatures } => grep(signatures),
        Cmd::Rsdp => rsdp(&paths),
        Cmd::Coreboot { file } => coreboot(file.as_ref()),
    }
}

fn dump(paths: &SourcePaths, list: bool) -> Result<()> {
    let (method, tables) = TableSources::with_paths(paths)
        .get_tables()
        .context("acquiring ACPI tables")?;
    info!("{} tables via {method}", tables.len());

    let mut out = io::stdout().lock();
    if list {
        for t in &tables {
            writeln!(out, "{t}")?;
        }
    } else {
        write_tables(&mut out, &tables).context("writing tables")?;
    }
    out.flush()?;
    Ok(())
}

fn grep(signatures: &[String]) -> Result<()> {
    for s in signatures {
        if s.len() != 4 {
            bail!("signature {s:?} is not four bytes long");
        }
    }

    let tables = read_tables(&mut io::stdin().lock()).context("reading tables from stdin")?;
    let found = filter_tables(tables, signatures);
    info!("{} matching tables", found.len());

    let mut out = io::stdout().lock();
    write_tables(&mut out, &found).context("writing tables")?;
    out.flush()?;
    Ok(())
}

fn rsdp(paths: &SourcePaths) -> Result<()> {
    let (method, rsdp) = RsdpLocator::with_paths(paths)
        .locate_named()
        .context("locating the RSDP")?;

    let mut out = io::stdout().lock();
    writeln!(out, "{}", Table::Rsdp(rsdp.clone()))?;
    writeln!(out, "found via {method}")?;
    writeln!(out, "rsdt {:#x}", rsdp.rsdt_address())?;
    writeln!(out, "xsdt {:#x}", rsdp.xsdt_address())?;
    if !rsdp.extended_checksum_ok() {
        writeln!(out, "extended checksum mismatch")?;
    }
    Ok(())
}

fn coreboot(file: Option<&PathBuf>) -> Result<()> {
    let mut input: Box<dyn Read> = match file {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let tables = read_tables(&mut input).context("reading tables")?;

    let registry = CorebootRegistry::default();
    let mut out = io::stdout().lock();
    let mut generated = 0usize;
    for table in &tables {
        if registry.constructor(table.signature()).is_err() {
            debug!("no generator for {}", table.name());
            continue;
        }
        registry
            .generate(table, &mut out)
            .with_context(|| format!("generating coreboot source for {}", table.name()))?;
        generated += 1;
    }
    out.flush()?;

    if generated == 0 {
        bail!("none of the {} input tables has a coreboot generator", tables.len());
    }
    Ok(())
}
