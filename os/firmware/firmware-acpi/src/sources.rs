//! # Table sources
//!
//! Whole-system acquisition methods, tried in registration order. The first
//! method returning a non-empty table set wins.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::bios::BiosTable;
use crate::config::SourcePaths;
use crate::error::{Error, Result};
use crate::fallback::{Strategy, first_ok};
use crate::locate::RsdpLocator;
use crate::phys::DevMem;
use crate::table::{Raw, Table};

/// Read every table file in a sysfs-style directory, sorted by file name.
///
/// Subdirectories (`data/`, `dynamic/`) are skipped.
///
/// # Errors
/// Directory or file read failures and malformed tables, annotated with the
/// offending path.
pub fn tables_from_sysfs(dir: &Path) -> Result<Vec<Table>> {
    let mut files = Vec::new();
    for ent in fs::read_dir(dir).map_err(|e| Error::from(e).in_file(dir))? {
        let ent = ent.map_err(|e| Error::from(e).in_file(dir))?;
        let path = ent.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut tables = Vec::with_capacity(files.len());
    for path in files {
        let bytes = fs::read(&path).map_err(|e| Error::from(e).in_file(&path))?;
        let raw = Raw::new(&bytes).map_err(|e| e.in_file(&path))?;
        debug!("read {} ({} bytes)", path.display(), bytes.len());
        tables.push(Table::Raw(raw));
    }
    Ok(tables)
}

/// Locate the RSDP and walk the chain in physical memory; the RSDP comes first.
///
/// # Errors
/// Discovery or walk failures.
pub fn tables_from_mem(paths: &SourcePaths) -> Result<Vec<Table>> {
    let mem = DevMem::new(&paths.dev_mem);
    let locator = RsdpLocator::with_paths(paths);
    Ok(BiosTable::read(&mem, &locator)?.into_tables())
}

/// Ordered registry of named table sources.
pub struct TableSources<'a> {
    methods: Vec<(&'static str, Strategy<'a, Vec<Table>>)>,
}

impl Default for TableSources<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TableSources<'a> {
    /// A registry with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// The default registry: `sysfs`, then `mem`.
    #[must_use]
    pub fn with_paths(paths: &SourcePaths) -> TableSources<'static> {
        let sysfs = paths.sysfs_tables.clone();
        let mem = paths.clone();
        let mut sources = TableSources::new();
        sources
            .register("sysfs", move || tables_from_sysfs(&sysfs))
            .register("mem", move || tables_from_mem(&mem));
        sources
    }

    /// Append a method; it runs after every method registered before it.
    pub fn register(
        &mut self,
        name: &'static str,
        method: impl Fn() -> Result<Vec<Table>> + 'a,
    ) -> &mut Self {
        self.methods.push((name, Box::new(method)));
        self
    }

    /// Method names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.iter().map(|(n, _)| *n)
    }

    /// Tables from the first method that succeeds with at least one table.
    ///
    /// # Errors
    /// [`Error::NoTablesAvailable`] once every method failed or came back empty.
    pub fn get_tables(&self) -> Result<(&'static str, Vec<Table>)> {
        let attempts = self.methods.iter().map(|(name, method)| {
            (*name, move || {
                let tables = method()?;
                if tables.is_empty() {
                    return Err(Error::Empty);
                }
                Ok(tables)
            })
        });
        let (name, tables) =
            first_ok(attempts).map_err(|attempts| Error::NoTablesAvailable { attempts })?;
        info!("{} tables via {name}", tables.len());
        Ok((name, tables))
    }
}
