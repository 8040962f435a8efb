//! # Physical memory access
//!
//! The only place that touches physical memory. Everything above this module
//! works on owned byte buffers.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read a physical region and return an owned copy of its contents.
/// You provide the implementation (`/dev/mem`, a memory dump, a test image).
pub trait PhysMem {
    /// Read `len` bytes starting at physical address `addr`.
    ///
    /// # Errors
    /// Any failure of the underlying device, including short reads.
    fn read_phys(&self, addr: u64, len: usize) -> io::Result<Vec<u8>>;
}

impl<T: PhysMem + ?Sized> PhysMem for &T {
    fn read_phys(&self, addr: u64, len: usize) -> io::Result<Vec<u8>> {
        (**self).read_phys(addr, len)
    }
}

/// Physical memory through a `/dev/mem`-style character device.
///
/// The device is opened per read; no file descriptor is held between calls.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DevMem {
    path: PathBuf,
}

impl DevMem {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for DevMem {
    fn default() -> Self {
        Self::new("/dev/mem")
    }
}

impl PhysMem for DevMem {
    fn read_phys(&self, addr: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(addr))?;
        let mut buf = vec![0; len];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A captured (or synthesized) image of a physical address range.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MemImage {
    base: u64,
    bytes: Vec<u8>,
}

impl MemImage {
    /// An image whose first byte lives at physical address `base`.
    #[must_use]
    pub const fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// A zero-filled image of `len` bytes at `base`.
    #[must_use]
    pub fn zeroed(base: u64, len: usize) -> Self {
        Self::new(base, vec![0; len])
    }

    /// Copy `data` into the image at physical address `addr`, growing it if needed.
    ///
    /// # Panics
    /// If `addr` lies below the image base.
    pub fn write(&mut self, addr: u64, data: &[u8]) -> &mut Self {
        let off = addr
            .checked_sub(self.base)
            .and_then(|o| usize::try_from(o).ok())
            .expect("address below image base");
        if self.bytes.len() < off + data.len() {
            self.bytes.resize(off + data.len(), 0);
        }
        self.bytes[off..off + data.len()].copy_from_slice(data);
        self
    }

    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PhysMem for MemImage {
    fn read_phys(&self, addr: u64, len: usize) -> io::Result<Vec<u8>> {
        let out_of_range = || {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{len} bytes at {addr:#x} outside image {:#x}..{:#x}",
                    self.base,
                    self.base + self.bytes.len() as u64
                ),
            )
        };
        let off = addr
            .checked_sub(self.base)
            .and_then(|o| usize::try_from(o).ok())
            .ok_or_else(out_of_range)?;
        let end = off.checked_add(len).ok_or_else(out_of_range)?;
        self.bytes
            .get(off..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(out_of_range)
    }
}
