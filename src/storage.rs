//! Storage collaborator supplying raw asset bytes.
//!
//! The driver core never touches a filesystem directly; every file-based
//! load goes through the [`Storage`] seam so the same code runs against CD
//! images, host directories, or in-memory fixtures. Failures surface as
//! non-fatal load errors, never panics.

use crate::{DriverError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

/// Source of named asset files.
pub trait Storage {
    /// Open `name` for sequential reading. Opening a missing or unreadable
    /// file is a [`DriverError::Storage`] value.
    fn open(&mut self, name: &str) -> Result<Box<dyn SampleFile + '_>>;
}

/// One opened asset file; dropped to close.
pub trait SampleFile: std::fmt::Debug {
    /// Total file size in bytes.
    fn size(&self) -> u64;

    /// Read up to `dest.len()` bytes from the current position, returning
    /// how many were read. Zero at end of file.
    fn read(&mut self, dest: &mut [u8]) -> Result<usize>;
}

/// Read exactly `len` bytes from `file`, failing on a short read.
pub(crate) fn read_exact(file: &mut dyn SampleFile, len: usize) -> Result<Vec<u8>> {
    let mut data = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = file.read(&mut data[filled..])?;
        if n == 0 {
            return Err(DriverError::Storage(format!(
                "short read: wanted {len} bytes, got {filled}"
            )));
        }
        filled += n;
    }
    Ok(data)
}

/// Read the remainder of `file` into a buffer.
pub(crate) fn read_to_end(file: &mut dyn SampleFile) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(file.size() as usize);
    let mut chunk = [0u8; 8192];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            return Ok(data);
        }
        data.extend_from_slice(&chunk[..n]);
    }
}

/// Storage backed by a host directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create a storage rooted at `root`; file names resolve relative to it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsStorage { root: root.into() }
    }
}

impl Storage for FsStorage {
    fn open(&mut self, name: &str) -> Result<Box<dyn SampleFile + '_>> {
        let path = self.root.join(name);
        let file = File::open(&path)
            .map_err(|e| DriverError::Storage(format!("cannot open '{}': {e}", path.display())))?;
        let size = file
            .metadata()
            .map_err(|e| DriverError::Storage(format!("cannot stat '{}': {e}", path.display())))?
            .len();
        Ok(Box::new(FsFile { file, size }))
    }
}

#[derive(Debug)]
struct FsFile {
    file: File,
    size: u64,
}

impl SampleFile for FsFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(dest)?)
    }
}

/// In-memory storage for tests and embedded asset tables.
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    files: HashMap<String, Vec<u8>>,
}

impl MemStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under `name`, replacing any previous contents.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), data.into());
    }
}

impl Storage for MemStorage {
    fn open(&mut self, name: &str) -> Result<Box<dyn SampleFile + '_>> {
        let data = self
            .files
            .get(name)
            .ok_or_else(|| DriverError::Storage(format!("no such file '{name}'")))?;
        Ok(Box::new(MemFile {
            data: data.clone(),
            pos: 0,
        }))
    }
}

#[derive(Debug)]
struct MemFile {
    data: Vec<u8>,
    pos: usize,
}

impl SampleFile for MemFile {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&mut self, dest: &mut [u8]) -> Result<usize> {
        let n = dest.len().min(self.data.len() - self.pos);
        dest[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
