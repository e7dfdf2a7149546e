//! Pluggable environment abstraction for storage I/O
//!
//! Mirrors the factory-plus-handles shape storage engines expect: an `Env`
//! creates files, and each file variant exposes only the capability set the
//! engine needs from it. The tracing layer decorates these traits without
//! changing their contracts, so anything written against `dyn Env` accepts
//! a traced environment transparently.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{EnvError, Result};

/// Append-only sequential reader. Single-owner; reads advance a cursor.
pub trait SequentialFile: Send {
    /// Read up to `buf.len()` bytes at the cursor, returning the byte count.
    /// A return of 0 with a non-empty `buf` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Advance the cursor `n` bytes without reading.
    fn skip(&mut self, n: u64) -> Result<()>;
}

/// Random-offset reader. Offset-based and stateless, so `read_at` takes
/// `&self` and is safe to call from many threads on one handle.
pub trait RandomAccessFile: Send + Sync {
    /// Read up to `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;
}

/// Append/sync writer.
pub trait WritableFile: Send {
    /// Append `data` at the end of the file.
    fn append(&mut self, data: &[u8]) -> Result<()>;

    /// Close the file; later operations on the handle fail.
    fn close(&mut self) -> Result<()>;

    /// Push buffered data to the OS.
    fn flush(&mut self) -> Result<()>;

    /// Force data to stable storage.
    fn sync(&mut self) -> Result<()>;
}

/// File-creation factory. One open operation per handle variant; writable
/// truncates, appendable preserves existing content.
pub trait Env: Send + Sync {
    /// Open `path` for sequential reading.
    fn new_sequential_file(&self, path: &Path) -> Result<Box<dyn SequentialFile>>;

    /// Open `path` for random-offset reading.
    fn new_random_access_file(&self, path: &Path) -> Result<Box<dyn RandomAccessFile>>;

    /// Create or truncate `path` for writing.
    fn new_writable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>>;

    /// Create or open `path` for appending.
    fn new_appendable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>>;
}

/// Local-filesystem environment backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsEnv;

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

struct FsSequentialFile {
    path: String,
    file: File,
}

impl SequentialFile for FsSequentialFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file
            .read(buf)
            .map_err(|e| EnvError::io(self.path.clone(), e))
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        let n = i64::try_from(n).map_err(|_| {
            EnvError::io(
                self.path.clone(),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("skip of {n} bytes overflows a seek offset"),
                ),
            )
        })?;
        self.file
            .seek(SeekFrom::Current(n))
            .map(|_| ())
            .map_err(|e| EnvError::io(self.path.clone(), e))
    }
}

struct FsRandomAccessFile {
    path: String,
    file: File,
}

impl RandomAccessFile for FsRandomAccessFile {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        use std::os::unix::fs::FileExt;
        self.file
            .read_at(buf, offset)
            .map_err(|e| EnvError::io(self.path.clone(), e))
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        use std::os::windows::fs::FileExt;
        self.file
            .seek_read(buf, offset)
            .map_err(|e| EnvError::io(self.path.clone(), e))
    }
}

struct FsWritableFile {
    path: String,
    file: Option<File>,
}

impl FsWritableFile {
    fn open(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or_else(|| EnvError::Closed {
            path: self.path.clone(),
        })
    }
}

impl WritableFile for FsWritableFile {
    fn append(&mut self, data: &[u8]) -> Result<()> {
        let path = self.path.clone();
        self.open()?
            .write_all(data)
            .map_err(|e| EnvError::io(path, e))
    }

    fn close(&mut self) -> Result<()> {
        let path = self.path.clone();
        let file = self.open()?;
        let result = file.flush().map_err(|e| EnvError::io(path, e));
        // Dropping the handle closes the descriptor whether or not the
        // final flush succeeded.
        self.file = None;
        result
    }

    fn flush(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.open()?.flush().map_err(|e| EnvError::io(path, e))
    }

    fn sync(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.open()?.sync_all().map_err(|e| EnvError::io(path, e))
    }
}

impl Env for FsEnv {
    fn new_sequential_file(&self, path: &Path) -> Result<Box<dyn SequentialFile>> {
        let file = File::open(path).map_err(|e| EnvError::io(path_str(path), e))?;
        Ok(Box::new(FsSequentialFile {
            path: path_str(path),
            file,
        }))
    }

    fn new_random_access_file(&self, path: &Path) -> Result<Box<dyn RandomAccessFile>> {
        let file = File::open(path).map_err(|e| EnvError::io(path_str(path), e))?;
        Ok(Box::new(FsRandomAccessFile {
            path: path_str(path),
            file,
        }))
    }

    fn new_writable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>> {
        let file = File::create(path).map_err(|e| EnvError::io(path_str(path), e))?;
        Ok(Box::new(FsWritableFile {
            path: path_str(path),
            file: Some(file),
        }))
    }

    fn new_appendable_file(&self, path: &Path) -> Result<Box<dyn WritableFile>> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| EnvError::io(path_str(path), e))?;
        Ok(Box::new(FsWritableFile {
            path: path_str(path),
            file: Some(file),
        }))
    }
}
