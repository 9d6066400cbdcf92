// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use crate::error::SenderError;

// ============================================================================
// FileSource Trait
// ============================================================================

/// The file being sent
pub trait FileSource: Send {
    fn size(&self) -> std::io::Result<u64>;

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    fn close(&mut self) -> std::io::Result<()>;
}

// ============================================================================
// Local File Implementation
// ============================================================================

pub struct LocalFile {
    file: Option<File>,
}

impl LocalFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SenderError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SenderError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(LocalFile { file: Some(file) })
    }

    fn handle(&self) -> std::io::Result<&File> {
        self.file.as_ref().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "file already closed")
        })
    }
}

impl FileSource for LocalFile {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.handle()?.metadata()?.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut file = self.handle()?;
        file.read(buf)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.file.take().map(drop).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "file already closed")
        })
    }
}

// ============================================================================
// In-Memory File for Testing
// ============================================================================

#[cfg(test)]
pub struct MemoryFile {
    data: Vec<u8>,
    pos: usize,
    // Claimed size, when it should disagree with the data
    size: Option<u64>,
    // Largest read served at once
    max_read: usize,
    close_fails: bool,
    closed: bool,
}

#[cfg(test)]
impl MemoryFile {
    pub fn new(data: Vec<u8>) -> Self {
        MemoryFile {
            data,
            pos: 0,
            size: None,
            max_read: usize::MAX,
            close_fails: false,
            closed: false,
        }
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read;
        self
    }

    pub fn with_close_error(mut self) -> Self {
        self.close_fails = true;
        self
    }
}

#[cfg(test)]
impl FileSource for MemoryFile {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size.unwrap_or(self.data.len() as u64))
    }

    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "read after close"));
        }
        let n = buf.len().min(self.max_read).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.closed = true;
        if self.close_fails {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "Mock close failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_local_file_size_and_read() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"local file contents").unwrap();
        tmp.flush().unwrap();

        let mut file = LocalFile::open(tmp.path()).unwrap();
        assert_eq!(file.size().unwrap(), 19);

        let mut buf = [0u8; 32];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"local file contents");
        assert_eq!(file.read(&mut buf).unwrap(), 0);

        file.close().unwrap();
        assert!(file.read(&mut buf).is_err());
        assert!(file.close().is_err());
    }

    #[test]
    fn test_local_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("u-boot.bin");
        match LocalFile::open(&missing) {
            Err(SenderError::FileOpen { path, source }) => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("opened a missing file"),
        }
    }

    #[test]
    fn test_memory_file_short_reads() {
        let mut file = MemoryFile::new(b"abcdef".to_vec()).with_max_read(4);
        let mut buf = [0u8; 6];
        assert_eq!(file.read(&mut buf).unwrap(), 4);
        assert_eq!(file.read(&mut buf).unwrap(), 2);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }
}
