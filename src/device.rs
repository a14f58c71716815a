use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Wrapper around a block device or image file for byte-addressed I/O
///
/// Superblock access happens before the filesystem block size is known, so
/// the interface is byte-offset based rather than block based.
pub struct Device {
    file: File,
    path: PathBuf,
    trace: bool,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("path", &self.path)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Internal helper to open a device with specified mode
    fn open_impl<P: AsRef<Path>>(path: P, writable: bool, trace: bool) -> Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let path_display = path_buf.display().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(writable)
            .open(&path_buf)
            .map_err(|_| Error::DeviceNotFound(path_display))?;

        Ok(Self {
            file,
            path: path_buf,
            trace,
        })
    }

    /// Open a device or image file for read/write access
    pub fn open<P: AsRef<Path>>(path: P, trace: bool) -> Result<Self> {
        Self::open_impl(path, true, trace)
    }

    /// Open a device in read-only mode (for info reporting)
    pub fn open_readonly<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_impl(path, false, false)
    }

    /// Get the device path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get total device size in bytes
    ///
    /// For regular files this is the file length; for block devices the
    /// length is found by seeking to the end.
    pub fn size_bytes(&self) -> Result<u64> {
        let metadata = self.file.metadata()?;
        if metadata.is_file() {
            Ok(metadata.len())
        } else {
            let mut f = self.file.try_clone()?;
            Ok(f.seek(SeekFrom::End(0))?)
        }
    }

    /// Device size in filesystem blocks, rounded down
    pub fn size_blocks(&self, block_size: u32) -> Result<u64> {
        let bytes = self.size_bytes()?;
        Ok(bytes / block_size as u64)
    }

    /// Read raw bytes from a byte offset
    pub fn read_bytes_at(&self, offset: u64, size: usize) -> Result<Vec<u8>> {
        if self.trace {
            eprintln!("io: read {} bytes at offset {}", size, offset);
        }
        let mut buffer = vec![0u8; size];
        self.file.read_exact_at(&mut buffer, offset)?;
        Ok(buffer)
    }

    /// Write raw bytes at a byte offset
    pub fn write_bytes_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        if self.trace {
            eprintln!("io: write {} bytes at offset {}", data.len(), offset);
        }
        self.file.write_all_at(data, offset)?;
        Ok(())
    }

    /// Flush all writes to disk
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_device_open_file() {
        let file = NamedTempFile::new().unwrap();
        // Write 1MB of zeros
        let zeros = vec![0u8; 1024 * 1024];
        std::fs::write(file.path(), &zeros).unwrap();

        let device = Device::open(file.path(), false).unwrap();
        assert_eq!(device.size_bytes().unwrap(), 1024 * 1024);
        assert_eq!(device.size_blocks(1024).unwrap(), 1024);
        assert_eq!(device.size_blocks(4096).unwrap(), 256);
    }

    #[test]
    fn test_device_open_missing() {
        let result = Device::open("/nonexistent/no-such-device", false);
        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
    }

    #[test]
    fn test_device_read_write() {
        let file = NamedTempFile::new().unwrap();
        let zeros = vec![0u8; 64 * 1024];
        std::fs::write(file.path(), &zeros).unwrap();

        let device = Device::open(file.path(), false).unwrap();

        // Write test pattern at offset 4096
        let test_data = vec![0xAB; 512];
        device.write_bytes_at(4096, &test_data).unwrap();

        // Read it back
        let read_data = device.read_bytes_at(4096, 512).unwrap();
        assert_eq!(read_data, test_data);

        // Bytes before the pattern are still zeros
        let head = device.read_bytes_at(0, 4096).unwrap();
        assert_eq!(head, vec![0u8; 4096]);
    }

    #[test]
    fn test_readonly_rejects_write() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 4096]).unwrap();

        let device = Device::open_readonly(file.path()).unwrap();
        assert!(device.write_bytes_at(0, &[1, 2, 3]).is_err());
    }
}
