use crate::device::Device;
use crate::error::Result;
use crate::ext2::superblock::{Superblock, SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE};
use std::path::Path;

/// An opened ext2 filesystem
///
/// Owns the underlying device for the duration of the operation; dropping
/// the handle releases it, so every exit path closes the device exactly
/// once.
#[derive(Debug)]
pub struct FilesystemHandle {
    device: Device,
    superblock: Superblock,
}

impl FilesystemHandle {
    /// Open the filesystem on a device or image file
    ///
    /// Reads and validates the primary superblock. `trace` enables I/O
    /// tracing on the underlying device.
    pub fn open<P: AsRef<Path>>(path: P, writable: bool, trace: bool) -> Result<Self> {
        let device = if writable {
            Device::open(path, trace)
        } else {
            Device::open_readonly(path)
        }?;
        let raw = device.read_bytes_at(SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE)?;
        let superblock = Superblock::from_bytes(&raw)?;
        Ok(Self { device, superblock })
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Current filesystem size in blocks
    pub fn blocks_count(&self) -> u64 {
        self.superblock.blocks_count()
    }

    /// Filesystem block size in bytes
    pub fn block_size(&self) -> u32 {
        self.superblock.block_size()
    }

    /// Device capacity in filesystem blocks
    pub fn device_blocks(&self) -> Result<u64> {
        self.device.size_blocks(self.block_size())
    }
}
