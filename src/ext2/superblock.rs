use crate::error::{Error, Result};

// ===== Feature Bitmasks =====

pub const FEATURE_COMPAT_DIR_PREALLOC: u32 = 0x0001;
pub const FEATURE_COMPAT_IMAGIC_INODES: u32 = 0x0002;
pub const FEATURE_COMPAT_HAS_JOURNAL: u32 = 0x0004;
pub const FEATURE_COMPAT_EXT_ATTR: u32 = 0x0008;
pub const FEATURE_COMPAT_RESIZE_INODE: u32 = 0x0010;
pub const FEATURE_COMPAT_DIR_INDEX: u32 = 0x0020;

pub const FEATURE_INCOMPAT_COMPRESSION: u32 = 0x0001;
pub const FEATURE_INCOMPAT_FILETYPE: u32 = 0x0002;
pub const FEATURE_INCOMPAT_RECOVER: u32 = 0x0004;
pub const FEATURE_INCOMPAT_JOURNAL_DEV: u32 = 0x0008;
pub const FEATURE_INCOMPAT_META_BG: u32 = 0x0010;

pub const FEATURE_RO_COMPAT_SPARSE_SUPER: u32 = 0x0001;
pub const FEATURE_RO_COMPAT_LARGE_FILE: u32 = 0x0002;
pub const FEATURE_RO_COMPAT_BTREE_DIR: u32 = 0x0004;

/// Compat features this tool understands
pub const FEATURE_COMPAT_SUPP: u32 = FEATURE_COMPAT_DIR_PREALLOC
    | FEATURE_COMPAT_IMAGIC_INODES
    | FEATURE_COMPAT_HAS_JOURNAL
    | FEATURE_COMPAT_EXT_ATTR
    | FEATURE_COMPAT_RESIZE_INODE
    | FEATURE_COMPAT_DIR_INDEX;

/// Incompat features this tool understands
///
/// Anything outside this set means the on-disk metadata cannot be
/// interpreted safely, so the resize must refuse to proceed.
pub const FEATURE_INCOMPAT_SUPP: u32 = FEATURE_INCOMPAT_FILETYPE;

/// Read-only-compat features this tool understands
pub const FEATURE_RO_COMPAT_SUPP: u32 =
    FEATURE_RO_COMPAT_SPARSE_SUPER | FEATURE_RO_COMPAT_LARGE_FILE;

// ===== Superblock =====

/// Byte offset of the primary superblock from the start of the device
pub const SUPERBLOCK_OFFSET: u64 = 1024;

/// Size of the on-disk superblock structure
pub const SUPERBLOCK_SIZE: usize = 1024;

/// The ext2 magic number (s_magic)
pub const EXT2_MAGIC: u16 = 0xEF53;

/// Largest valid s_log_block_size (64KiB blocks)
pub const MAX_LOG_BLOCK_SIZE: u32 = 6;

/// s_state flag: filesystem was cleanly unmounted
pub const STATE_CLEAN: u16 = 0x0001;

/// ext2 superblock
///
/// The first 1024 bytes starting at device offset 1024. All multi-byte
/// values are stored little-endian. The raw sector is kept whole so a
/// read-modify-write cycle never loses fields we don't model.
#[derive(Clone)]
pub struct Superblock {
    raw: Vec<u8>,
}

impl std::fmt::Debug for Superblock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Superblock")
            .field("blocks_count", &self.blocks_count())
            .field("block_size", &self.block_size())
            .field("volume_name", &self.volume_name())
            .finish_non_exhaustive()
    }
}

impl Superblock {
    /// Parse a superblock from raw bytes, verifying the ext2 magic
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SUPERBLOCK_SIZE {
            return Err(Error::NotExt2(format!(
                "superblock too small: {} bytes",
                bytes.len()
            )));
        }
        let sb = Self {
            raw: bytes[..SUPERBLOCK_SIZE].to_vec(),
        };
        if sb.magic() != EXT2_MAGIC {
            return Err(Error::NotExt2(format!(
                "bad magic {:#06x} (expected {:#06x})",
                sb.magic(),
                EXT2_MAGIC
            )));
        }
        // ext2 block sizes run 1KiB..=64KiB; anything larger would wrap the
        // shift in block_size()
        let log_block_size = sb.read_u32(24);
        if log_block_size > MAX_LOG_BLOCK_SIZE {
            return Err(Error::NotExt2(format!(
                "bad log block size {} (valid range 0..={})",
                log_block_size, MAX_LOG_BLOCK_SIZE
            )));
        }
        Ok(sb)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.raw[offset], self.raw[offset + 1]])
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.raw[offset],
            self.raw[offset + 1],
            self.raw[offset + 2],
            self.raw[offset + 3],
        ])
    }

    /// Total inode count (s_inodes_count)
    pub fn inodes_count(&self) -> u32 {
        self.read_u32(0)
    }

    /// Total block count (s_blocks_count)
    pub fn blocks_count(&self) -> u64 {
        self.read_u32(4) as u64
    }

    /// Free block count (s_free_blocks_count)
    pub fn free_blocks_count(&self) -> u64 {
        self.read_u32(12) as u64
    }

    /// First data block (s_first_data_block): 1 for 1KiB blocks, else 0
    pub fn first_data_block(&self) -> u32 {
        self.read_u32(20)
    }

    /// Block size in bytes, derived from s_log_block_size
    ///
    /// `from_bytes` bounds the shift, so this cannot overflow.
    pub fn block_size(&self) -> u32 {
        1024 << self.read_u32(24)
    }

    /// Last mount time (s_mtime, seconds since epoch)
    pub fn mtime(&self) -> u32 {
        self.read_u32(44)
    }

    /// Last write time (s_wtime)
    pub fn wtime(&self) -> u32 {
        self.read_u32(48)
    }

    /// Filesystem magic (s_magic)
    pub fn magic(&self) -> u16 {
        self.read_u16(56)
    }

    /// Filesystem state flags (s_state)
    pub fn state(&self) -> u16 {
        self.read_u16(58)
    }

    /// Time of last consistency check (s_lastcheck)
    pub fn lastcheck(&self) -> u32 {
        self.read_u32(64)
    }

    /// Revision level (s_rev_level)
    pub fn rev_level(&self) -> u32 {
        self.read_u32(76)
    }

    /// Compatible feature set (s_feature_compat)
    pub fn feature_compat(&self) -> u32 {
        self.read_u32(92)
    }

    /// Incompatible feature set (s_feature_incompat)
    pub fn feature_incompat(&self) -> u32 {
        self.read_u32(96)
    }

    /// Read-only-compatible feature set (s_feature_ro_compat)
    pub fn feature_ro_compat(&self) -> u32 {
        self.read_u32(100)
    }

    /// Volume label (s_volume_name), trimmed at the first NUL
    pub fn volume_name(&self) -> String {
        let raw = &self.raw[120..136];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).to_string()
    }

    /// True if the last check predates the last mount
    ///
    /// The filesystem has been mounted (and possibly modified) since the
    /// last fsck, so its metadata cannot be trusted for a resize.
    pub fn needs_check(&self) -> bool {
        self.lastcheck() < self.mtime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal valid ext2 superblock for testing
    fn build_superblock(blocks_count: u32) -> Vec<u8> {
        let mut data = vec![0u8; SUPERBLOCK_SIZE];

        // Inode count
        data[0..4].copy_from_slice(&1000u32.to_le_bytes());

        // Block count
        data[4..8].copy_from_slice(&blocks_count.to_le_bytes());

        // Free blocks
        data[12..16].copy_from_slice(&(blocks_count / 2).to_le_bytes());

        // First data block (1 for 1KiB blocks)
        data[20..24].copy_from_slice(&1u32.to_le_bytes());

        // Log block size (0 -> 1024 bytes)
        data[24..28].copy_from_slice(&0u32.to_le_bytes());

        // Mount time / last check: fresh (lastcheck >= mtime)
        data[44..48].copy_from_slice(&1_000u32.to_le_bytes());
        data[64..68].copy_from_slice(&2_000u32.to_le_bytes());

        // Magic
        data[56..58].copy_from_slice(&EXT2_MAGIC.to_le_bytes());

        // State: clean
        data[58..60].copy_from_slice(&1u16.to_le_bytes());

        // Features: filetype + sparse_super, all supported
        data[96..100].copy_from_slice(&FEATURE_INCOMPAT_FILETYPE.to_le_bytes());
        data[100..104].copy_from_slice(&FEATURE_RO_COMPAT_SPARSE_SUPER.to_le_bytes());

        // Volume label
        data[120..126].copy_from_slice(b"rescue");

        data
    }

    #[test]
    fn test_parse_valid_superblock() {
        let data = build_superblock(8192);
        let sb = Superblock::from_bytes(&data).unwrap();

        assert_eq!(sb.magic(), EXT2_MAGIC);
        assert_eq!(sb.blocks_count(), 8192);
        assert_eq!(sb.block_size(), 1024);
        assert_eq!(sb.first_data_block(), 1);
        assert_eq!(sb.volume_name(), "rescue");
        assert!(!sb.needs_check());
    }

    #[test]
    fn test_bad_magic() {
        let mut data = build_superblock(8192);
        data[56] = 0x00;
        data[57] = 0x00;
        let result = Superblock::from_bytes(&data);
        assert!(matches!(result, Err(Error::NotExt2(_))));
    }

    #[test]
    fn test_truncated_superblock() {
        let data = build_superblock(8192);
        let result = Superblock::from_bytes(&data[..512]);
        assert!(matches!(result, Err(Error::NotExt2(_))));
    }

    #[test]
    fn test_block_size_shift() {
        let mut data = build_superblock(8192);
        // log_block_size = 2 -> 4096-byte blocks
        data[24..28].copy_from_slice(&2u32.to_le_bytes());
        let sb = Superblock::from_bytes(&data).unwrap();
        assert_eq!(sb.block_size(), 4096);

        // Largest valid shift: 64KiB blocks
        data[24..28].copy_from_slice(&MAX_LOG_BLOCK_SIZE.to_le_bytes());
        let sb = Superblock::from_bytes(&data).unwrap();
        assert_eq!(sb.block_size(), 65536);
    }

    #[test]
    fn test_oversized_log_block_size_rejected() {
        // 1024 << 22 would wrap a u32 to 0; 1024 << 40 would overflow the
        // shift outright. Both must be caught at parse time.
        for log in [7u32, 22, 40, u32::MAX] {
            let mut data = build_superblock(8192);
            data[24..28].copy_from_slice(&log.to_le_bytes());
            let result = Superblock::from_bytes(&data);
            assert!(
                matches!(result, Err(Error::NotExt2(_))),
                "log_block_size {} accepted",
                log
            );
        }
    }

    #[test]
    fn test_needs_check_when_mounted_after_fsck() {
        let mut data = build_superblock(8192);
        // mtime after lastcheck
        data[44..48].copy_from_slice(&3_000u32.to_le_bytes());
        data[64..68].copy_from_slice(&2_000u32.to_le_bytes());
        let sb = Superblock::from_bytes(&data).unwrap();
        assert!(sb.needs_check());
    }
}
