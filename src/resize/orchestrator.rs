use crate::engine::ResizeEngine;
use crate::error::Result;
use crate::ext2::{FilesystemHandle, STATE_CLEAN};
use crate::progress::ProgressState;
use crate::resize::preflight::{check_clean, check_features, resolve_target};
use crate::system::{check_not_mounted, flush_device_buffers, get_block_device_size};

/// Options for the resize operation, immutable once built
#[derive(Debug, Clone)]
pub struct ResizeOptions {
    /// Path to the device or image file
    pub device_path: String,
    /// Requested new size in filesystem blocks; None means "fill the device"
    pub new_blocks: Option<u64>,
    /// Skip the safety checks that force can skip (size bound, staleness)
    pub force: bool,
    /// Flush device caches before touching the filesystem
    pub flush: bool,
    /// Trace every device read and write
    pub debug_io: bool,
    /// Render a per-pass progress meter
    pub show_progress: bool,
}

impl ResizeOptions {
    pub fn new(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            new_blocks: None,
            force: false,
            flush: false,
            debug_io: false,
            show_progress: false,
        }
    }

    pub fn new_blocks(mut self, blocks: Option<u64>) -> Self {
        self.new_blocks = blocks;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn flush(mut self, flush: bool) -> Self {
        self.flush = flush;
        self
    }

    pub fn debug_io(mut self, debug_io: bool) -> Self {
        self.debug_io = debug_io;
        self
    }

    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }
}

/// Result of a resize operation
#[derive(Debug)]
pub struct ResizeOutcome {
    pub device_path: String,
    pub block_size: u32,
    pub old_blocks: u64,
    pub new_blocks: u64,
    /// False when the filesystem was already the requested size
    pub changed: bool,
}

/// Resize the filesystem on a device, driving the engine through its passes
///
/// All safety checks run before the engine is invoked, in order: mount
/// state, optional cache flush, superblock open, feature compatibility,
/// device size probe, target resolution, no-op detection, staleness. Each
/// short-circuits; none of them mutates the filesystem.
///
/// When `show_progress` is set, the engine gets a callback that drives a
/// per-pass meter via [`ProgressState`]; display problems are absorbed there
/// and never abort the resize. An engine failure is propagated verbatim
/// after the filesystem handle has been released; the filesystem is left in
/// whatever state the engine reached.
pub fn resize_filesystem(
    options: &ResizeOptions,
    engine: &mut dyn ResizeEngine,
) -> Result<ResizeOutcome> {
    // A mounted filesystem is never touched, not even to read its superblock
    check_not_mounted(&options.device_path)?;

    if options.flush {
        flush_device_buffers(&options.device_path)?;
    }

    let mut fs = FilesystemHandle::open(&options.device_path, true, options.debug_io)?;
    let block_size = fs.block_size();
    let current_blocks = fs.blocks_count();

    check_features(fs.superblock())?;

    // Probe the containing device; this bounds the resize, so a probe
    // failure is fatal
    let max_blocks = get_block_device_size(&options.device_path)? / block_size as u64;

    let target_blocks = resolve_target(options.new_blocks, max_blocks, options.force)?;

    if target_blocks == current_blocks {
        return Ok(ResizeOutcome {
            device_path: options.device_path.clone(),
            block_size,
            old_blocks: current_blocks,
            new_blocks: current_blocks,
            changed: false,
        });
    }

    check_clean(fs.superblock(), &options.device_path, options.force)?;

    let mut state = ProgressState::new();
    let result = if options.show_progress {
        let mut on_progress = |pass: u32, cur: u64, max: u64| -> Result<()> {
            state.observe(pass, cur, max);
            Ok(())
        };
        engine.run(&mut fs, target_blocks, Some(&mut on_progress))
    } else {
        engine.run(&mut fs, target_blocks, None)
    };

    // Release the handle before surfacing any engine error
    drop(fs);
    result?;

    Ok(ResizeOutcome {
        device_path: options.device_path.clone(),
        block_size,
        old_blocks: current_blocks,
        new_blocks: target_blocks,
        changed: true,
    })
}

/// Get information about an ext2 filesystem without modifying it
pub fn get_fs_info(device_path: &str) -> Result<FsInfoReport> {
    let fs = FilesystemHandle::open(device_path, false, false)?;
    let sb = fs.superblock();

    let device_blocks = fs.device_blocks()?;
    let current_blocks = sb.blocks_count();

    Ok(FsInfoReport {
        device_path: device_path.to_string(),
        volume_name: sb.volume_name(),
        block_size: sb.block_size(),
        blocks_count: current_blocks,
        free_blocks_count: sb.free_blocks_count(),
        inodes_count: sb.inodes_count(),
        feature_compat: sb.feature_compat(),
        feature_incompat: sb.feature_incompat(),
        feature_ro_compat: sb.feature_ro_compat(),
        state: sb.state(),
        rev_level: sb.rev_level(),
        last_write_time: sb.wtime(),
        needs_check: sb.needs_check(),
        device_blocks,
        can_grow: device_blocks > current_blocks,
    })
}

/// Report about an ext2 filesystem
#[derive(Debug)]
pub struct FsInfoReport {
    pub device_path: String,
    pub volume_name: String,
    pub block_size: u32,
    pub blocks_count: u64,
    pub free_blocks_count: u64,
    pub inodes_count: u32,
    pub feature_compat: u32,
    pub feature_incompat: u32,
    pub feature_ro_compat: u32,
    pub state: u16,
    pub rev_level: u32,
    pub last_write_time: u32,
    pub needs_check: bool,
    pub device_blocks: u64,
    pub can_grow: bool,
}

impl std::fmt::Display for FsInfoReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ext2 Filesystem Information")?;
        writeln!(f, "===========================")?;
        writeln!(f, "Device: {}", self.device_path)?;
        if !self.volume_name.is_empty() {
            writeln!(f, "Volume label: {}", self.volume_name)?;
        }
        writeln!(f)?;
        writeln!(f, "Geometry:")?;
        writeln!(f, "  Block size: {}", self.block_size)?;
        writeln!(f, "  Block count: {}", self.blocks_count)?;
        writeln!(f, "  Free blocks: {}", self.free_blocks_count)?;
        writeln!(f, "  Inode count: {}", self.inodes_count)?;
        writeln!(f)?;
        writeln!(f, "Features:")?;
        writeln!(f, "  Compat: {:#010x}", self.feature_compat)?;
        writeln!(f, "  Incompat: {:#010x}", self.feature_incompat)?;
        writeln!(f, "  RO-compat: {:#010x}", self.feature_ro_compat)?;
        writeln!(f)?;
        writeln!(f, "Status:")?;
        writeln!(
            f,
            "  State: {:#06x}{}",
            self.state,
            if self.state & STATE_CLEAN != 0 {
                " (clean)"
            } else {
                " (not cleanly unmounted)"
            }
        )?;
        writeln!(f, "  Revision: {}", self.rev_level)?;
        writeln!(f, "  Last write: {}", self.last_write_time)?;
        writeln!(f)?;
        writeln!(f, "Size:")?;
        writeln!(
            f,
            "  Current size: {} bytes ({:.2} MB)",
            self.blocks_count * self.block_size as u64,
            (self.blocks_count * self.block_size as u64) as f64 / (1024.0 * 1024.0)
        )?;
        writeln!(f, "  Device blocks: {}", self.device_blocks)?;
        writeln!(
            f,
            "  Can grow: {}",
            if self.can_grow { "Yes" } else { "No" }
        )?;
        if self.needs_check {
            writeln!(f)?;
            writeln!(
                f,
                "Warning: modified since last check; run 'e2fsck -f {}' before resizing",
                self.device_path
            )?;
        }
        Ok(())
    }
}
