use crate::error::Result;
use crate::ext2::FilesystemHandle;

/// Progress callback invoked synchronously by the engine on its own thread
///
/// Arguments are (pass_id, cur, max). `max == 0` means no progress quantum
/// for this call; `cur == 0` marks the start of a pass; `cur >= max` marks
/// its completion. The callback only fails if the engine should abort.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u32, u64, u64) -> Result<()>;

/// The structural resize engine
///
/// Performs the actual ordered metadata and block restructuring passes.
/// Opaque to the orchestrator beyond this contract: pass ordering and count
/// are engine-defined, and progress is reported through the callback per the
/// `ProgressFn` semantics. Implementations include scripted test doubles.
pub trait ResizeEngine {
    /// Resize the filesystem to `new_blocks` blocks
    ///
    /// Must invoke `progress`, when present, once per progress quantum.
    /// On failure the filesystem is left in whatever state the engine
    /// reached; the orchestrator does not retry or roll back.
    fn run(
        &mut self,
        fs: &mut FilesystemHandle,
        new_blocks: u64,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<()>;
}
