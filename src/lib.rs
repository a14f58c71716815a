pub mod device;
pub mod engine;
pub mod error;
pub mod ext2;
pub mod progress;
pub mod resize;
pub mod system;

pub use device::Device;
pub use engine::{ProgressFn, ResizeEngine};
pub use error::{Error, Result};
pub use ext2::{FilesystemHandle, Superblock};
pub use progress::{Pass, ProgressMeter, ProgressState};
pub use resize::{get_fs_info, resize_filesystem, FsInfoReport, ResizeOptions, ResizeOutcome};
pub use system::{check_not_mounted, check_root, flush_device_buffers, get_block_device_size};
