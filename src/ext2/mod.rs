pub mod handle;
pub mod superblock;

pub use handle::*;
pub use superblock::*;
