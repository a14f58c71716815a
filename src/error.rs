use thiserror::Error;

/// All errors that can occur while preparing or driving a resize
#[derive(Debug, Error)]
pub enum Error {
    #[error("Bad filesystem size argument: {0}")]
    BadSizeArgument(String),

    #[error("Device '{0}' not found or cannot be opened")]
    DeviceNotFound(String),

    #[error("Device '{0}' is currently mounted at '{1}'; can't resize a mounted filesystem")]
    DeviceMounted(String, String),

    #[error("Not a valid ext2 filesystem: {0}")]
    NotExt2(String),

    #[error(
        "Filesystem has features this tool does not understand \
         (compat {compat:#010x}, incompat {incompat:#010x}, ro-compat {ro_compat:#010x})"
    )]
    UnsupportedFeature {
        compat: u32,
        incompat: u32,
        ro_compat: u32,
    },

    #[error(
        "The containing device is only {available} blocks; \
         you requested a new size of {requested} blocks"
    )]
    TargetBeyondDevice { requested: u64, available: u64 },

    #[error(
        "Filesystem on '{0}' was modified since it was last checked; run 'e2fsck -f {0}' first"
    )]
    StaleFilesystem(String),

    #[error("Device access failed: {0}")]
    DeviceAccess(String),

    #[error("Progress display error: {0}")]
    Display(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
