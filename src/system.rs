use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Check if a device is currently mounted
///
/// On Linux, this parses /proc/mounts to check if the device is mounted.
/// Resizing a mounted filesystem risks corruption, so this gate runs before
/// anything else touches the device.
pub fn check_not_mounted(device_path: impl AsRef<Path>) -> Result<()> {
    let device_path = resolve_device_path(device_path.as_ref())?;

    // Read /proc/mounts
    let mounts = fs::read_to_string("/proc/mounts").map_err(|e| {
        Error::Io(std::io::Error::other(format!(
            "Failed to read /proc/mounts: {}",
            e
        )))
    })?;

    // Check each mount entry
    for line in mounts.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            let mount_device = parts[0];
            let mount_point = parts[1];

            // Check if this mount entry matches our device
            if let Ok(resolved_mount) = resolve_device_path(Path::new(mount_device)) {
                if resolved_mount == device_path {
                    return Err(Error::DeviceMounted(device_path, mount_point.to_string()));
                }
            }
        }
    }

    Ok(())
}

/// Resolve a device path to its canonical form
///
/// This handles symlinks (e.g., /dev/disk/by-uuid/... -> /dev/sda1)
fn resolve_device_path(path: &Path) -> Result<String> {
    // Try to canonicalize the path
    match path.canonicalize() {
        Ok(canonical) => Ok(canonical.to_string_lossy().to_string()),
        Err(_) => {
            // If canonicalize fails (e.g., path doesn't exist), just return the original
            Ok(path.to_string_lossy().to_string())
        }
    }
}

/// Check if running as root (required for block device access)
pub fn check_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Get the size of a block device in bytes
///
/// This is the device size prober: the resize orchestrator cannot safely
/// bound a resize without it, so failure here is fatal.
#[cfg(target_os = "linux")]
pub fn get_block_device_size(path: impl AsRef<Path>) -> Result<u64> {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;

    let path = path.as_ref();
    let file = File::open(path).map_err(|_| Error::DeviceNotFound(path.display().to_string()))?;
    let fd = file.as_raw_fd();

    // Use BLKGETSIZE64 ioctl
    let mut size: u64 = 0;

    // BLKGETSIZE64 = 0x80081272
    // Cast to Ioctl type (i32 on musl, u64 on glibc)
    #[allow(overflowing_literals)]
    const BLKGETSIZE64: libc::Ioctl = 0x80081272u32 as libc::Ioctl;

    let result = unsafe { libc::ioctl(fd, BLKGETSIZE64, &mut size) };

    if result == -1 {
        // Fall back to seek method
        use std::io::{Seek, SeekFrom};
        let mut file = file;
        let size = file.seek(SeekFrom::End(0))?;
        Ok(size)
    } else {
        Ok(size)
    }
}

#[cfg(not(target_os = "linux"))]
pub fn get_block_device_size(path: impl AsRef<Path>) -> Result<u64> {
    use std::fs::File;
    use std::io::{Seek, SeekFrom};

    let path = path.as_ref();
    let mut file =
        File::open(path).map_err(|_| Error::DeviceNotFound(path.display().to_string()))?;
    let size = file.seek(SeekFrom::End(0))?;
    Ok(size)
}

/// Drop cached buffers for a block device before resizing
///
/// Uses the BLKFLSBUF ioctl on block devices; regular image files only need
/// an fsync. A flush failure is fatal: stale buffers on the device would
/// undermine every precondition checked afterwards.
#[cfg(target_os = "linux")]
pub fn flush_device_buffers(path: impl AsRef<Path>) -> Result<()> {
    use std::fs::File;
    use std::os::unix::io::AsRawFd;

    let path = path.as_ref();
    let file = File::open(path).map_err(|_| Error::DeviceNotFound(path.display().to_string()))?;

    if file.metadata()?.is_file() {
        file.sync_all()?;
        return Ok(());
    }

    // BLKFLSBUF = _IO(0x12, 97)
    const BLKFLSBUF: libc::Ioctl = 0x1261 as libc::Ioctl;

    let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKFLSBUF, 0) };
    if result == -1 {
        let errno = std::io::Error::last_os_error();
        return Err(Error::DeviceAccess(format!(
            "BLKFLSBUF failed for {}: {}",
            path.display(),
            errno
        )));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn flush_device_buffers(path: impl AsRef<Path>) -> Result<()> {
    Err(Error::DeviceAccess(format!(
        "device cache flush is not supported on this platform ({})",
        path.as_ref().display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_device_path() {
        // Test with a regular file
        let file = NamedTempFile::new().unwrap();

        let resolved = resolve_device_path(file.path()).unwrap();
        // Should be an absolute path
        assert!(resolved.starts_with('/'));
    }

    #[test]
    fn test_check_not_mounted_file() {
        // Create a temp file - should not be mounted
        let file = NamedTempFile::new().unwrap();

        // Should succeed since temp files aren't mounted
        let result = check_not_mounted(file.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_get_block_device_size_file() {
        let file = NamedTempFile::new().unwrap();
        // Write some data
        std::fs::write(file.path(), vec![0u8; 4096]).unwrap();

        let size = get_block_device_size(file.path()).unwrap();
        assert_eq!(size, 4096);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_flush_regular_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![0u8; 4096]).unwrap();

        // Regular files take the fsync path
        assert!(flush_device_buffers(file.path()).is_ok());
    }
}
