use crate::error::{Error, Result};
use crate::ext2::{
    Superblock, FEATURE_COMPAT_SUPP, FEATURE_INCOMPAT_SUPP, FEATURE_RO_COMPAT_SUPP,
};

/// Reject filesystems carrying feature bits this tool does not understand
///
/// Unknown bits mean the metadata layout may differ from what the resize
/// engine expects; proceeding would risk misinterpreting it. Stricter than
/// a plain open needs to be.
pub fn check_features(sb: &Superblock) -> Result<()> {
    let unknown_compat = sb.feature_compat() & !FEATURE_COMPAT_SUPP;
    let unknown_incompat = sb.feature_incompat() & !FEATURE_INCOMPAT_SUPP;
    let unknown_ro_compat = sb.feature_ro_compat() & !FEATURE_RO_COMPAT_SUPP;

    if unknown_compat != 0 || unknown_incompat != 0 || unknown_ro_compat != 0 {
        return Err(Error::UnsupportedFeature {
            compat: unknown_compat,
            incompat: unknown_incompat,
            ro_compat: unknown_ro_compat,
        });
    }
    Ok(())
}

/// Resolve the requested size against the probed device capacity
///
/// No explicit request defaults to the full device. An explicit request
/// beyond the device is rejected unless `force` is set; the caller who
/// forces past the probe is on their own.
pub fn resolve_target(
    requested: Option<u64>,
    max_device_blocks: u64,
    force: bool,
) -> Result<u64> {
    let target = match requested {
        None => max_device_blocks,
        Some(0) => {
            return Err(Error::BadSizeArgument(
                "new size must be a positive block count".to_string(),
            ))
        }
        Some(blocks) => blocks,
    };

    if !force && target > max_device_blocks {
        return Err(Error::TargetBeyondDevice {
            requested: target,
            available: max_device_blocks,
        });
    }

    Ok(target)
}

/// Refuse to resize a filesystem that was mounted since its last fsck
///
/// The engine trusts on-disk metadata; if the filesystem was modified after
/// the last consistency check, demand a fresh `e2fsck -f` run first.
/// `force` bypasses the check.
pub fn check_clean(sb: &Superblock, device_path: &str, force: bool) -> Result<()> {
    if !force && sb.needs_check() {
        return Err(Error::StaleFilesystem(device_path.to_string()));
    }
    Ok(())
}
