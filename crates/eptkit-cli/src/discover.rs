//! eMMC auto-discovery
//!
//! Amlogic boxes carry a single eMMC, which is the only block device with an
//! `rpmb` sibling (`/dev/mmcblk2rpmb` next to `/dev/mmcblk2`).

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Length of `mmcblkN`
const DEVICE_NAME_LEN: usize = 7;

/// Find the eMMC block device under `dev_dir`
pub fn find_emmc(dev_dir: &Path) -> Result<PathBuf> {
    let pattern = dev_dir.join("mmcblk[0-9]rpmb");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non UTF-8 device directory {}", dev_dir.display()))?;

    let rpmb: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid glob pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();

    if rpmb.len() != 1 {
        bail!(
            "{} instead of 1 rpmb devices, possibly caused by multiple eMMC which is impossible \
             on Amlogic devices or eMMC does not exist, refuse to continue",
            rpmb.len()
        );
    }

    let name = rpmb[0]
        .file_name()
        .and_then(|name| name.to_str())
        .context("rpmb device has no file name")?;

    Ok(rpmb[0].with_file_name(&name[..DEVICE_NAME_LEN]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_single_rpmb_sibling() {
        let dev = tempdir().unwrap();
        for name in ["mmcblk2", "mmcblk2p1", "mmcblk2rpmb", "mmcblk2boot0", "sda"] {
            fs::write(dev.path().join(name), b"").unwrap();
        }

        assert_eq!(find_emmc(dev.path()).unwrap(), dev.path().join("mmcblk2"));
    }

    #[test]
    fn test_no_emmc() {
        let dev = tempdir().unwrap();
        fs::write(dev.path().join("sda"), b"").unwrap();
        assert!(find_emmc(dev.path()).is_err());
    }

    #[test]
    fn test_multiple_emmc_refused() {
        let dev = tempdir().unwrap();
        fs::write(dev.path().join("mmcblk0rpmb"), b"").unwrap();
        fs::write(dev.path().join("mmcblk1rpmb"), b"").unwrap();
        assert!(find_emmc(dev.path()).is_err());
    }
}
