use crate::core::error::RepackError;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Check that the rebuilt package still carries `entry`. apktool silently drops
/// libraries it does not recognise, so a clean exit is not enough.
pub fn ensure_entry(apk: &Path, entry: &str) -> Result<u64> {
    let file = File::open(apk).map_err(|e| RepackError::io(apk, e))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("Opening `{}`", apk.display()))?;
    let size = match archive.by_name(entry) {
        Ok(file) => file.size(),
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(RepackError::ExternalToolFailure {
                tool: "apktool".to_string(),
                status: format!("`{}` is missing from `{}`", entry, apk.display()),
            }
            .into())
        }
        Err(e) => return Err(e).with_context(|| format!("Reading `{}`", apk.display())),
    };
    log::info!("🔍 `{}` contains `{}` ({} bytes)", apk.display(), entry, size);
    Ok(size)
}

/// Packages the signer left in `dir`.
pub fn signed_packages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut packages = vec![];
    for entry in fs::read_dir(dir).map_err(|e| RepackError::io(dir, e))? {
        let path = entry.map_err(|e| RepackError::io(dir, e))?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("apk") {
            packages.push(path);
        }
    }
    packages.sort();
    Ok(packages)
}
