use crate::core::error::RepackError;
use anyhow::Result;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::env::RepackEnv;

fn remove_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            log::info!("🧹 Removed `{}`", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RepackError::io(path, e).into()),
    }
}

fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::info!("🧹 Removed `{}`", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RepackError::io(path, e).into()),
    }
}

/// Delete the decoded tree, the unsigned package and the signed output of a previous run.
pub fn clear_last_build(env: &RepackEnv) -> Result<()> {
    remove_dir(&env.decoded_dir())?;
    remove_file(&env.built_apk())?;
    remove_dir(&env.signed_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RepackConfig;
    use crate::core::packager::gadget::GadgetMode;
    use tempfile::tempdir;

    #[test]
    fn should_remove_previous_artifacts() {
        let dir = tempdir().unwrap();
        let env = RepackEnv::new(dir.path(), RepackConfig::default(), GadgetMode::Listen);
        fs::create_dir_all(env.decoded_dir().join("smali")).unwrap();
        fs::write(env.built_apk(), b"PK").unwrap();
        fs::create_dir_all(env.signed_dir()).unwrap();
        fs::write(env.default_apk(), b"PK").unwrap();

        clear_last_build(&env).unwrap();

        assert!(!env.decoded_dir().exists());
        assert!(!env.built_apk().exists());
        assert!(!env.signed_dir().exists());
        assert!(env.default_apk().exists(), "❌ input package was removed");
    }

    #[test]
    fn should_tolerate_clean_workspace() {
        let dir = tempdir().unwrap();
        let env = RepackEnv::new(dir.path(), RepackConfig::default(), GadgetMode::Listen);
        clear_last_build(&env).unwrap();
    }
}
