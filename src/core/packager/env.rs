use crate::core::config::RepackConfig;
use crate::core::error::RepackError;
use anyhow::{Context, Result};
use inquire::validator::Validation;
use inquire::{CustomUserError, InquireError, Text};
use std::path::{Path, PathBuf};

use super::gadget::GadgetMode;

/// Everything a run needs, resolved against the working directory.
pub struct RepackEnv {
    root: PathBuf,
    config: RepackConfig,
    mode: GadgetMode,
}

impl RepackEnv {
    pub fn new(root: impl Into<PathBuf>, config: RepackConfig, mode: GadgetMode) -> Self {
        Self {
            root: root.into(),
            config,
            mode,
        }
    }

    pub fn config(&self) -> &RepackConfig {
        &self.config
    }

    pub fn mode(&self) -> GadgetMode {
        self.mode
    }

    pub fn keep_going(&self) -> bool {
        self.config.keep_going
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    pub fn default_apk(&self) -> PathBuf {
        self.root.join(&self.config.paths.apk)
    }

    pub fn decoded_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.decoded_dir)
    }

    pub fn built_apk(&self) -> PathBuf {
        self.root.join(&self.config.paths.built_apk)
    }

    pub fn signed_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.signed_dir)
    }

    pub fn patch_tmp_dir(&self) -> PathBuf {
        self.root.join(&self.config.paths.patch_tmp_dir)
    }

    pub fn manifest(&self) -> PathBuf {
        self.decoded_dir().join("AndroidManifest.xml")
    }

    pub fn string_resources(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let decoded = self.decoded_dir();
        self.config
            .identity
            .string_resources
            .iter()
            .map(move |res| decoded.join(res))
    }

    pub fn native_lib_dir(&self) -> PathBuf {
        self.decoded_dir().join("lib").join(&self.config.gadget.abi)
    }

    pub fn gadget_payload(&self) -> PathBuf {
        self.root.join(self.config.gadget.payload_file())
    }

    pub fn smali_patch(&self) -> PathBuf {
        self.root.join(&self.config.patches.smali)
    }

    pub fn misc_patch(&self) -> PathBuf {
        self.root.join(&self.config.patches.misc)
    }

    /// Path of the agent library inside the built package.
    pub fn gadget_entry(&self) -> String {
        format!(
            "lib/{}/{}",
            self.config.gadget.abi, self.config.gadget.library_name
        )
    }

    /// The default package if present, otherwise whatever the user picks at the prompt.
    pub fn apk_path(&self) -> Result<PathBuf> {
        let default = self.default_apk();
        if default.is_file() {
            return Ok(default);
        }
        log::warn!("⚠️ `{}` not found", default.display());
        prompt_apk_path()
    }
}

/// Check a typed package path. Whitespace and the quotes of a pasted path are dropped.
pub fn validate_apk_path(input: &str) -> Result<PathBuf, RepackError> {
    let answer = input.trim().trim_matches('"');
    if answer.is_empty() {
        return Err(RepackError::MissingInput("apk filepath not given".to_string()));
    }
    let path = PathBuf::from(answer);
    if !path.is_file() {
        return Err(RepackError::MissingInput(format!(
            "`{}` is not a file",
            path.display()
        )));
    }
    Ok(path)
}

/// Ask for a package path until the answer is empty or names a file.
fn prompt_apk_path() -> Result<PathBuf> {
    // An empty answer goes through and is reported as missing input.
    let validator = |input: &str| -> Result<Validation, CustomUserError> {
        if input.trim().is_empty() || validate_apk_path(input).is_ok() {
            Ok(Validation::Valid)
        } else {
            Ok(Validation::Invalid("Not a file".into()))
        }
    };
    let answer = match Text::new("Path to the APK to repack:")
        .with_validator(validator)
        .prompt()
    {
        Ok(answer) => answer,
        Err(
            InquireError::OperationCanceled
            | InquireError::OperationInterrupted
            | InquireError::NotTTY,
        ) => return Err(RepackError::MissingInput("apk picker cancelled".to_string()).into()),
        Err(e) => return Err(e).context("Prompting for the APK path"),
    };
    Ok(validate_apk_path(&answer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn missing_input(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<RepackError>(),
            Some(RepackError::MissingInput(_))
        )
    }

    #[test]
    fn should_resolve_paths_against_root() {
        let env = RepackEnv::new("/work", RepackConfig::default(), GadgetMode::Listen);
        assert_eq!(env.decoded_dir(), Path::new("/work/ak"));
        assert_eq!(env.manifest(), Path::new("/work/ak/AndroidManifest.xml"));
        assert_eq!(env.native_lib_dir(), Path::new("/work/ak/lib/arm64-v8a"));
        assert_eq!(env.gadget_entry(), "lib/arm64-v8a/libflorida.so");
        let resources: Vec<_> = env.string_resources().collect();
        assert_eq!(
            resources,
            vec![
                PathBuf::from("/work/ak/res/values/strings.xml"),
                PathBuf::from("/work/ak/res/values-zh/strings.xml"),
            ]
        );
    }

    #[test]
    fn should_prefer_default_apk() {
        let dir = tempdir().unwrap();
        let env = RepackEnv::new(dir.path(), RepackConfig::default(), GadgetMode::Listen);
        fs::write(env.default_apk(), b"PK").unwrap();
        assert_eq!(env.apk_path().unwrap(), env.default_apk());
    }

    #[test]
    fn should_reject_empty_answer() {
        assert!(matches!(
            validate_apk_path("  \n"),
            Err(RepackError::MissingInput(_))
        ));
        assert!(matches!(
            validate_apk_path("\"\""),
            Err(RepackError::MissingInput(_))
        ));
    }

    #[test]
    fn should_reject_paths_that_are_not_files() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            validate_apk_path("/definitely/not/here.apk"),
            Err(RepackError::MissingInput(_))
        ));
        let err = validate_apk_path(&dir.path().display().to_string()).unwrap_err();
        assert!(missing_input(&err.into()));
    }

    #[test]
    fn should_accept_pasted_file_path() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("picked.apk");
        fs::write(&apk, b"PK").unwrap();
        let answer = format!("  \"{}\"  ", apk.display());
        assert_eq!(validate_apk_path(&answer).unwrap(), apk);
    }
}
