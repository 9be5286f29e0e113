use crate::core::error::RepackError;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::env::RepackEnv;
use super::tools::{ToolRun, Toolchain};

/// List the entries directly under `root` whose name starts with `prefix`, sorted.
///
/// apktool emits `smali`, `smali_classes2`, ... one per dex file, so a template
/// written against `smali/` has to be re-aimed at each of them.
pub fn bytecode_dirs(root: &Path, prefix: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(root).map_err(|e| RepackError::io(root, e))?;
    let mut names = vec![];
    for entry in entries {
        let entry = entry.map_err(|e| RepackError::io(root, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Replace every `placeholder` in `template` with `/<decoded>/<dir>/`.
pub fn instantiate(template: &str, placeholder: &str, decoded: &str, dir: &str) -> String {
    let decoded = decoded.trim_matches('/');
    template.replace(placeholder, &format!("/{}/{}/", decoded, dir))
}

/// File name of one instantiation: `<template stem>-<dir>.patch`.
pub fn instance_name(template: &Path, dir: &str) -> String {
    let stem = template
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "patch".to_string());
    format!("{}-{}.patch", stem, dir)
}

/// A patch instantiation written to disk, ready for `git apply`.
#[derive(Debug)]
pub struct PatchInstance {
    pub dir: String,
    pub path: PathBuf,
}

/// Write one instantiation of `template` per bytecode directory into the tmp dir.
pub fn retarget(env: &RepackEnv, template: &Path) -> Result<Vec<PatchInstance>> {
    let patches = &env.config().patches;
    let dirs = bytecode_dirs(&env.decoded_dir(), &patches.bytecode_prefix)?;
    if dirs.is_empty() {
        log::warn!(
            "⚠️ No `{}*` directories under `{}`, `{}` not applied",
            patches.bytecode_prefix,
            env.decoded_dir().display(),
            template.display()
        );
        return Ok(vec![]);
    }

    let tmp_dir = env.patch_tmp_dir();
    fs::create_dir_all(&tmp_dir).map_err(|e| RepackError::io(&tmp_dir, e))?;

    let mut instances = vec![];
    for dir in dirs {
        let text = fs::read_to_string(template).map_err(|e| RepackError::io(template, e))?;
        let text = instantiate(
            &text,
            &patches.placeholder,
            &env.config().paths.decoded_dir,
            &dir,
        );
        let path = tmp_dir.join(instance_name(template, &dir));
        fs::write(&path, text).map_err(|e| RepackError::io(&path, e))?;
        log::debug!("Retargeted `{}` at `{}`", template.display(), dir);
        instances.push(PatchInstance { dir, path });
    }
    Ok(instances)
}

/// Retarget `template` and hand every instantiation to `git apply`. Failed applies
/// come back as unsuccessful runs, never as `Err`.
pub fn apply(env: &RepackEnv, toolchain: &Toolchain, template: &Path) -> Result<Vec<ToolRun>> {
    log::info!("🩹 Applying `{}`", template.display());
    let runs = retarget(env, template)?
        .iter()
        .map(|instance| toolchain.apply_patch(env.root_dir(), &instance.path))
        .collect();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RepackConfig;
    use crate::core::packager::gadget::GadgetMode;
    use tempfile::tempdir;

    const TEMPLATE: &str = "\
diff --git a/ak/smali/com/example/Foo.smali b/ak/smali/com/example/Foo.smali
--- a/ak/smali/com/example/Foo.smali
+++ b/ak/smali/com/example/Foo.smali
@@ -1 +1 @@
-.class public Lcom/example/Foo;
+.class public final Lcom/example/Foo;
";

    fn env_with_dirs(root: &Path, dirs: &[&str]) -> RepackEnv {
        let env = RepackEnv::new(root, RepackConfig::default(), GadgetMode::Listen);
        fs::create_dir_all(env.decoded_dir()).unwrap();
        for dir in dirs {
            fs::create_dir_all(env.decoded_dir().join(dir)).unwrap();
        }
        fs::write(env.smali_patch(), TEMPLATE).unwrap();
        env
    }

    #[test]
    fn should_replace_every_placeholder() {
        let out = instantiate(TEMPLATE, "/ak/smali/", "ak", "smali_classes2");
        assert!(!out.contains("/ak/smali/"));
        assert_eq!(out.matches("/ak/smali_classes2/").count(), 4);
    }

    #[test]
    fn should_keep_identity_for_primary_dir() {
        assert_eq!(instantiate(TEMPLATE, "/ak/smali/", "ak", "smali"), TEMPLATE);
    }

    #[test]
    fn should_name_instances_after_template_and_dir() {
        assert_eq!(
            instance_name(Path::new("patches/misc.patch"), "smali_classes3"),
            "misc-smali_classes3.patch"
        );
    }

    #[test]
    fn should_discover_only_prefixed_entries() {
        let dir = tempdir().unwrap();
        let env = env_with_dirs(dir.path(), &["smali_classes2", "res", "smali", "lib"]);
        fs::write(env.decoded_dir().join("apktool.yml"), "").unwrap();
        assert_eq!(
            bytecode_dirs(&env.decoded_dir(), "smali").unwrap(),
            vec!["smali".to_string(), "smali_classes2".to_string()]
        );
    }

    #[test]
    fn should_write_one_instance_per_bytecode_dir() {
        let dir = tempdir().unwrap();
        let env = env_with_dirs(dir.path(), &["smali", "smali_classes2", "res"]);

        let instances = retarget(&env, &env.smali_patch()).unwrap();

        assert_eq!(instances.len(), 2);
        for instance in &instances {
            let text = fs::read_to_string(&instance.path).unwrap();
            let target = format!("/ak/{}/", instance.dir);
            assert_eq!(text.matches(&target).count(), 4);
            if instance.dir != "smali" {
                assert!(!text.contains("/ak/smali/"));
            }
        }
        assert!(env.patch_tmp_dir().join("smali-smali.patch").exists());
        assert!(env
            .patch_tmp_dir()
            .join("smali-smali_classes2.patch")
            .exists());
    }

    #[test]
    fn should_write_nothing_without_bytecode_dirs() {
        let dir = tempdir().unwrap();
        let env = env_with_dirs(dir.path(), &["res", "lib"]);

        let instances = retarget(&env, &env.smali_patch()).unwrap();

        assert!(instances.is_empty());
        assert!(!env.patch_tmp_dir().exists());
    }

    #[cfg(unix)]
    #[test]
    fn should_report_apply_outcomes_without_failing() {
        let dir = tempdir().unwrap();
        let mut config = RepackConfig::default();
        config.tools.git = "false".to_string();
        let env = RepackEnv::new(dir.path(), config, GadgetMode::Listen);
        fs::create_dir_all(env.decoded_dir().join("smali")).unwrap();
        fs::create_dir_all(env.decoded_dir().join("smali_classes2")).unwrap();
        fs::write(env.smali_patch(), TEMPLATE).unwrap();
        let toolchain = Toolchain::new(env.root_dir(), &env.config().tools);

        let runs = apply(&env, &toolchain, &env.smali_patch()).unwrap();

        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|run| !run.success()));
    }
}
