use crate::android::{manifest, resources};
use anyhow::{Context, Result};
use std::path::Path;

use super::env::RepackEnv;
use super::tools::{ToolRun, Toolchain};
use super::{gadget, patch, verify, workspace};

/// Abort on a failed tool unless `keep_going` is set, in which case it is only logged.
fn check(env: &RepackEnv, run: ToolRun) -> Result<()> {
    if env.keep_going() && !run.success() {
        log::warn!("⚠️ Continuing after failed `{}`", run.command_line);
        return Ok(());
    }
    run.ensure_success().map(|_| ())
}

/// Same policy for the checks that inspect a tool's output: with `keep_going` a
/// failure is logged and the step yields nothing.
fn check_output<T>(env: &RepackEnv, what: &str, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if env.keep_going() => {
            log::warn!("⚠️ Continuing without {}: {:#}", what, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn apply_patch(env: &RepackEnv, toolchain: &Toolchain, template: &Path) -> Result<()> {
    // Every instantiation targets a different directory, so all of them are
    // attempted before the first failure is reported.
    let mut failed = None;
    for run in patch::apply(env, toolchain, template)? {
        if !run.success() && failed.is_none() {
            failed = Some(run);
        }
    }
    match failed {
        Some(run) => check(env, run),
        None => Ok(()),
    }
}

/// Run the whole recipe: reset, decode, inject, patch, rebrand, rebuild, verify, sign.
pub fn build(env: &RepackEnv) -> Result<()> {
    let toolchain = Toolchain::new(env.root_dir(), &env.config().tools);

    log::info!("🚀 Step 1. Reset workspace");
    workspace::clear_last_build(env).context("Resetting workspace")?;

    log::info!("🚀 Step 2. Decode package");
    let apk = env.apk_path()?;
    check(env, toolchain.decode(&apk, &env.decoded_dir()))?;

    log::info!("🚀 Step 3. Inject gadget");
    gadget::inject(env).context("Injecting gadget")?;

    log::info!("🚀 Step 4. Patch bytecode");
    apply_patch(env, &toolchain, &env.smali_patch())?;

    log::info!("🚀 Step 5. Rebrand manifest");
    manifest::modify_manifest(&env.manifest(), &env.config().identity)?;

    log::info!("🚀 Step 6. Rename application");
    for res in env.string_resources() {
        resources::modify_app_name(&res, &env.config().identity.app_name)?;
    }

    log::info!("🚀 Step 7. Apply misc patch");
    apply_patch(env, &toolchain, &env.misc_patch())?;

    log::info!("🚀 Step 8. Rebuild package");
    check(env, toolchain.build(&env.decoded_dir(), &env.built_apk()))?;
    check_output(
        env,
        "a verified package",
        verify::ensure_entry(&env.built_apk(), &env.gadget_entry()),
    )?;

    log::info!("🚀 Step 9. Sign package");
    check(env, toolchain.sign(&env.built_apk(), &env.signed_dir()))?;
    let signed = check_output(
        env,
        "signed packages",
        verify::signed_packages(&env.signed_dir()),
    )?;
    for apk in signed.unwrap_or_default() {
        log::info!("✅ APK written to {}", apk.display());
    }
    Ok(())
}
