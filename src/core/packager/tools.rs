use crate::core::config::ToolsConfig;
use crate::core::error::RepackError;
use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Outcome of one child process. Spawn failures are folded in as `status: None`
/// so callers decide whether a failure matters.
#[derive(Debug)]
pub struct ToolRun {
    pub tool: String,
    pub command_line: String,
    pub status: Option<ExitStatus>,
    pub spawn_error: Option<String>,
}

impl ToolRun {
    pub fn success(&self) -> bool {
        self.status.map_or(false, |status| status.success())
    }

    fn describe(&self) -> String {
        match (&self.status, &self.spawn_error) {
            (Some(status), _) => status.to_string(),
            (None, Some(err)) => format!("could not be started: {}", err),
            (None, None) => "did not run".to_string(),
        }
    }

    /// Turn an unsuccessful run into `ExternalToolFailure`.
    pub fn ensure_success(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(RepackError::ExternalToolFailure {
                status: format!("{} (`{}`)", self.describe(), self.command_line),
                tool: self.tool,
            }
            .into())
        }
    }
}

fn render(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `command` to completion with inherited stdio.
pub fn run(tool: &str, mut command: Command) -> ToolRun {
    let command_line = render(&command);
    log::info!("▶️ {}", command_line);
    match command.status() {
        Ok(status) => {
            if status.success() {
                log::debug!("✅ `{}` exited with {}", tool, status);
            } else {
                log::error!("❌ `{}` exited with {}", tool, status);
            }
            ToolRun {
                tool: tool.to_string(),
                command_line,
                status: Some(status),
                spawn_error: None,
            }
        }
        Err(e) => {
            log::error!("❌ Spawning `{}` failed: {}", tool, e);
            ToolRun {
                tool: tool.to_string(),
                command_line,
                status: None,
                spawn_error: Some(e.to_string()),
            }
        }
    }
}

/// Look `program` up on `PATH`, falling back to the bare name so the spawn error
/// surfaces through `ToolRun` rather than here.
fn locate(program: &str) -> OsString {
    match which::which(program) {
        Ok(path) => path.into_os_string(),
        Err(e) => {
            log::warn!("⚠️ Could not locate `{}` on PATH: {}", program, e);
            OsString::from(program)
        }
    }
}

/// The external programs the recipe shells out to.
pub struct Toolchain {
    java: OsString,
    git: OsString,
    apktool_jar: PathBuf,
    signer_jar: PathBuf,
}

impl Toolchain {
    pub fn new(root: &Path, tools: &ToolsConfig) -> Self {
        Self {
            java: locate(&tools.java),
            git: locate(&tools.git),
            apktool_jar: root.join(&tools.apktool_jar),
            signer_jar: root.join(&tools.signer_jar),
        }
    }

    fn jar(&self, jar: &Path) -> Command {
        let mut command = Command::new(&self.java);
        command.arg("-jar").arg(jar);
        command
    }

    /// `apktool d <apk> -o <out>`
    pub fn decode(&self, apk: &Path, out: &Path) -> ToolRun {
        let mut command = self.jar(&self.apktool_jar);
        command.arg("d").arg(apk).arg("-o").arg(out);
        run("apktool", command)
    }

    /// `apktool b <dir> -o <out>`
    pub fn build(&self, dir: &Path, out: &Path) -> ToolRun {
        let mut command = self.jar(&self.apktool_jar);
        command.arg("b").arg(dir).arg("-o").arg(out);
        run("apktool", command)
    }

    /// `uber-apk-signer -a <apk> -o <out dir>`
    pub fn sign(&self, apk: &Path, out_dir: &Path) -> ToolRun {
        let mut command = self.jar(&self.signer_jar);
        command.arg("-a").arg(apk).arg("-o").arg(out_dir);
        run("uber-apk-signer", command)
    }

    /// `git apply -v <patch>`, run from `cwd` so repo-relative patch paths resolve.
    pub fn apply_patch(&self, cwd: &Path, patch: &Path) -> ToolRun {
        let mut command = Command::new(&self.git);
        command.current_dir(cwd).arg("apply").arg("-v").arg(patch);
        run("git", command)
    }
}
