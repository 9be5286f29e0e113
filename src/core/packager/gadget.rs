use crate::core::config::GadgetSettings;
use crate::core::error::RepackError;
use anyhow::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use xz2::read::XzDecoder;

use super::env::RepackEnv;

/// How the injected gadget talks to the outside world.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GadgetMode {
    /// Load scripts from a directory on the device.
    ScriptDirectory,
    /// Listen on loopback and wait for a client before resuming the app.
    Listen,
}

impl GadgetMode {
    pub fn from_standalone_flag(standalone: bool) -> Self {
        if standalone {
            Self::ScriptDirectory
        } else {
            Self::Listen
        }
    }
}

/// Frida gadget configuration, written next to the library as `<name>.config.so`.
#[derive(Debug, Serialize)]
pub struct GadgetConfig {
    pub interaction: Interaction,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Interaction {
    ScriptDirectory {
        path: String,
    },
    Listen {
        address: String,
        port: u16,
        on_port_conflict: String,
        on_load: String,
    },
}

impl GadgetConfig {
    pub fn new(mode: GadgetMode, settings: &GadgetSettings) -> Self {
        let interaction = match mode {
            GadgetMode::ScriptDirectory => Interaction::ScriptDirectory {
                path: settings.script_dir.clone(),
            },
            GadgetMode::Listen => Interaction::Listen {
                address: settings.address.clone(),
                port: settings.port,
                on_port_conflict: "fail".to_string(),
                on_load: "wait".to_string(),
            },
        };
        Self { interaction }
    }

    /// Four-space indented JSON.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Decompress the whole xz payload into memory.
pub fn unpack_payload(payload: &Path) -> Result<Vec<u8>> {
    let file = File::open(payload).map_err(|e| RepackError::io(payload, e))?;
    let mut decoder = XzDecoder::new(file);
    let mut binary = Vec::new();
    decoder
        .read_to_end(&mut binary)
        .map_err(|e| RepackError::io(payload, e))?;
    Ok(binary)
}

fn write_into(dir: &Path, name: &str, contents: &[u8]) -> Result<()> {
    // The decode step creates the ABI directory; its absence means decoding went wrong.
    if !dir.is_dir() {
        return Err(RepackError::io(
            dir,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "native library directory does not exist",
            ),
        )
        .into());
    }
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|e| RepackError::io(&path, e))?;
    Ok(())
}

/// Write the gadget library and its configuration into the decoded tree.
pub fn inject(env: &RepackEnv) -> Result<()> {
    let settings = &env.config().gadget;
    let lib_dir = env.native_lib_dir();

    let binary = unpack_payload(&env.gadget_payload())?;
    write_into(&lib_dir, &settings.library_name, &binary)?;
    log::info!(
        "💉 Injected Frida gadget {} ({} bytes) as `{}`",
        settings.version,
        binary.len(),
        lib_dir.join(&settings.library_name).display()
    );

    let config = GadgetConfig::new(env.mode(), settings);
    write_into(&lib_dir, &settings.config_name, config.to_json()?.as_bytes())?;
    log::info!("💉 Gadget configured for {:?}", env.mode());
    Ok(())
}
