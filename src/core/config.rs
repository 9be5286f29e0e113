use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CONFIG_FILE: &str = "repack.toml";

pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

/// Every group carries `#[serde(default)]`, so a file that names only `[identity]`
/// still gets the stock `[paths]`, `[tools]` and so on.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct RepackConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub gadget: GadgetSettings,

    #[serde(default)]
    pub patches: PatchesConfig,

    /// Log failed external tools and carry on instead of aborting.
    #[serde(default)]
    pub keep_going: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub apk: String,
    pub decoded_dir: String,
    pub built_apk: String,
    pub signed_dir: String,
    pub patch_tmp_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            apk: "arknights-hg-2961.apk".to_string(),
            decoded_dir: "ak".to_string(),
            built_apk: "ak-g-unsigned.apk".to_string(),
            signed_dir: "ak-g-apk".to_string(),
            patch_tmp_dir: "patch_tmp".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ToolsConfig {
    pub java: String,
    pub apktool_jar: String,
    pub signer_jar: String,
    pub git: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            apktool_jar: "apktool.jar".to_string(),
            signer_jar: "uber-apk-signer.jar".to_string(),
            git: "git".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct IdentityConfig {
    pub package: String,
    pub source_prefix: String,
    pub target_prefix: String,
    pub app_name: String,
    pub string_resources: Vec<String>,
    pub extra_permission: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            package: "anime.pvz.online".to_string(),
            source_prefix: "com.YoStarEN.Arknights".to_string(),
            target_prefix: "anime.pvz.online.en".to_string(),
            app_name: "PvZ Online".to_string(),
            string_resources: vec![
                "res/values/strings.xml".to_string(),
                "res/values-zh/strings.xml".to_string(),
            ],
            extra_permission: "android.permission.MANAGE_EXTERNAL_STORAGE".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GadgetSettings {
    pub version: String,
    /// Compressed gadget to inject. Derived from `version` when unset.
    pub payload: Option<String>,
    pub abi: String,
    pub library_name: String,
    pub config_name: String,
    pub address: String,
    pub port: u16,
    pub script_dir: String,
}

impl GadgetSettings {
    pub fn payload_file(&self) -> String {
        match &self.payload {
            Some(payload) => payload.clone(),
            None => format!("frida-gadget-{}-android-arm64.so.xz", self.version),
        }
    }
}

impl Default for GadgetSettings {
    fn default() -> Self {
        Self {
            version: "17.6.2".to_string(),
            payload: None,
            abi: "arm64-v8a".to_string(),
            library_name: "libflorida.so".to_string(),
            config_name: "libflorida.config.so".to_string(),
            address: "127.0.0.1".to_string(),
            port: 10443,
            script_dir: "/sdcard/openbachelor".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PatchesConfig {
    pub smali: String,
    pub misc: String,
    pub placeholder: String,
    pub bytecode_prefix: String,
}

impl Default for PatchesConfig {
    fn default() -> Self {
        Self {
            smali: "smali.patch".to_string(),
            misc: "misc.patch".to_string(),
            placeholder: "/ak/smali/".to_string(),
            bytecode_prefix: "smali".to_string(),
        }
    }
}

/// Load the configuration at `path`. A missing file yields the stock recipe,
/// a malformed one is an error.
pub fn parse_config(path: &Path) -> Result<RepackConfig> {
    if !path.exists() {
        log::debug!("No config at `{}`, using defaults", path.display());
        return Ok(RepackConfig::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading `{}`", path.display()))?;
    let config = toml::from_str::<RepackConfig>(&content)
        .with_context(|| format!("Parsing `{}`", path.display()))?;
    log::info!("📄 Loaded config from `{}`", path.display());
    Ok(config)
}
