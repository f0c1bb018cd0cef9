use serde::Deserialize;
use serde_json::error::Category;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::sampler::resolve_interval;
use crate::error::{CaptureError, Result};
use crate::util::expand_tilde;

pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Contents of `setup.json`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    /// World (save folder) name.
    #[serde(default)]
    pub savename: Option<String>,
    /// Player UUID, as used for the `playerdata/<uuid>.dat` file name.
    #[serde(default)]
    pub username: Option<String>,
    /// Save location kind. Only `0` (Java edition saves folder) exists.
    #[serde(default)]
    pub saverute: Option<i64>,
    /// Tick period in milliseconds; kept raw so bad values can fall back.
    #[serde(default)]
    pub interval_log: Option<Value>,
    /// Viewer port; a number or a numeric string.
    #[serde(default)]
    pub server_port: Option<Value>,
    /// Only a literal `true` enables it.
    #[serde(default)]
    pub force_log_same_position: Option<Value>,
    /// Overrides the `.minecraft` directory lookup.
    #[serde(default)]
    pub minecraft_dir: Option<String>,
}

/// Every path the capturer touches, derived from the config.
#[derive(Clone, Debug, PartialEq)]
pub struct CapturePaths {
    pub world_dir: PathBuf,
    pub playerdata_dir: PathBuf,
    pub dat_path: PathBuf,
    pub userlog_dir: PathBuf,
    pub log_path: PathBuf,
}

impl SetupConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CaptureError::Config(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&content).map_err(|e| match e {
            CaptureError::Config(msg) => {
                CaptureError::Config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| match e.classify() {
            Category::Data => {
                CaptureError::Config(format!("setup.json has a value of the wrong type: {e}"))
            }
            Category::Syntax | Category::Eof | Category::Io => CaptureError::Config(format!(
                "setup.json is not valid JSON (keys and strings need double quotes): {e}"
            )),
        })
    }

    pub fn interval(&self) -> Duration {
        resolve_interval(self.interval_log.as_ref())
    }

    /// Falls back to the default when the value is not a valid port.
    pub fn server_port(&self) -> u16 {
        let port = match &self.server_port {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        port.and_then(|p| u16::try_from(p).ok()).unwrap_or(DEFAULT_SERVER_PORT)
    }

    pub fn force_same(&self) -> bool {
        matches!(self.force_log_same_position, Some(Value::Bool(true)))
    }

    /// Build the save and log paths. `root` hosts the `userlog` folder.
    pub fn resolve_paths(&self, root: &Path) -> Result<CapturePaths> {
        let savename = required_name(self.savename.as_deref(), "savename")?;
        let username = required_name(self.username.as_deref(), "username")?;

        match self.saverute.unwrap_or(0) {
            0 => {}
            other => {
                return Err(CaptureError::Config(format!(
                    "Unsupported 'saverute' value ({other}). Use 0 for the Java edition saves folder."
                )))
            }
        }

        let base = match self.minecraft_dir.as_deref() {
            Some(dir) => PathBuf::from(expand_tilde(dir)),
            None => minecraft_dir(std::env::var_os("APPDATA")).ok_or_else(|| {
                CaptureError::Config(
                    "Cannot locate the .minecraft directory: APPDATA is not set. \
                     Set 'minecraftDir' in setup.json."
                        .into(),
                )
            })?,
        };

        let world_dir = base.join("saves").join(savename);
        let playerdata_dir = world_dir.join("playerdata");
        let dat_path = playerdata_dir.join(format!("{username}.dat"));
        let userlog_dir = root.join("userlog");
        let log_path = userlog_dir.join(format!("{savename}_{username}.csv"));

        Ok(CapturePaths {
            world_dir,
            playerdata_dir,
            dat_path,
            userlog_dir,
            log_path,
        })
    }
}

impl CapturePaths {
    /// Startup checks. A missing save is only reported, since the game may
    /// create it later; the log folder is created up front.
    pub fn prepare(&self) -> Result<()> {
        if !self.playerdata_dir.exists() {
            tracing::error!(
                path = %self.playerdata_dir.display(),
                "playerdata folder does not exist; check the world name and save location"
            );
        }
        if !self.dat_path.exists() {
            tracing::error!(
                path = %self.dat_path.display(),
                "Player .dat file not found; check savename and username in setup.json"
            );
        }
        std::fs::create_dir_all(&self.userlog_dir)?;
        Ok(())
    }
}

fn required_name<'a>(value: Option<&'a str>, key: &str) -> Result<&'a str> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(CaptureError::Config(format!(
            "setup.json needs at least 'savename' (world name) and 'username' (player UUID); '{key}' is missing"
        )));
    }
    if value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(CaptureError::Config(format!(
            "'{key}' must be a plain name, got '{value}'"
        )));
    }
    Ok(value)
}

/// Locate `.minecraft`: `%APPDATA%\.minecraft` when APPDATA is set,
/// otherwise the launcher's default for this platform.
pub fn minecraft_dir(appdata: Option<OsString>) -> Option<PathBuf> {
    if let Some(appdata) = appdata.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(appdata).join(".minecraft"));
    }
    if cfg!(target_os = "windows") {
        dirs::config_dir().map(|d| d.join(".minecraft"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir().map(|d| d.join("minecraft"))
    } else {
        dirs::home_dir().map(|h| h.join(".minecraft"))
    }
}
