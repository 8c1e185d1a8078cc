//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "SOFTMENTION_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "softmention.db";

/// Blacklist file name inside the root folder
pub const BLACKLIST_FILE: &str = "blacklist.csv";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `root_folder` key of the TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Some(path) = env_value(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(config_path) = config_file {
        if let Ok(toml_content) = std::fs::read_to_string(config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    default_root_folder()
}

/// Read an environment variable, treating empty/whitespace values as unset
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Locate the TOML config file for a module
///
/// Looks for `<config_dir>/softmention/<module>.toml`, then
/// `/etc/softmention/<module>.toml` on Linux. Returns `None` if neither exists.
pub fn find_config_file(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("softmention").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/softmention").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML config file, degrading to defaults when it is missing
///
/// A missing file is not an error: a warning is logged and `T::default()` is
/// returned. A file that exists but cannot be parsed is a configuration error.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file not found: {} (using compiled defaults)", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Create the root folder if missing
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(())
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/softmention (or /var/lib/softmention for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("softmention"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/softmention"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("softmention"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/softmention"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("softmention"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\softmention"))
    } else {
        PathBuf::from("./softmention_data")
    }
}
