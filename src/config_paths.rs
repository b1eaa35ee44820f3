use std::path::PathBuf;

use crate::error::{AdminError, AdminResult};

pub const CONFIG_DIR_ENV: &str = "BUCKETVIEW_CONFIG_DIR";

pub fn bucketview_config_dir() -> AdminResult<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| AdminError::Config("unable to resolve USERPROFILE/HOME".to_string()))?
    } else {
        std::env::var("HOME")
            .map_err(|_| AdminError::Config("unable to resolve HOME".to_string()))?
    };

    let mut path = PathBuf::from(home);
    if cfg!(target_os = "macos") {
        path.push("Library");
        path.push("Application Support");
        path.push("bucketview");
    } else {
        path.push(".config");
        path.push("bucketview");
    }
    Ok(path)
}

pub fn view_settings_path() -> AdminResult<PathBuf> {
    Ok(bucketview_config_dir()?.join("view-settings.json"))
}
