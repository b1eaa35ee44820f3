//! View preferences persisted across sessions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config_paths::view_settings_path;
use crate::error::AdminResult;
use crate::tree::{TreeOptions, DEFAULT_SEPARATOR};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewSettings {
    pub tree_view_enabled: bool,
    pub show_directory_markers: bool,
}

impl ViewSettings {
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            enabled: self.tree_view_enabled,
            separator: DEFAULT_SEPARATOR,
            show_directory_markers: self.show_directory_markers,
        }
    }

    /// Defaults when the file is missing or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Self>(&raw).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed view settings");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> AdminResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(path, payload)?;
        Ok(())
    }

    pub fn load() -> Self {
        match view_settings_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> AdminResult<()> {
        self.save_to(&view_settings_path()?)
    }
}
