//! Upload sources and destination keys.

use std::path::{Component, Path};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{AdminError, AdminResult};

/// One file queued for upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    /// Bare file name.
    pub name: String,
    /// Path below the upload prefix, `/` separated, used instead of `name`
    /// to preserve folder structure.
    pub relative_path: Option<String>,
    pub bytes: Vec<u8>,
    /// Guessed from the file name when absent.
    pub content_type: Option<String>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
            bytes,
            content_type: None,
        }
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content_type(&self) -> String {
        match self.content_type.as_deref().filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .to_string(),
        }
    }

    fn key_suffix(&self) -> &str {
        self.relative_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .unwrap_or(&self.name)
    }
}

/// `prefix + relative_path`, or `prefix + name` without a relative path.
pub fn destination_key(prefix: &str, file: &UploadFile) -> String {
    format!("{prefix}{}", file.key_suffix())
}

/// Number of non-empty `/` segments.
pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|segment| !segment.is_empty()).count()
}

/// Rejects paths that are absolute, climb with `..`, or nest deeper than
/// `max_depth` segments.
pub fn validate_relative_path(path: &str, max_depth: usize) -> AdminResult<()> {
    let candidate = Path::new(path);
    if path.starts_with('/')
        || candidate.is_absolute()
        || candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(AdminError::InvalidPath(path.to_string()));
    }

    let depth = path_depth(path);
    if depth > max_depth {
        return Err(AdminError::PathTooDeep {
            path: path.to_string(),
            depth,
            max: max_depth,
        });
    }
    Ok(())
}

pub fn validate_queue(files: &[UploadFile], max_depth: usize) -> AdminResult<()> {
    for file in files {
        validate_relative_path(file.key_suffix(), max_depth)?;
    }
    Ok(())
}

/// Reads every file below `root` into the upload queue, keeping `root`'s own
/// name as the first path segment. Files whose relative path would exceed
/// `max_depth` segments are skipped.
pub fn collect_directory(root: &Path, max_depth: usize) -> AdminResult<Vec<UploadFile>> {
    let root_name = root
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| AdminError::InvalidPath(root.display().to_string()))?;

    // The root's name is one segment of every relative path.
    let walk_depth = max_depth.saturating_sub(1);
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(walk_depth)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            if entry.file_type().is_dir() && entry.depth() == walk_depth {
                warn!(
                    path = %entry.path().display(),
                    max_depth,
                    "skipping directory beyond max depth"
                );
            }
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let mut segments = vec![root_name.clone()];
        segments.extend(relative.components().filter_map(|part| match part {
            Component::Normal(value) => Some(value.to_string_lossy().to_string()),
            _ => None,
        }));

        let bytes = std::fs::read(entry.path())?;
        files.push(
            UploadFile::new(entry.file_name().to_string_lossy().to_string(), bytes)
                .with_relative_path(segments.join("/")),
        );
    }

    Ok(files)
}
