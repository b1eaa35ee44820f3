//! Virtual folder projection over a flat key namespace.
//!
//! The store has no directories. A folder at some prefix is every distinct
//! first segment of the keys below that prefix that still contain a
//! separator; everything else at that level is a file.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::StoredObject;

pub const DEFAULT_SEPARATOR: char = '/';

/// Explicit projection settings. Passed into every projection call so the
/// projector never reads ambient state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeOptions {
    /// When false, every object is a file named by its full key.
    pub enabled: bool,
    pub separator: char,
    /// Render a key equal to the current prefix as an empty-named file.
    pub show_directory_markers: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            separator: DEFAULT_SEPARATOR,
            show_directory_markers: false,
        }
    }
}

impl TreeOptions {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub name: String,
    pub full_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode<'a> {
    pub name: String,
    pub object: &'a StoredObject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VirtualNode<'a> {
    Folder(FolderNode),
    File(FileNode<'a>),
}

impl VirtualNode<'_> {
    pub fn name(&self) -> &str {
        match self {
            VirtualNode::Folder(folder) => &folder.name,
            VirtualNode::File(file) => &file.name,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, VirtualNode::Folder(_))
    }
}

/// One level of the virtual hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Projection<'a> {
    pub folders: Vec<FolderNode>,
    pub files: Vec<FileNode<'a>>,
}

impl<'a> Projection<'a> {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    /// Keys of the visible files. Folders are never selectable.
    pub fn file_keys(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|file| file.object.key.clone())
            .collect()
    }

    /// Folders first, then files.
    pub fn nodes(&self) -> Vec<VirtualNode<'a>> {
        self.folders
            .iter()
            .cloned()
            .map(VirtualNode::Folder)
            .chain(self.files.iter().cloned().map(VirtualNode::File))
            .collect()
    }
}

/// Locale-style name ordering: case-insensitive first, lowercase before
/// uppercase on ties, raw bytes last.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
        .then_with(|| a.cmp(b))
}

/// Partitions `objects` into the folders and files directly under `prefix`.
pub fn project<'a>(
    objects: &'a [StoredObject],
    prefix: &str,
    options: &TreeOptions,
) -> Projection<'a> {
    if !options.enabled {
        return Projection {
            folders: Vec::new(),
            files: objects
                .iter()
                .map(|object| FileNode {
                    name: object.key.clone(),
                    object,
                })
                .collect(),
        };
    }

    let mut folder_names: BTreeSet<&str> = BTreeSet::new();
    let mut files = Vec::new();

    for object in objects {
        let Some(remaining) = object.key.strip_prefix(prefix) else {
            continue;
        };

        if remaining.is_empty() && !options.show_directory_markers {
            continue;
        }

        match remaining.find(options.separator) {
            Some(index) => {
                folder_names.insert(&remaining[..index]);
            }
            None => files.push(FileNode {
                name: remaining.to_string(),
                object,
            }),
        }
    }

    let mut folders: Vec<FolderNode> = folder_names
        .into_iter()
        .map(|name| FolderNode {
            name: name.to_string(),
            full_path: format!("{prefix}{name}{}", options.separator),
        })
        .collect();

    folders.sort_by(|a, b| compare_names(&a.name, &b.name));
    files.sort_by(|a, b| compare_names(&a.name, &b.name));

    Projection { folders, files }
}

/// Segments of `prefix` without its trailing separator.
///
/// Interior empty segments are kept: a key such as `a//b` projects to a
/// folder named `""` at `a/`, and its prefix `a//` must rebuild exactly.
pub fn breadcrumbs(prefix: &str, separator: char) -> Vec<String> {
    if prefix.is_empty() {
        return Vec::new();
    }
    prefix
        .strip_suffix(separator)
        .unwrap_or(prefix)
        .split(separator)
        .map(str::to_string)
        .collect()
}

/// Inverse of [`breadcrumbs`].
pub fn prefix_from_breadcrumbs(segments: &[String], separator: char) -> String {
    if segments.is_empty() {
        return String::new();
    }
    let mut prefix = segments.join(&separator.to_string());
    prefix.push(separator);
    prefix
}

/// Prefix of the parent folder; the root stays the root.
pub fn parent_prefix(prefix: &str, separator: char) -> String {
    let mut segments = breadcrumbs(prefix, separator);
    segments.pop();
    prefix_from_breadcrumbs(&segments, separator)
}

/// Appends a trailing separator unless `prefix` is empty or has one.
pub fn normalize_prefix(prefix: &str, separator: char) -> String {
    if prefix.is_empty() || prefix.ends_with(separator) {
        prefix.to_string()
    } else {
        format!("{prefix}{separator}")
    }
}

/// Navigation state over the projection: current folder and mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeView {
    options: TreeOptions,
    current_prefix: String,
}

impl TreeView {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            current_prefix: String::new(),
        }
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Switching modes always returns to the root.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.options.enabled != enabled {
            self.options.enabled = enabled;
            self.reset_prefix();
        }
    }

    pub fn current_prefix(&self) -> &str {
        &self.current_prefix
    }

    pub fn navigate_to(&mut self, folder_path: &str) {
        self.current_prefix = normalize_prefix(folder_path, self.options.separator);
    }

    pub fn navigate_up(&mut self) {
        if self.current_prefix.is_empty() {
            return;
        }
        self.current_prefix = parent_prefix(&self.current_prefix, self.options.separator);
    }

    /// Jumps to the folder named by the first `depth` breadcrumbs.
    pub fn navigate_to_breadcrumb(&mut self, depth: usize) {
        let mut segments = self.breadcrumbs();
        segments.truncate(depth);
        self.current_prefix = prefix_from_breadcrumbs(&segments, self.options.separator);
    }

    pub fn reset_prefix(&mut self) {
        self.current_prefix.clear();
    }

    pub fn breadcrumbs(&self) -> Vec<String> {
        breadcrumbs(&self.current_prefix, self.options.separator)
    }

    pub fn project<'a>(&self, objects: &'a [StoredObject]) -> Projection<'a> {
        project(objects, &self.current_prefix, &self.options)
    }
}
