//! Save targets for downloaded objects.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs as tokio_fs, io::AsyncWriteExt};

use crate::error::{AdminError, AdminResult};
use crate::model::ObjectBody;

/// Last non-empty `/` segment of `key`, or `key` itself.
pub fn suggested_file_name(key: &str) -> &str {
    key.split('/')
        .filter(|part| !part.is_empty())
        .last()
        .unwrap_or(key)
}

/// Receives downloaded objects, e.g. a browser save dialog.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn save(&self, suggested_name: &str, body: ObjectBody) -> AdminResult<()>;
}

/// Writes downloads into a local directory.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target_path(&self, suggested_name: &str) -> AdminResult<PathBuf> {
        let mut components = Path::new(suggested_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Ok(self.root.join(name)),
            _ => Err(AdminError::InvalidPath(suggested_name.to_string())),
        }
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn save(&self, suggested_name: &str, body: ObjectBody) -> AdminResult<()> {
        let path = self.target_path(suggested_name)?;
        tokio_fs::create_dir_all(&self.root).await?;

        let mut file = tokio_fs::File::create(&path).await?;
        file.write_all(&body.bytes).await?;
        file.flush().await?;

        tracing::debug!(
            path = %path.display(),
            content_type = %body.content_type,
            length = body.bytes.len(),
            "object saved"
        );
        Ok(())
    }
}
