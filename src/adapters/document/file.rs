//! Implements DocumentPort over a markdown file on disk.

use crate::domain::DomainError;
use crate::ports::DocumentPort;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Markdown file document. A missing file reads as empty and is created on first write.
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write-replace: temp file, `sync_all`, then rename over the target.
/// A crash mid-write leaves the previous content intact.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut f = fs::File::create(&temp_path).await?;
    f.write_all(contents).await?;
    f.sync_all().await?;
    drop(f);

    fs::rename(&temp_path, path).await
}

#[async_trait::async_trait]
impl DocumentPort for FileDocument {
    async fn get(&self) -> Result<String, DomainError> {
        match fs::read_to_string(&self.path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(DomainError::Document(format!(
                "read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn set(&self, content: &str) -> Result<(), DomainError> {
        write_atomic(&self.path, content.as_bytes())
            .await
            .map_err(|e| DomainError::Document(format!("write {}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), len = content.len(), "document saved");
        Ok(())
    }
}
