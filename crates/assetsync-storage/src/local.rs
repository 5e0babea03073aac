//! Local filesystem sink.
//!
//! Objects live at `{root}/{key}`; keys may contain `/` to form
//! subdirectories. Each write goes to a sibling temp file first and is then
//! renamed over the destination, so readers never observe a partial file.

use std::path::{Component, Path, PathBuf};

use assetsync_pipeline::{BlobSink, CollaboratorError};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

pub struct LocalDiskSink {
    root: PathBuf,
    public_base_url: String,
}

impl LocalDiskSink {
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: &str) -> Self {
        Self {
            root,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `key` under the root, refusing absolute paths and `..`.
    fn key_path(&self, key: &str) -> Result<PathBuf, CollaboratorError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(CollaboratorError::Backend(format!(
                "refusing to write outside sink root: {key:?}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobSink for LocalDiskSink {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, CollaboratorError> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = temp_sibling(&path);
        if let Err(e) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(
            path = %path.display(),
            bytes = bytes.len(),
            content_type,
            "wrote blob to local disk"
        );
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base_url)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{:08x}.tmp", rand::random::<u32>()))
}
