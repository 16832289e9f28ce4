//! Directory backed store serving artifact bytes inline.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{
    ArtifactStore, ContainerId, ObjectLocation, ObjectMetadata, ResolvedObject, StorageError,
};
use crate::filetype::detect_content_kind;

/// Store mapping each context to a subdirectory of a root directory.
///
/// Layout: `<root>/<context>/<path>`. Context identifiers must be a single
/// plain path component; anything else has no container.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Whether a context can name a directory without escaping the root.
fn is_plain_component(context: &str) -> bool {
    !context.is_empty()
        && context != "."
        && context != ".."
        && !context.contains(['/', '\\', '\0'])
}

#[async_trait]
impl ArtifactStore for FsStore {
    async fn container_for(&self, context: &str) -> Result<ContainerId, StorageError> {
        if !is_plain_component(context) {
            return Err(StorageError::ContainerNotFound(context.to_string()));
        }

        match tokio::fs::metadata(self.root.join(context)).await {
            Ok(meta) if meta.is_dir() => Ok(ContainerId::new(context)),
            Ok(_) => Err(StorageError::ContainerNotFound(context.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::ContainerNotFound(context.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch(
        &self,
        container: &ContainerId,
        path: &str,
    ) -> Result<ResolvedObject, StorageError> {
        let file = self.root.join(container.as_str()).join(path);

        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                return Err(StorageError::ObjectNotFound(path.to_string()));
            }
            Err(e) => {
                // Some platforms report reading a directory as a generic error
                if tokio::fs::metadata(&file).await.is_ok_and(|m| m.is_dir()) {
                    return Err(StorageError::ObjectNotFound(path.to_string()));
                }
                return Err(e.into());
            }
        };

        Ok(ResolvedObject {
            metadata: ObjectMetadata {
                path: path.to_string(),
                size: bytes.len() as u64,
                content_type: detect_content_kind(&bytes, Path::new(path)).mime_type(),
            },
            location: ObjectLocation::Inline(bytes),
        })
    }
}
