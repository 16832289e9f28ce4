//! Render-time resolution of permanent references.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::{ArtifactStore, ResolvedObject, StorageError};
use crate::reference::{ArtifactReference, ReferenceError};

/// Errors surfaced by [`Resolver::resolve_to_render_url`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Path empty, container unknown, or object absent.
    #[error("artifact not found: {0:?}")]
    NotFound(String),
    /// Path rejected before lookup.
    #[error(transparent)]
    InvalidPath(#[from] ReferenceError),
    /// Storage backend failed.
    #[error("storage backend failed: {0}")]
    Storage(#[source] StorageError),
}

/// Resolves artifact paths to fresh render locations.
///
/// Lookups are strictly scoped: a path is only searched in the container
/// owned by the given context. Each call asks the store again, so expired
/// URLs are never reused.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Resolves a permanent reference path within a context.
    ///
    /// An empty path is the degraded reference left behind when an artifact
    /// producer reported no location; it resolves to `NotFound` so the
    /// renderer shows a broken image instead of failing.
    ///
    /// # Arguments
    ///
    /// * `path`: Path from `disk::<path>`, decoded
    /// * `context`: Context identifier owning the container
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for empty paths, unknown contexts and missing
    /// objects, `InvalidPath` for paths escaping the container, and
    /// `Storage` for backend failures
    pub async fn resolve_to_render_url(
        &self,
        path: &str,
        context: &str,
    ) -> Result<ResolvedObject, ResolveError> {
        if path.is_empty() {
            warn!(context, "empty artifact path, rendering as broken image");
            return Err(ResolveError::NotFound(String::new()));
        }

        let normalized = ArtifactReference::new(path).normalized_path()?;
        if normalized.is_empty() {
            return Err(ResolveError::NotFound(path.to_string()));
        }

        let container = self
            .store
            .container_for(context)
            .await
            .map_err(|e| not_found_or_storage(e, path))?;

        let object = self
            .store
            .fetch(&container, &normalized)
            .await
            .map_err(|e| not_found_or_storage(e, path))?;

        info!(
            context,
            container = %container,
            path = %normalized,
            size = object.metadata.size,
            "resolved artifact"
        );

        Ok(object)
    }
}

fn not_found_or_storage(error: StorageError, path: &str) -> ResolveError {
    match error {
        StorageError::ContainerNotFound(_) | StorageError::ObjectNotFound(_) => {
            warn!(path, %error, "artifact unresolvable");
            ResolveError::NotFound(path.to_string())
        }
        StorageError::Io(_) => ResolveError::Storage(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ObjectLocation, SigningConfig};

    async fn resolver_with(context: &str, files: &[&str]) -> Resolver {
        let store = MemoryStore::new(SigningConfig::new("https://objects.test"));
        let container = store.create_container(context).await;
        for path in files {
            store
                .put(&container, path, b"data".to_vec())
                .await
                .expect("Should write object");
        }
        Resolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_resolves_existing_path() {
        // Arrange
        let resolver = resolver_with("doc-42", &["artifacts/chart.png"]).await;

        // Act
        let object = resolver
            .resolve_to_render_url("artifacts/chart.png", "doc-42")
            .await
            .expect("Should resolve");

        // Assert
        assert!(matches!(object.location, ObjectLocation::Signed { .. }));
        assert_eq!(object.metadata.path, "artifacts/chart.png");
    }

    #[tokio::test]
    async fn test_normalizes_before_lookup() {
        let resolver = resolver_with("c", &["artifacts/chart.png"]).await;

        let object = resolver
            .resolve_to_render_url("./artifacts/x/../chart.png", "c")
            .await
            .expect("Should resolve normalized path");

        assert_eq!(object.metadata.path, "artifacts/chart.png");
    }

    #[tokio::test]
    async fn test_empty_path_is_not_found() {
        // Arrange
        let resolver = resolver_with("c", &["a.png"]).await;

        // Act
        let result = resolver.resolve_to_render_url("", "c").await;

        // Assert
        assert!(matches!(result, Err(ResolveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dot_path_is_not_found() {
        let resolver = resolver_with("c", &["a.png"]).await;
        let result = resolver.resolve_to_render_url("./", "c").await;
        assert!(matches!(result, Err(ResolveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let resolver = resolver_with("c", &["a.png"]).await;
        let result = resolver.resolve_to_render_url("b.png", "c").await;
        assert!(matches!(result, Err(ResolveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_other_context_is_isolated() {
        // Arrange
        let resolver = resolver_with("doc-1", &["a.png"]).await;

        // Act
        let result = resolver.resolve_to_render_url("a.png", "doc-2").await;

        // Assert
        assert!(
            matches!(result, Err(ResolveError::NotFound(_))),
            "Path from another document should not resolve"
        );
    }

    #[tokio::test]
    async fn test_traversal_is_invalid() {
        let resolver = resolver_with("c", &["a.png"]).await;
        let result = resolver.resolve_to_render_url("../other/a.png", "c").await;
        assert!(matches!(result, Err(ResolveError::InvalidPath(_))));
    }
}
