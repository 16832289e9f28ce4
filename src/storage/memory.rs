//! In-process object store issuing expiring URLs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use super::{
    ArtifactStore, ContainerId, ObjectLocation, ObjectMetadata, ResolvedObject, StorageError,
};
use crate::filetype::detect_content_kind;

/// Default lifetime of issued URLs, matching hosted object stores.
const DEFAULT_URL_TTL: Duration = Duration::from_secs(3600);

/// Explicit configuration for URL issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Base of issued URLs, e.g. `https://objects.example.com`
    pub url_base: String,
    /// Lifetime of each issued URL
    pub ttl: Duration,
}

impl SigningConfig {
    /// Creates configuration with the default one hour lifetime.
    pub fn new(url_base: impl Into<String>) -> Self {
        Self {
            url_base: url_base.into(),
            ttl: DEFAULT_URL_TTL,
        }
    }

    /// Overrides URL lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Object store held in memory, one container per context.
///
/// Each fetch issues a new URL of the form
/// `<url_base>/<container>/<encoded path>?expires=<unix seconds>`.
#[derive(Debug)]
pub struct MemoryStore {
    config: SigningConfig,
    containers: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new(config: SigningConfig) -> Self {
        Self {
            config,
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Creates (or returns the existing) container for a context.
    pub async fn create_container(&self, context: &str) -> ContainerId {
        self.containers
            .write()
            .await
            .entry(context.to_string())
            .or_default();
        ContainerId::new(context)
    }

    /// Writes or overwrites an object.
    ///
    /// # Errors
    ///
    /// Returns error if the container does not exist
    pub async fn put(
        &self,
        container: &ContainerId,
        path: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<(), StorageError> {
        let mut containers = self.containers.write().await;
        let objects = containers
            .get_mut(container.as_str())
            .ok_or_else(|| StorageError::ContainerNotFound(container.to_string()))?;
        objects.insert(path.to_string(), bytes.into());
        Ok(())
    }

    fn signed_url(&self, container: &ContainerId, path: &str, expires_at: SystemTime) -> String {
        let encoded_path = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let expires = expires_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs();

        format!(
            "{}/{}/{}?expires={}",
            self.config.url_base.trim_end_matches('/'),
            urlencoding::encode(container.as_str()),
            encoded_path,
            expires
        )
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn container_for(&self, context: &str) -> Result<ContainerId, StorageError> {
        if self.containers.read().await.contains_key(context) {
            Ok(ContainerId::new(context))
        } else {
            Err(StorageError::ContainerNotFound(context.to_string()))
        }
    }

    async fn fetch(
        &self,
        container: &ContainerId,
        path: &str,
    ) -> Result<ResolvedObject, StorageError> {
        let containers = self.containers.read().await;
        let bytes = containers
            .get(container.as_str())
            .ok_or_else(|| StorageError::ContainerNotFound(container.to_string()))?
            .get(path)
            .ok_or_else(|| StorageError::ObjectNotFound(path.to_string()))?;

        let expires_at = SystemTime::now() + self.config.ttl;

        Ok(ResolvedObject {
            metadata: ObjectMetadata {
                path: path.to_string(),
                size: bytes.len() as u64,
                content_type: detect_content_kind(bytes, Path::new(path)).mime_type(),
            },
            location: ObjectLocation::Signed {
                url: self.signed_url(container, path, expires_at),
                expires_at,
            },
        })
    }
}
