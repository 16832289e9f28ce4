//! Artifact storage collaborators.
//!
//! The proxy endpoint never reads stored URLs: on every request it asks an
//! [`ArtifactStore`] for a fresh location of the referenced object. Stores
//! either hand out expiring signed URLs ([`MemoryStore`]) or serve bytes
//! directly ([`FsStore`]).

mod fs;
mod memory;
mod resolver;

use async_trait::async_trait;
use std::fmt;
use std::time::SystemTime;
use thiserror::Error;

pub use fs::FsStore;
pub use memory::{MemoryStore, SigningConfig};
pub use resolver::{ResolveError, Resolver};

/// Identifier of the storage container owned by a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    /// Wraps backend specific container identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Container identifier as string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Path within the container
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type
    pub content_type: &'static str,
}

/// Where a browser can fetch the object from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    /// Time boxed URL into object storage; never persisted.
    Signed { url: String, expires_at: SystemTime },
    /// Object bytes served by the proxy itself.
    Inline(Vec<u8>),
}

/// Object resolved for a single render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject {
    pub metadata: ObjectMetadata,
    pub location: ObjectLocation,
}

/// Errors reported by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No container belongs to the context.
    #[error("no container for context {0}")]
    ContainerNotFound(String),
    /// Container exists but holds no object at the path.
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    /// Backend I/O failure.
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage service consumed by the render-time resolver.
///
/// Only lookups are part of the contract; creating containers and writing
/// objects is backend specific.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Looks up the container owned by a context identifier.
    async fn container_for(&self, context: &str) -> Result<ContainerId, StorageError>;

    /// Fetches metadata and a fresh location for a normalized path.
    async fn fetch(&self, container: &ContainerId, path: &str)
    -> Result<ResolvedObject, StorageError>;
}
