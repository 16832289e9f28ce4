//! Permanent artifact references in markdown, resolved at render time.

mod config;
mod filetype;
mod markdown;
mod proxy;
mod reference;
pub mod server;
pub mod storage;

pub use config::{Command, Config};
pub use filetype::{ContentKind, ImageFormat, detect_content_kind};
pub use markdown::{MarkdownRenderer, PathRewriter};
pub use proxy::{DEFAULT_PROXY_BASE, ProxyUrl};
pub use reference::{
    ArtifactReference, DEFAULT_ARTIFACT_DIR, PERMANENT_PREFIX, ReferenceError,
};
pub use storage::{
    ArtifactStore, ContainerId, FsStore, MemoryStore, ObjectLocation, ObjectMetadata,
    ResolveError, ResolvedObject, Resolver, SigningConfig, StorageError,
};
