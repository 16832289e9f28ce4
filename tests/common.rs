//! Shared test utilities for integration tests.
//!
//! Provides helpers for laying out artifact directories and running the
//! proxy endpoint on an ephemeral port.

#![allow(dead_code)]

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use tempfile::TempDir;

/// Creates artifact root with files at `<context>/<path>` locations.
///
/// # Errors
///
/// Returns error if directory creation or file write fails
pub fn create_artifact_root(files: &[(&str, &[u8])]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    for (path, content) in files {
        write_file(dir.path(), path, content)?;
    }
    Ok(dir)
}

/// Writes file, creating parent directories as needed.
///
/// # Errors
///
/// Returns error if directory creation or file write fails
pub fn write_file(root: &Path, path: &str, content: &[u8]) -> Result<()> {
    let file_path = root.join(path);
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file_path, content)?;
    Ok(())
}

/// Serves router on an ephemeral local port, returning its address.
///
/// # Errors
///
/// Returns error if no local port can be bound
pub async fn spawn_server(router: Router) -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// HTTP client that reports redirects instead of following them.
///
/// # Errors
///
/// Returns error if the client cannot be built
pub fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?)
}
