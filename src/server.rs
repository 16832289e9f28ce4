//! HTTP proxy endpoint resolving artifacts at request time.
//!
//! `GET <proxy_base>?path=<path>&context=<context>` answers with a redirect
//! to a freshly signed URL, or with the bytes themselves for stores that
//! serve inline. Nothing is retried: a failed image is fixed by the next
//! page load, which resolves again.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::{ObjectLocation, ResolveError, Resolver};

/// Query parameters of the proxy endpoint.
#[derive(Debug, Deserialize)]
struct ProxyParams {
    #[serde(default)]
    path: String,
    context: Option<String>,
}

/// JSON body returned with error statuses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ErrorBody {
    fn response(status: StatusCode, code: &'static str, error: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                error: error.into(),
                code,
            }),
        )
            .into_response()
    }
}

/// Builds router serving the proxy endpoint at `proxy_base`.
///
/// # Arguments
///
/// * `resolver`: Resolver backed by the artifact store
/// * `proxy_base`: Route path, the same base given to the rewriter
pub fn router(resolver: Resolver, proxy_base: &str) -> Router {
    Router::new()
        .route(proxy_base, get(proxy_handler))
        .with_state(Arc::new(resolver))
}

/// Serves router on `addr` until the process stops.
///
/// # Errors
///
/// Returns error if the address cannot be bound or the server fails
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        addr = %listener.local_addr().context("Failed to read bound address")?,
        "proxy endpoint listening"
    );

    axum::serve(listener, router)
        .await
        .context("Proxy server failed")
}

/// GET <proxy_base> - resolve artifact to a render location
async fn proxy_handler(
    State(resolver): State<Arc<Resolver>>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let Some(context) = params.context.filter(|c| !c.is_empty()) else {
        warn!(path = %params.path, "proxy request without context");
        return ErrorBody::response(
            StatusCode::BAD_REQUEST,
            "MISSING_CONTEXT",
            "Missing context parameter",
        );
    };

    match resolver.resolve_to_render_url(&params.path, &context).await {
        Ok(object) => match object.location {
            ObjectLocation::Signed { url, .. } => (
                [(header::CACHE_CONTROL, "no-store")],
                Redirect::temporary(&url),
            )
                .into_response(),
            ObjectLocation::Inline(bytes) => (
                [
                    (header::CONTENT_TYPE, object.metadata.content_type),
                    (header::CACHE_CONTROL, "private, max-age=300"),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                    (header::CONTENT_SECURITY_POLICY, "sandbox"),
                ],
                bytes,
            )
                .into_response(),
        },
        Err(ResolveError::NotFound(_)) => {
            ErrorBody::response(StatusCode::NOT_FOUND, "NOT_FOUND", "Artifact not found")
        }
        Err(ResolveError::InvalidPath(e)) => {
            warn!(context = %context, error = %e, "rejected artifact path");
            ErrorBody::response(StatusCode::BAD_REQUEST, "INVALID_PATH", e.to_string())
        }
        Err(ResolveError::Storage(e)) => {
            warn!(context = %context, error = %e, "storage backend failed");
            ErrorBody::response(
                StatusCode::BAD_GATEWAY,
                "STORAGE_ERROR",
                "Artifact storage unavailable",
            )
        }
    }
}
