//! Bidirectional rewriting between permanent references and proxy URLs.

use tracing::debug;

use super::images::find_image_targets;
use crate::proxy::{DEFAULT_PROXY_BASE, ProxyUrl};
use crate::reference::ArtifactReference;

/// Rewrites markdown image targets between `disk::` and proxy form.
///
/// Stored content always carries the permanent `disk::<path>` form. Before
/// rendering, [`PathRewriter::to_proxy_form`] points each image at the proxy
/// endpoint, which resolves a fresh signed URL per request. Before saving,
/// [`PathRewriter::to_permanent_form`] strips proxy URLs for the same
/// context back to the permanent form.
///
/// Both directions only touch image destinations; alt text, titles and all
/// surrounding text are copied byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewriter {
    proxy_base: String,
}

impl PathRewriter {
    /// Creates rewriter targeting the given proxy endpoint.
    ///
    /// # Arguments
    ///
    /// * `proxy_base`: Endpoint path or URL, without query string
    pub fn new(proxy_base: impl Into<String>) -> Self {
        Self {
            proxy_base: proxy_base.into(),
        }
    }

    /// Rewrites every `disk::` image target to a proxy URL.
    ///
    /// # Arguments
    ///
    /// * `markdown`: Markdown content in permanent form
    /// * `context`: Conversation or document scope of the artifacts
    ///
    /// # Returns
    ///
    /// Markdown with image targets pointing at the proxy endpoint
    pub fn to_proxy_form(&self, markdown: &str, context: &str) -> String {
        self.rewrite(markdown, "proxy", |url| {
            let reference = ArtifactReference::parse(url)?;
            if reference.is_empty() {
                debug!(context, "rewriting empty artifact reference");
            }
            Some(ProxyUrl::new(&self.proxy_base, reference.path(), context).to_string())
        })
    }

    /// Rewrites proxy URLs scoped to `context` back to `disk::` form.
    ///
    /// Proxy URLs carrying any other context are left untouched, so content
    /// pasted from another document never gets rebound to this one.
    ///
    /// # Arguments
    ///
    /// * `markdown`: Markdown content, typically from a rendering editor
    /// * `context`: Context used when the proxy form was produced
    ///
    /// # Returns
    ///
    /// Markdown with image targets in permanent form
    pub fn to_permanent_form(&self, markdown: &str, context: &str) -> String {
        self.rewrite(markdown, "permanent", |url| {
            let proxy = ProxyUrl::parse(&self.proxy_base, url)?;
            if proxy.context() != context {
                debug!(
                    context,
                    foreign = proxy.context(),
                    "leaving proxy url scoped to other context"
                );
                return None;
            }
            Some(ArtifactReference::new(proxy.path()).to_string())
        })
    }

    /// Splices replacements for matching image targets into the source.
    fn rewrite<F>(&self, markdown: &str, direction: &str, replace: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(markdown.len());
        let mut last_end = 0;
        let mut rewritten = 0usize;

        for target in find_image_targets(markdown) {
            let Some(replacement) = replace(target.url) else {
                continue;
            };

            result.push_str(&markdown[last_end..target.span.start]);
            result.push_str(&replacement);
            last_end = target.span.end;
            rewritten += 1;
        }

        result.push_str(&markdown[last_end..]);

        debug!(direction, rewritten, "rewrote image targets");
        result
    }
}

impl Default for PathRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_BASE)
    }
}
