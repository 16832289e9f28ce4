//! Proxy URL encoding and parsing.

use std::fmt;

/// Proxy endpoint used when none is configured.
pub const DEFAULT_PROXY_BASE: &str = "/api/images/proxy";

const PATH_PARAM: &str = "path";
const CONTEXT_PARAM: &str = "context";

/// Same-origin URL deferring resolution of an artifact to render time.
///
/// Formats as `<base>?path=<encoded path>&context=<encoded context>`. Both
/// values are percent-encoded so that markdown delimiters (`)`, `]`, spaces)
/// never appear inside an image target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrl {
    base: String,
    path: String,
    context: String,
}

impl ProxyUrl {
    /// Creates proxy URL for an artifact path within a context.
    pub fn new(base: impl Into<String>, path: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            path: path.into(),
            context: context.into(),
        }
    }

    /// Parses URL previously produced for the same proxy base.
    ///
    /// The query must carry exactly one `path` and one `context` parameter,
    /// in any order, and nothing else. Anything that does not fit is not a
    /// proxy URL and yields `None`. Values are decoded as form data, so a
    /// `+` written by a form encoder reads as a space, matching the endpoint.
    ///
    /// # Arguments
    ///
    /// * `base`: Proxy endpoint the URL must point at
    /// * `target`: Image target taken from markdown
    pub fn parse(base: &str, target: &str) -> Option<Self> {
        let query = target.strip_prefix(base)?.strip_prefix('?')?;

        let mut path = None;
        let mut context = None;

        for pair in query.split('&') {
            let (key, value) = pair.split_once('=')?;
            let slot = match key {
                PATH_PARAM => &mut path,
                CONTEXT_PARAM => &mut context,
                _ => return None,
            };
            if slot.is_some() {
                return None;
            }
            *slot = Some(decode_form_value(value)?);
        }

        Some(Self {
            base: base.to_string(),
            path: path?,
            context: context?,
        })
    }

    /// Decoded artifact path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded context identifier.
    pub fn context(&self) -> &str {
        &self.context
    }
}

fn decode_form_value(value: &str) -> Option<String> {
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

impl fmt::Display for ProxyUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}?{}={}&{}={}",
            self.base,
            PATH_PARAM,
            urlencoding::encode(&self.path),
            CONTEXT_PARAM,
            urlencoding::encode(&self.context)
        )
    }
}
